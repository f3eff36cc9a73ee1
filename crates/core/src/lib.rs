pub mod category;
pub mod error;
pub mod money;
pub mod names;
pub mod transaction;

pub use category::{Category, CategoryRegistry, DEFAULT_CATEGORIES, UNCATEGORIZED};
pub use error::{NotFoundError, RegistryError, ValidationError};
pub use money::Money;
pub use names::{NameMapping, NameRegistry};
pub use transaction::{Origin, Transaction, TransactionId, TransactionPatch};
