pub mod categories;
pub mod hash;
pub mod names;
pub mod sidecar;
pub mod store;

pub use categories::CategoryStore;
pub use hash::{fingerprint, sidecar_path};
pub use names::NameStore;
pub use sidecar::{EditLog, SidecarStore, StatementRef};
pub use store::{read_json, write_json, PersistenceError};
