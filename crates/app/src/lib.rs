pub mod config;
pub mod error;
pub mod session;
pub mod summary;
pub mod tracker;

pub use config::{ConfigError, TrackerConfig};
pub use error::TrackerError;
pub use session::{
    CategoryGroup, RegistryKind, RestoreReport, SearchField, Session, SessionState, StatementSource,
};
pub use summary::Summary;
pub use tracker::{OpenReport, Tracker};
