pub mod error;
pub mod logger;
pub mod sqlite;

pub use error::StoreError;
pub use logger::{DecisionLogger, LoggedRound};
pub use sqlite::SqliteStore;
