pub mod error;
pub mod store;

pub use error::{LedgerError, Result};
pub use store::{LedgerEntry, LedgerStats, NewEntry, TopicLedger};
