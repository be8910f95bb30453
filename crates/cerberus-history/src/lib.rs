//! Append-only history of completed analysis jobs.
//!
//! Every backend implements [`HistoryStore`]: insert, get-by-id and
//! list (most recent first). Records are never updated or removed.

#![doc(html_root_url = "https://docs.rs/cerberus-history/0.3.0")]

mod error;
mod memory;
mod store;

#[cfg(feature = "file")]
pub mod file;

pub use error::{HistoryError, HistoryResult};
pub use memory::MemoryHistory;
pub use store::HistoryStore;

#[cfg(feature = "file")]
pub use file::FileHistory;
