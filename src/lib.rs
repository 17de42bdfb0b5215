pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod local;
pub mod mode;
pub mod session;
pub mod transfer;
pub mod util;
pub mod walker;

pub use error::{ConfigError, SyncError};
pub use filter::{FilterMode, FilterSet};
pub use session::{MemorySession, RemoteSession, TransferStatus};
pub use walker::{SyncReport, Syncer};
