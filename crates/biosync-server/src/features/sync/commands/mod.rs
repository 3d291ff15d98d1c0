//! Sync commands (write operations)

pub mod trigger_sync;

pub use trigger_sync::{TriggerSyncCommand, TriggerSyncError, TriggerSyncResponse};
