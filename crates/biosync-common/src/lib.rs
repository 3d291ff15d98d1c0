//! Biosync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the biosync workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used by both the sync server
//! and the operator CLI:
//!
//! - **Error Handling**: Workspace-wide error and result types
//! - **Logging**: Centralized tracing subscriber initialization
//! - **Types**: Sync domain enums shared across the API boundary

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{BiosyncError, Result};
pub use types::{RunStatus, SyncTable, SyncType};
