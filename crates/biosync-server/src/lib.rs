//! Biosync Server Library
//!
//! HTTP service that synchronizes BioTrack point-of-sale databases into a
//! central destination store.
//!
//! # Overview
//!
//! - **Sync Engine** (`sync`): schema probing, extraction, transformation,
//!   and idempotent upserts, orchestrated per run with per-table outcome
//!   tracking and run history
//! - **API Endpoints** (`features`): trigger syncs, inspect source
//!   connectivity, and read run history
//! - **Configuration**: environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Architecture
//!
//! The API follows a **CQRS (Command Query Responsibility Segregation)**
//! layout: each feature is a vertical slice with `commands/` (write
//! operations), `queries/` (read operations), and `routes.rs`. Commands
//! and queries implement the mediator pattern via the `mediator` crate
//! and are handled by standalone async functions, which keeps the sync
//! engine itself free of HTTP concerns.
//!
//! # Example
//!
//! ```no_run
//! use biosync_server::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     println!("binding {}:{}", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod scheduler;
pub mod sync;

// Re-export commonly used types
pub use error::{AppError, AppResult};
