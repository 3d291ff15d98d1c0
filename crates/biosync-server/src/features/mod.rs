//! Feature modules implementing the biosync API
//!
//! Each feature is a vertical slice following the CQRS (Command Query
//! Responsibility Segregation) pattern:
//!
//! - `commands/` - Write operations (trigger a sync run)
//! - `queries/` - Read operations (source status, run history)
//! - `routes.rs` - HTTP route definitions
//!
//! Commands and queries implement the mediator pattern using the
//! `mediator` crate, keeping handlers testable without HTTP plumbing.

pub mod sync;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

use crate::sync::SyncEngine;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Destination-store connection pool
    pub db: PgPool,
    /// The synchronization engine
    pub engine: Arc<SyncEngine>,
}

/// Creates the main API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().merge(sync::routes::sync_routes().with_state(state))
}
