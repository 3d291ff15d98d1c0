//! Sync routes
//!
//! - `POST /sync` - trigger a sync run
//! - `GET /sync` - source connectivity and table counts
//! - `GET /sync/history` - persisted run history

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::commands::trigger_sync::{self, TriggerSyncCommand, TriggerSyncError};
use super::queries::list_history::{self, ListHistoryQuery};
use super::queries::source_status::{self, SourceStatusError, SourceStatusQuery};
use crate::error::AppError;
use crate::features::FeatureState;

/// Create sync routes
pub fn sync_routes() -> Router<FeatureState> {
    Router::new()
        .route("/sync", post(handle_trigger_sync).get(handle_source_status))
        .route("/sync/history", get(handle_list_history))
}

/// Trigger a sync run
///
/// POST /sync {"syncType": "full", "tables": ["locations"], "databaseId": "primary"}
async fn handle_trigger_sync(
    State(state): State<FeatureState>,
    Json(command): Json<TriggerSyncCommand>,
) -> Result<Response, AppError> {
    let response = trigger_sync::handle(state.engine, command)
        .await
        .map_err(|e| match e {
            TriggerSyncError::Validation(message) => AppError::Validation(message),
            TriggerSyncError::UnknownDatabase(id) => {
                AppError::NotFound(format!("Unknown database configuration: {}", id))
            },
            TriggerSyncError::SourceUnreachable(message) => AppError::Source(message),
        })?;

    Ok(Json(response).into_response())
}

/// Source connectivity status
///
/// GET /sync?databaseId=primary
async fn handle_source_status(
    State(state): State<FeatureState>,
    Query(query): Query<SourceStatusQuery>,
) -> Result<Response, AppError> {
    let status = source_status::handle(state.engine, query)
        .await
        .map_err(|e| match e {
            SourceStatusError::UnknownDatabase(id) => {
                AppError::NotFound(format!("Unknown database configuration: {}", id))
            },
        })?;

    Ok(Json(status).into_response())
}

/// Persisted run history
///
/// GET /sync/history?databaseId=primary&limit=20
async fn handle_list_history(
    State(state): State<FeatureState>,
    Query(query): Query<ListHistoryQuery>,
) -> Result<Response, AppError> {
    match list_history::handle(state.db, query).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(e) => {
            tracing::error!("Failed to list sync history: {:?}", e);
            Err(AppError::Internal("Failed to list sync history".to_string()))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_routes_exist() {
        // Test that routes can be built
        let _router = sync_routes();
    }
}
