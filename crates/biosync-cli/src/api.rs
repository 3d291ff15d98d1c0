//! HTTP client for the biosync server API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{CliError, Result};

/// Request body for `POST /api/v1/sync`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestBody {
    pub sync_type: String,
    pub tables: Vec<String>,
    pub database_id: String,
}

/// Per-table result as returned by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResult {
    pub table: String,
    pub records_processed: u64,
    pub records_inserted: u64,
    pub records_updated: u64,
    pub errors: Vec<String>,
    pub success: bool,
}

/// Aggregate counts for one run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_records: u64,
    pub total_inserted: u64,
    pub total_updated: u64,
    pub total_errors: u64,
}

/// Response from `POST /api/v1/sync`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub results: Vec<TableResult>,
    pub summary: RunSummary,
    pub duration: i64,
    pub status: String,
}

/// Response from `GET /api/v1/sync`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub connected: bool,
    pub table_counts: HashMap<String, i64>,
    pub timestamp: DateTime<Utc>,
}

/// One run from `GET /api/v1/sync/history`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub database_id: String,
    pub sync_type: String,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub total_records: i64,
    pub total_errors: i64,
    pub status: String,
}

/// Response from `GET /api/v1/sync/history`
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

/// Error body shape returned by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Thin client over the server's sync endpoints
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn trigger_sync(&self, body: &SyncRequestBody) -> Result<SyncResponse> {
        let response = self
            .http
            .post(format!("{}/api/v1/sync", self.base_url))
            .json(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    pub async fn source_status(&self, database_id: &str) -> Result<SourceStatus> {
        let response = self
            .http
            .get(format!("{}/api/v1/sync", self.base_url))
            .query(&[("databaseId", database_id)])
            .send()
            .await?;

        Self::decode(response).await
    }

    pub async fn history(
        &self,
        database_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<HistoryResponse> {
        let mut request = self.http.get(format!("{}/api/v1/sync/history", self.base_url));

        if let Some(database_id) = database_id {
            request = request.query(&[("databaseId", database_id)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit.to_string())]);
        }

        Self::decode(request.send().await?).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error.message)
            .unwrap_or_else(|_| status.to_string());

        Err(CliError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_request_body_serializes_camel_case() {
        let body = SyncRequestBody {
            sync_type: "full".to_string(),
            tables: vec!["customers".to_string()],
            database_id: "primary".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["syncType"], "full");
        assert_eq!(json["databaseId"], "primary");
    }

    #[test]
    fn test_sync_response_deserializes() {
        let response: SyncResponse = serde_json::from_str(
            r#"{
                "success": true,
                "results": [{
                    "table": "customers",
                    "recordsProcessed": 10,
                    "recordsInserted": 4,
                    "recordsUpdated": 6,
                    "errors": [],
                    "success": true,
                    "completedAt": "2026-08-06T12:00:00Z"
                }],
                "summary": {"totalRecords": 10, "totalInserted": 4, "totalUpdated": 6, "totalErrors": 0},
                "duration": 1500,
                "status": "success"
            }"#,
        )
        .unwrap();
        assert!(response.success);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.summary.total_records, 10);
    }
}
