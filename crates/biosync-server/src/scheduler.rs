//! Background sync scheduler
//!
//! Optional periodic incremental syncs, run directly in a background
//! task. Failures are logged and the loop keeps going; a scheduled run
//! uses the same orchestrator entry point as an operator-triggered one.

use biosync_common::{SyncTable, SyncType};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::SyncConfig;
use crate::sync::models::SyncRequest;
use crate::sync::SyncEngine;

/// Periodic incremental sync loop
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    interval: Duration,
    databases: Vec<String>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, config: &SyncConfig) -> Self {
        let databases = if config.schedule_databases.is_empty() {
            engine.registry().ids()
        } else {
            config.schedule_databases.clone()
        };

        Self {
            engine,
            interval: Duration::from_secs(config.schedule_interval_secs),
            databases,
        }
    }

    /// Start the scheduler in background
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                databases = ?self.databases,
                "Sync scheduler started"
            );

            // Initial delay to let the server finish starting up.
            sleep(Duration::from_secs(5)).await;

            loop {
                for database_id in &self.databases {
                    let request = SyncRequest {
                        database_id: database_id.clone(),
                        sync_type: SyncType::Incremental,
                        tables: SyncTable::DEPENDENCY_ORDER.to_vec(),
                    };

                    match self.engine.run(request, CancellationToken::new()).await {
                        Ok(report) => {
                            info!(
                                database = %database_id,
                                status = %report.status,
                                records = report.summary.total_records,
                                "Scheduled sync finished"
                            );
                        },
                        Err(e) => {
                            error!(database = %database_id, error = %e, "Scheduled sync failed");
                        },
                    }
                }

                sleep(self.interval).await;
            }
        })
    }
}
