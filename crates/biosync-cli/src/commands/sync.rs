//! `biosync sync` - trigger a sync run

use biosync_common::SyncTable;

use crate::api::{ApiClient, SyncRequestBody};
use crate::Result;

pub async fn run(
    client: &ApiClient,
    database_id: String,
    tables: Vec<String>,
    full: bool,
) -> Result<()> {
    let tables = if tables.is_empty() {
        SyncTable::DEPENDENCY_ORDER
            .iter()
            .map(|t| t.to_string())
            .collect()
    } else {
        tables
    };

    let body = SyncRequestBody {
        sync_type: if full { "full" } else { "incremental" }.to_string(),
        tables,
        database_id,
    };

    println!(
        "Starting {} sync of {} ({})...",
        body.sync_type,
        body.database_id,
        body.tables.join(", ")
    );

    let response = client.trigger_sync(&body).await?;

    println!();
    for result in &response.results {
        let marker = if result.success { "ok" } else { "FAILED" };
        println!(
            "  {:<10} {:>6} processed  {:>6} inserted  {:>6} updated  {:>4} errors  [{}]",
            result.table,
            result.records_processed,
            result.records_inserted,
            result.records_updated,
            result.errors.len(),
            marker
        );
        for error in &result.errors {
            println!("             - {}", error);
        }
    }

    println!();
    println!(
        "Run {} in {} ms: {} records, {} inserted, {} updated, {} errors",
        response.status,
        response.duration,
        response.summary.total_records,
        response.summary.total_inserted,
        response.summary.total_updated,
        response.summary.total_errors
    );

    Ok(())
}
