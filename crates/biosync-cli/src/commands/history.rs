//! `biosync history` - persisted sync run history

use crate::api::ApiClient;
use crate::Result;

pub async fn run(
    client: &ApiClient,
    database_id: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    let response = client.history(database_id.as_deref(), limit).await?;

    if response.history.is_empty() {
        println!("No sync runs recorded.");
        return Ok(());
    }

    println!(
        "{:<22} {:<12} {:<12} {:>8} {:>7} {:>9}  {}",
        "started", "database", "type", "records", "errors", "duration", "status"
    );
    for entry in &response.history {
        println!(
            "{:<22} {:<12} {:<12} {:>8} {:>7} {:>7}ms  {}",
            entry.start_time.format("%Y-%m-%d %H:%M:%S"),
            entry.database_id,
            entry.sync_type,
            entry.total_records,
            entry.total_errors,
            entry.duration_ms,
            entry.status
        );
    }

    Ok(())
}
