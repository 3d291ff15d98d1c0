//! `biosync status` - source connectivity and table counts

use crate::api::ApiClient;
use crate::Result;

pub async fn run(client: &ApiClient, database_id: String) -> Result<()> {
    let status = client.source_status(&database_id).await?;

    if status.connected {
        println!("{}: connected (checked {})", database_id, status.timestamp);
        let mut counts: Vec<_> = status.table_counts.iter().collect();
        counts.sort();
        for (table, count) in counts {
            println!("  {:<10} {:>8} rows", table, count);
        }
    } else {
        println!("{}: NOT CONNECTED (checked {})", database_id, status.timestamp);
    }

    Ok(())
}
