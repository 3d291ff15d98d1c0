//! Per-run schema probing
//!
//! BioTrack deployments drift: optional diagnostic columns (loyalty
//! points, membership metadata, license numbers) exist on some releases
//! and not others. Every optional column a SELECT list references must
//! first be confirmed here for the current run. Availability is computed
//! once per table per run and never cached across runs.

use biosync_common::SyncTable;
use sqlx::PgPool;
use std::collections::HashSet;

/// Set of optional columns confirmed present on a source table for one run.
#[derive(Debug, Clone)]
pub struct ColumnAvailability {
    table: SyncTable,
    present: HashSet<String>,
}

impl ColumnAvailability {
    /// Availability with no optional columns confirmed.
    pub fn empty(table: SyncTable) -> Self {
        Self {
            table,
            present: HashSet::new(),
        }
    }

    /// Build directly from a confirmed column list (used by tests and by
    /// the probe).
    pub fn from_columns(table: SyncTable, columns: &[&str]) -> Self {
        Self {
            table,
            present: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn table(&self) -> SyncTable {
        self.table
    }

    pub fn has(&self, column: &str) -> bool {
        self.present.contains(column)
    }
}

/// Check one table/column pair against the source catalog.
///
/// Scoped metadata query, never a speculative `SELECT *` that could mask
/// drift.
async fn column_exists(pool: &PgPool, table: SyncTable, column: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = 'public'
              AND table_name = $1
              AND column_name = $2
        )
        "#,
    )
    .bind(table.as_str())
    .bind(column)
    .fetch_one(pool)
    .await
}

/// Probe the given optional columns for one table.
///
/// A probe failure degrades to "column absent": missing diagnostic
/// columns must never block core synchronization.
pub async fn probe_columns(
    pool: &PgPool,
    table: SyncTable,
    columns: &[&str],
) -> ColumnAvailability {
    let mut availability = ColumnAvailability::empty(table);

    for column in columns {
        match column_exists(pool, table, column).await {
            Ok(true) => {
                availability.present.insert(column.to_string());
            },
            Ok(false) => {
                tracing::debug!(table = %table, column, "Optional column absent from source schema");
            },
            Err(e) => {
                tracing::warn!(
                    table = %table,
                    column,
                    error = %e,
                    "Schema probe failed, treating column as absent"
                );
            },
        }
    }

    availability
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_availability_has_nothing() {
        let cols = ColumnAvailability::empty(SyncTable::Customers);
        assert!(!cols.has("licensenum"));
        assert_eq!(cols.table(), SyncTable::Customers);
    }

    #[test]
    fn test_from_columns() {
        let cols =
            ColumnAvailability::from_columns(SyncTable::Customers, &["licensenum", "loyaltypoints"]);
        assert!(cols.has("licensenum"));
        assert!(cols.has("loyaltypoints"));
        assert!(!cols.has("memberstatus"));
    }
}
