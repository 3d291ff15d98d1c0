//! Sync domain types shared between the server and the CLI
//!
//! These enums cross the API boundary, so their serialized forms are
//! stable: lowercase strings on the wire and in the `sync_history` table.

use serde::{Deserialize, Serialize};

/// Sync mode for a run
///
/// Full sync pulls the complete eligible history for analytical
/// completeness; incremental sync pulls a short trailing window for
/// freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    Full,
    #[default]
    Incremental,
}

impl SyncType {
    pub fn as_str(&self) -> &str {
        match self {
            SyncType::Full => "full",
            SyncType::Incremental => "incremental",
        }
    }
}

impl std::str::FromStr for SyncType {
    type Err = crate::BiosyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(SyncType::Full),
            "incremental" => Ok(SyncType::Incremental),
            _ => Err(crate::BiosyncError::Parse(format!("invalid sync type: {}", s))),
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source tables the engine knows how to synchronize
///
/// `DEPENDENCY_ORDER` is the fixed execution order within a run:
/// locations must precede customers because customer rows reference
/// location codes. The remaining tables are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTable {
    Locations,
    Customers,
    Products,
    Sales,
}

impl SyncTable {
    /// Fixed dependency order for table syncs within one run.
    pub const DEPENDENCY_ORDER: [SyncTable; 4] = [
        SyncTable::Locations,
        SyncTable::Customers,
        SyncTable::Products,
        SyncTable::Sales,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SyncTable::Locations => "locations",
            SyncTable::Customers => "customers",
            SyncTable::Products => "products",
            SyncTable::Sales => "sales",
        }
    }
}

impl std::str::FromStr for SyncTable {
    type Err = crate::BiosyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "locations" => Ok(SyncTable::Locations),
            "customers" => Ok(SyncTable::Customers),
            "products" => Ok(SyncTable::Products),
            "sales" => Ok(SyncTable::Sales),
            _ => Err(crate::BiosyncError::UnknownTable(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall outcome of a completed sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    /// Classify a run from its aggregate counts.
    ///
    /// `success` when nothing failed, `partial` when some rows failed but
    /// fewer than were processed, `failed` when errors meet or exceed the
    /// processed count (including the zero-processed, errors-present case).
    pub fn classify(total_processed: u64, total_errors: u64) -> Self {
        if total_errors == 0 {
            RunStatus::Success
        } else if total_errors < total_processed {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = crate::BiosyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(RunStatus::Success),
            "partial" => Ok(RunStatus::Partial),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(crate::BiosyncError::Parse(format!("invalid run status: {}", s))),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sync_type_round_trip() {
        assert_eq!(SyncType::from_str("full").unwrap(), SyncType::Full);
        assert_eq!(SyncType::from_str("Incremental").unwrap(), SyncType::Incremental);
        assert!(SyncType::from_str("delta").is_err());
        assert_eq!(SyncType::Full.as_str(), "full");
    }

    #[test]
    fn test_sync_table_from_str() {
        assert_eq!(SyncTable::from_str("customers").unwrap(), SyncTable::Customers);
        assert_eq!(SyncTable::from_str("SALES").unwrap(), SyncTable::Sales);
        assert!(SyncTable::from_str("invoices").is_err());
    }

    #[test]
    fn test_dependency_order_starts_with_locations() {
        assert_eq!(SyncTable::DEPENDENCY_ORDER[0], SyncTable::Locations);
        assert_eq!(SyncTable::DEPENDENCY_ORDER[1], SyncTable::Customers);
    }

    #[test]
    fn test_run_status_classification() {
        assert_eq!(RunStatus::classify(100, 0), RunStatus::Success);
        assert_eq!(RunStatus::classify(100, 30), RunStatus::Partial);
        assert_eq!(RunStatus::classify(100, 100), RunStatus::Failed);
        assert_eq!(RunStatus::classify(100, 150), RunStatus::Failed);
        // Nothing processed but a connection error recorded still fails
        assert_eq!(RunStatus::classify(0, 1), RunStatus::Failed);
        assert_eq!(RunStatus::classify(0, 0), RunStatus::Success);
    }

    #[test]
    fn test_serde_forms_are_lowercase() {
        assert_eq!(serde_json::to_string(&SyncType::Full).unwrap(), "\"full\"");
        assert_eq!(serde_json::to_string(&SyncTable::Sales).unwrap(), "\"sales\"");
        assert_eq!(serde_json::to_string(&RunStatus::Partial).unwrap(), "\"partial\"");
    }
}
