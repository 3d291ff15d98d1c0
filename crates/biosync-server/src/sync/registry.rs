//! Source database configuration registry
//!
//! Named BioTrack connection profiles, selected by id at sync time. Each
//! profile carries its own location-code → location-name map (different
//! physical sites number locations differently) and an optional
//! jurisdiction-specific license eligibility pattern. Profiles load from
//! a JSON file when one is configured, otherwise from the builtin table.

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or querying the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown database configuration: {0}")]
    NotFound(String),

    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse registry file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid license pattern for '{database_id}': {source}")]
    BadPattern {
        database_id: String,
        source: regex::Error,
    },
}

/// Jurisdiction-specific customer eligibility rule
///
/// The pattern is deployment configuration, not code: whichever
/// license-numbering convention a jurisdiction uses is expressed here and
/// applied by the customer extractor when the license column exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseFilter {
    /// Regular expression matched against the raw license value.
    pub pattern: String,
}

impl LicenseFilter {
    /// Compile the pattern, rejecting malformed configuration at load
    /// time instead of at query time.
    pub fn validate(&self) -> Result<(), regex::Error> {
        regex::Regex::new(&self.pattern).map(|_| ())
    }

    /// Test a license value against the pattern.
    pub fn matches(&self, value: &str) -> bool {
        regex::Regex::new(&self.pattern)
            .map(|re| re.is_match(value))
            .unwrap_or(false)
    }
}

/// One named BioTrack deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub ssl: bool,
    /// Location code → human-readable site name for this deployment.
    #[serde(default)]
    pub locations: HashMap<i64, String>,
    /// Optional jurisdiction eligibility rule for customers.
    #[serde(default)]
    pub license_filter: Option<LicenseFilter>,
}

impl ConnectionProfile {
    /// Connection options for this source deployment.
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    /// Resolve a location code to its site name, falling back to a
    /// synthetic label for unmapped codes so the record is never dropped.
    pub fn location_name(&self, code: i64) -> String {
        self.locations
            .get(&code)
            .cloned()
            .unwrap_or_else(|| format!("Location {}", code))
    }
}

/// Static table of source database profiles
#[derive(Debug, Clone)]
pub struct DatabaseRegistry {
    profiles: HashMap<String, ConnectionProfile>,
}

impl DatabaseRegistry {
    /// Builtin profiles used when no registry file is configured.
    pub fn builtin() -> Self {
        let mut locations = HashMap::new();
        locations.insert(1, "Main Street".to_string());
        locations.insert(2, "Riverside".to_string());

        let primary = ConnectionProfile {
            id: "primary".to_string(),
            name: "Primary Dispensary".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "biotrack".to_string(),
            user: "biotrack".to_string(),
            password: String::new(),
            ssl: false,
            locations,
            license_filter: None,
        };

        let mut profiles = HashMap::new();
        profiles.insert(primary.id.clone(), primary);
        Self { profiles }
    }

    /// Load profiles from a JSON file: a top-level array of profiles.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)?;
        let profiles: Vec<ConnectionProfile> = serde_json::from_str(&raw)?;

        for profile in &profiles {
            if let Some(ref filter) = profile.license_filter {
                filter.validate().map_err(|source| RegistryError::BadPattern {
                    database_id: profile.id.clone(),
                    source,
                })?;
            }
        }

        Ok(Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        })
    }

    /// Load from the configured file, or fall back to the builtin table.
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::from_file(path) {
                Ok(registry) => {
                    tracing::info!(
                        path = %path.display(),
                        databases = registry.profiles.len(),
                        "Loaded source database registry"
                    );
                    registry
                },
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load registry file, using builtin profiles"
                    );
                    Self::builtin()
                },
            },
            None => Self::builtin(),
        }
    }

    /// Pure lookup of a profile by id.
    pub fn resolve(&self, database_id: &str) -> Result<&ConnectionProfile, RegistryError> {
        self.profiles
            .get(database_id)
            .ok_or_else(|| RegistryError::NotFound(database_id.to_string()))
    }

    /// All registered database ids.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.profiles.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile_with_locations() -> ConnectionProfile {
        let mut locations = HashMap::new();
        locations.insert(3, "Harbor".to_string());
        ConnectionProfile {
            id: "test".to_string(),
            name: "Test".to_string(),
            host: "db.example.com".to_string(),
            port: 5432,
            database: "biotrack".to_string(),
            user: "sync".to_string(),
            password: "secret".to_string(),
            ssl: true,
            locations,
            license_filter: Some(LicenseFilter {
                pattern: "^OR-".to_string(),
            }),
        }
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let registry = DatabaseRegistry::builtin();
        assert!(registry.resolve("primary").is_ok());
        assert!(matches!(
            registry.resolve("nope"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_location_name_fallback() {
        let profile = profile_with_locations();
        assert_eq!(profile.location_name(3), "Harbor");
        assert_eq!(profile.location_name(42), "Location 42");
    }

    #[test]
    fn test_license_filter_matches() {
        let profile = profile_with_locations();
        let filter = profile.license_filter.unwrap();
        assert!(filter.validate().is_ok());
        assert!(filter.matches("OR-12345"));
        assert!(!filter.matches("WA-12345"));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let filter = LicenseFilter {
            pattern: "([unclosed".to_string(),
        };
        assert!(filter.validate().is_err());
        assert!(!filter.matches("anything"));
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let profile: ConnectionProfile = serde_json::from_str(
            r#"{
                "id": "east",
                "name": "East Side",
                "host": "10.0.0.5",
                "port": 5432,
                "database": "biotrack",
                "user": "sync",
                "password": "pw"
            }"#,
        )
        .unwrap();
        assert!(!profile.ssl);
        assert!(profile.locations.is_empty());
        assert!(profile.license_filter.is_none());
    }
}
