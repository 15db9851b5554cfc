// Library directory: the authoritative list of libraries. Holdings reported by
// external services are only trusted for codes present here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::gateway::{ExternalGateway, GatewayConfig, GatewayError};

pub type LibraryCode = i64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Fetch error: {0}")]
    Fetch(String),
}

impl From<GatewayError> for DirectoryError {
    fn from(err: GatewayError) -> Self {
        DirectoryError::Fetch(err.to_string())
    }
}

/// One row of the directory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub lib_code: LibraryCode,
    pub lib_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub detailed_address: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub operating_hours: Option<String>,
    #[serde(default)]
    pub closed_days: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Library {
    pub fn new(lib_code: LibraryCode, lib_name: impl Into<String>) -> Self {
        Self {
            lib_code,
            lib_name: lib_name.into(),
            address: None,
            website: None,
            detailed_address: None,
            latitude: None,
            longitude: None,
            operating_hours: None,
            closed_days: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[async_trait]
pub trait LibraryDirectory: Send + Sync + 'static {
    /// Every library in the store, ordered by code.
    async fn get_all_libraries(&self) -> Result<Vec<Library>, DirectoryError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryConfig {
    pub gateway: GatewayConfig,
    pub api_key: String,
    pub table: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            api_key: String::new(),
            table: "libraries".to_string(),
        }
    }
}

/// Directory backed by a PostgREST endpoint.
pub struct RestLibraryDirectory {
    gateway: ExternalGateway,
    api_key: String,
    table: String,
}

impl RestLibraryDirectory {
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        Ok(Self {
            gateway: ExternalGateway::new(config.gateway)?,
            api_key: config.api_key,
            table: config.table,
        })
    }
}

#[async_trait]
impl LibraryDirectory for RestLibraryDirectory {
    async fn get_all_libraries(&self) -> Result<Vec<Library>, DirectoryError> {
        let started = Instant::now();
        let endpoint = format!("rest/v1/{}", self.table);
        let query = [
            ("select", "*".to_string()),
            ("order", "lib_code".to_string()),
        ];
        let headers = [
            ("apikey", self.api_key.clone()),
            ("Authorization", format!("Bearer {}", self.api_key)),
        ];

        let result = self
            .gateway
            .get_json::<Vec<Library>>(&endpoint, &query, &headers)
            .await;

        tracing::info!(
            service = "directory",
            endpoint = %endpoint,
            success = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "external call finished"
        );

        let mut libraries = result?;
        libraries.sort_by_key(|library| library.lib_code);
        Ok(libraries)
    }
}

/// Directory held in memory, keyed by library code.
#[derive(Default)]
pub struct InMemoryLibraryDirectory {
    libraries: DashMap<LibraryCode, Library>,
}

impl InMemoryLibraryDirectory {
    pub fn new(libraries: impl IntoIterator<Item = Library>) -> Self {
        let directory = Self::default();
        for library in libraries {
            directory.upsert(library);
        }
        directory
    }

    /// Inserts or replaces a library; returns the previous row if any.
    pub fn upsert(&self, mut library: Library) -> Option<Library> {
        let now = Utc::now();
        let previous = self
            .libraries
            .get(&library.lib_code)
            .map(|entry| entry.value().clone());
        library.created_at = previous
            .as_ref()
            .and_then(|p| p.created_at)
            .or(library.created_at)
            .or(Some(now));
        library.updated_at = Some(now);
        self.libraries.insert(library.lib_code, library);
        previous
    }

    pub fn remove(&self, lib_code: LibraryCode) -> Option<Library> {
        self.libraries.remove(&lib_code).map(|(_, library)| library)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[async_trait]
impl LibraryDirectory for InMemoryLibraryDirectory {
    async fn get_all_libraries(&self) -> Result<Vec<Library>, DirectoryError> {
        let mut libraries: Vec<Library> = self
            .libraries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        libraries.sort_by_key(|library| library.lib_code);
        Ok(libraries)
    }
}
