// Library holdings adapter over the data4library `libSrchByBook` API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::directory::LibraryCode;
use crate::gateway::{ExternalGateway, GatewayConfig, GatewayError};
use crate::lookup::Lookup;

/// Library code as sent by the holdings service: a string on the wire, but
/// some responses carry a bare number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalLibraryCode {
    Number(i64),
    Text(String),
}

impl ExternalLibraryCode {
    /// Coerces to the directory's numeric code; `None` when not numeric.
    pub fn normalize(&self) -> Option<LibraryCode> {
        match self {
            ExternalLibraryCode::Number(code) => Some(*code),
            ExternalLibraryCode::Text(code) => code.trim().parse().ok(),
        }
    }
}

impl Default for ExternalLibraryCode {
    fn default() -> Self {
        ExternalLibraryCode::Text(String::new())
    }
}

impl From<&str> for ExternalLibraryCode {
    fn from(code: &str) -> Self {
        ExternalLibraryCode::Text(code.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HoldingLibrary {
    pub lib_code: ExternalLibraryCode,
    pub lib_name: String,
    pub address: String,
    pub tel: String,
    pub fax: String,
    pub latitude: String,
    pub longitude: String,
    pub homepage: String,
    pub closed: String,
    pub operating_time: String,
}

impl HoldingLibrary {
    pub fn new(lib_code: impl Into<ExternalLibraryCode>, lib_name: impl Into<String>) -> Self {
        Self {
            lib_code: lib_code.into(),
            lib_name: lib_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibWrapper {
    pub lib: HoldingLibrary,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HoldingsResponseBody {
    pub page_no: Option<u32>,
    pub page_size: Option<u32>,
    pub num_found: Option<u32>,
    pub result_num: Option<u32>,
    pub libs: Option<Vec<LibWrapper>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldingsSearchResponse {
    #[serde(default)]
    pub response: HoldingsResponseBody,
}

impl HoldingsSearchResponse {
    pub fn into_lookup(self) -> Lookup<Vec<HoldingLibrary>> {
        if let Some(error) = self.response.error {
            return Lookup::Failed(error);
        }
        match self.response.libs {
            Some(libs) if !libs.is_empty() => {
                Lookup::Found(libs.into_iter().map(|wrapper| wrapper.lib).collect())
            }
            _ => Lookup::Empty,
        }
    }
}

#[async_trait]
pub trait LibraryHoldings: Send + Sync + 'static {
    /// Libraries reported to hold a copy of `isbn`.
    async fn search_by_isbn(&self, isbn: &str) -> Lookup<Vec<HoldingLibrary>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingsConfig {
    pub gateway: GatewayConfig,
    pub auth_key: String,
    pub region: u32,
    pub page_size: u32,
}

impl Default for HoldingsConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: "http://data4library.kr/api".to_string(),
                timeout_ms: 15_000,
                ..Default::default()
            },
            auth_key: String::new(),
            // Seoul
            region: 11,
            page_size: 10,
        }
    }
}

pub struct Data4LibraryHoldings {
    gateway: ExternalGateway,
    auth_key: String,
    region: u32,
    page_size: u32,
}

impl Data4LibraryHoldings {
    pub fn new(config: HoldingsConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            gateway: ExternalGateway::new(config.gateway)?,
            auth_key: config.auth_key,
            region: config.region,
            page_size: config.page_size,
        })
    }

    fn search_params(&self, isbn: &str) -> Vec<(&'static str, String)> {
        vec![
            ("authKey", self.auth_key.clone()),
            ("format", "json".to_string()),
            ("pageNo", "1".to_string()),
            ("pageSize", self.page_size.to_string()),
            ("region", self.region.to_string()),
            ("isbn", isbn.to_string()),
        ]
    }
}

#[async_trait]
impl LibraryHoldings for Data4LibraryHoldings {
    async fn search_by_isbn(&self, isbn: &str) -> Lookup<Vec<HoldingLibrary>> {
        let started = Instant::now();
        let result = self
            .gateway
            .get_json::<HoldingsSearchResponse>("libSrchByBook", &self.search_params(isbn), &[])
            .await;

        let lookup = match result {
            Ok(response) => response.into_lookup(),
            Err(e) => Lookup::Failed(e.to_string()),
        };

        tracing::info!(
            service = "data4library",
            isbn,
            success = !lookup.is_failed(),
            duration_ms = started.elapsed().as_millis() as u64,
            "external call finished"
        );

        lookup
    }
}
