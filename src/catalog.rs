// Book catalog adapter over the Aladdin ItemSearch API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::gateway::{ExternalGateway, GatewayConfig, GatewayError};
use crate::lookup::Lookup;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Catalog rejected request: {code} - {message}")]
    Rejected { code: i64, message: String },
}

/// Display fields the engine needs for a requested book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub cover: String,
}

impl BookMetadata {
    pub fn placeholder(isbn: &str) -> Self {
        Self {
            title: format!("Book {isbn}"),
            cover: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogItem {
    pub title: String,
    pub link: String,
    pub author: String,
    pub pub_date: String,
    pub description: String,
    pub isbn: String,
    pub isbn13: String,
    pub price_sales: Option<i64>,
    pub price_standard: Option<i64>,
    pub mall_type: String,
    pub stock_status: String,
    pub cover: String,
    pub category_id: Option<i64>,
    pub category_name: String,
    pub publisher: String,
    pub customer_review_rank: Option<i64>,
}

impl From<CatalogItem> for BookMetadata {
    fn from(item: CatalogItem) -> Self {
        Self {
            title: item.title,
            cover: item.cover,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogSearchResponse {
    pub total_results: u64,
    pub start_index: u64,
    pub items_per_page: u64,
    pub query: String,
    pub item: Vec<CatalogItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Keyword,
    Title,
}

impl QueryType {
    fn as_str(&self) -> &'static str {
        match self {
            QueryType::Keyword => "Keyword",
            QueryType::Title => "Title",
        }
    }
}

#[async_trait]
pub trait BookCatalog: Send + Sync + 'static {
    /// Best single match for an ISBN.
    async fn search_by_isbn(&self, isbn: &str) -> Lookup<BookMetadata>;

    /// One page of title matches; `start` is the 1-based index of the first item.
    async fn search_by_title(
        &self,
        title: &str,
        start: u32,
        max_results: u32,
    ) -> Result<CatalogSearchResponse, CatalogError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub gateway: GatewayConfig,
    pub ttb_key: String,
    pub version: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: "http://www.aladin.co.kr/ttb/api".to_string(),
                timeout_ms: 15_000,
                ..Default::default()
            },
            ttb_key: String::new(),
            version: "20131101".to_string(),
        }
    }
}

pub struct AladdinCatalog {
    gateway: ExternalGateway,
    ttb_key: String,
    version: String,
}

impl AladdinCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            gateway: ExternalGateway::new(config.gateway)?,
            ttb_key: config.ttb_key,
            version: config.version,
        })
    }

    fn search_params(
        &self,
        query: &str,
        query_type: QueryType,
        start: u32,
        max_results: u32,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("TTBKey", self.ttb_key.clone()),
            ("Version", self.version.clone()),
            ("output", "js".to_string()),
            ("SearchTarget", "Book".to_string()),
            ("QueryType", query_type.as_str().to_string()),
            ("Query", query.to_string()),
            ("Start", start.to_string()),
            ("MaxResults", max_results.to_string()),
            ("Cover", "Mid".to_string()),
            ("Sort", "Accuracy".to_string()),
        ]
    }

    async fn search(
        &self,
        query: &str,
        query_type: QueryType,
        start: u32,
        max_results: u32,
    ) -> Result<CatalogSearchResponse, CatalogError> {
        let started = Instant::now();
        let params = self.search_params(query, query_type, start, max_results);

        let result = self
            .gateway
            .get_json::<CatalogSearchResponse>("ItemSearch.aspx", &params, &[])
            .await
            .map_err(CatalogError::from)
            .and_then(check_rejection);

        tracing::info!(
            service = "aladdin",
            query,
            query_type = query_type.as_str(),
            max_results,
            success = result.is_ok(),
            results_count = result.as_ref().map(|r| r.total_results).unwrap_or(0),
            duration_ms = started.elapsed().as_millis() as u64,
            "external call finished"
        );

        result
    }
}

// The API reports bad keys and malformed queries inside a 200 body
fn check_rejection(response: CatalogSearchResponse) -> Result<CatalogSearchResponse, CatalogError> {
    match response.error_code {
        Some(code) => Err(CatalogError::Rejected {
            code,
            message: response.error_message.unwrap_or_default(),
        }),
        None => Ok(response),
    }
}

#[async_trait]
impl BookCatalog for AladdinCatalog {
    async fn search_by_isbn(&self, isbn: &str) -> Lookup<BookMetadata> {
        self.search(isbn, QueryType::Keyword, 1, 1)
            .await
            .map(|response| response.item.into_iter().next().map(BookMetadata::from))
            .into()
    }

    async fn search_by_title(
        &self,
        title: &str,
        start: u32,
        max_results: u32,
    ) -> Result<CatalogSearchResponse, CatalogError> {
        self.search(title, QueryType::Title, start, max_results).await
    }
}
