// Title search: a thin pass-through to the catalog with page/limit clamping

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{BookCatalog, CatalogError, CatalogItem};

pub const DEFAULT_PAGE: u32 = 1;
pub const MIN_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MIN_LIMIT: u32 = 5;
pub const MAX_LIMIT: u32 = 50;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookSearchError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to search books: {0}")]
    Upstream(#[from] CatalogError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookSearchOptions {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BookSearchOptions {
    /// Missing values take their defaults; present ones are clamped.
    pub fn normalized(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(MIN_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSearchResult {
    pub books: Vec<CatalogItem>,
    pub pagination: PaginationMeta,
}

pub struct BookSearchService {
    catalog: Arc<dyn BookCatalog>,
}

impl BookSearchService {
    pub fn new(catalog: Arc<dyn BookCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn search_by_title(
        &self,
        title: &str,
        options: BookSearchOptions,
    ) -> Result<BookSearchResult, BookSearchError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BookSearchError::InvalidInput(
                "Title parameter is required".to_string(),
            ));
        }

        let (page, limit) = options.normalized();
        let start = (page - 1).saturating_mul(limit).saturating_add(1);

        let response = self.catalog.search_by_title(title, start, limit).await?;
        let total = response.total_results;

        Ok(BookSearchResult {
            books: response.item,
            pagination: PaginationMeta {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit as u64),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock_services::MockCatalog;

    fn items(count: usize) -> Vec<CatalogItem> {
        (0..count)
            .map(|i| CatalogItem {
                title: format!("Rust book {i}"),
                isbn13: format!("97800000000{i:02}"),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_options_are_clamped() {
        assert_eq!(BookSearchOptions::default().normalized(), (1, 10));
        assert_eq!(
            BookSearchOptions { page: Some(0), limit: Some(1) }.normalized(),
            (1, 5)
        );
        assert_eq!(
            BookSearchOptions { page: Some(3), limit: Some(500) }.normalized(),
            (3, 50)
        );
    }

    #[tokio::test]
    async fn test_second_page() {
        let catalog = Arc::new(MockCatalog::default());
        catalog.set_title_results(items(23));
        let service = BookSearchService::new(catalog.clone());

        let result = service
            .search_by_title(
                "  rust ",
                BookSearchOptions {
                    page: Some(2),
                    limit: Some(10),
                },
            )
            .await
            .unwrap();

        assert_eq!(catalog.title_calls(), vec![("rust".to_string(), 11, 10)]);
        assert_eq!(result.books.len(), 10);
        assert_eq!(result.books[0].title, "Rust book 10");
        assert_eq!(
            result.pagination,
            PaginationMeta {
                page: 2,
                limit: 10,
                total: 23,
                total_pages: 3
            }
        );
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let catalog = Arc::new(MockCatalog::default());
        let service = BookSearchService::new(catalog.clone());

        let err = service
            .search_by_title("   ", BookSearchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Title parameter is required");
        assert!(catalog.title_calls().is_empty());
    }
}
