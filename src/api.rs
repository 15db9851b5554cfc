// Inbound surface: request parsing, the JSON response envelope and the
// mapping from domain errors to HTTP status codes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::book_search::{BookSearchError, BookSearchOptions, BookSearchResult, BookSearchService};
use crate::engine::{OptimalLibraryEngine, OptimalLibraryResponse, OptimalSetError};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub meta: ResponseMeta,
}

/// Status code plus envelope, ready to be written by whatever server hosts it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply<T> {
    pub status: u16,
    pub body: ApiResponse<T>,
}

impl<T> ApiReply<T> {
    pub fn success(data: T, message: Option<&str>) -> Self {
        Self {
            status: 200,
            body: ApiResponse {
                success: true,
                data: Some(data),
                message: message.map(str::to_string),
                meta: meta(),
            },
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiResponse {
                success: false,
                data: None,
                message: Some(message.into()),
                meta: meta(),
            },
        }
    }
}

impl<T: Serialize> ApiReply<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.body)
    }
}

fn meta() -> ResponseMeta {
    ResponseMeta {
        timestamp: Utc::now(),
    }
}

impl OptimalSetError {
    pub fn status_code(&self) -> u16 {
        match self {
            OptimalSetError::InvalidInput(_) | OptimalSetError::UpstreamFailure(_) => 400,
            OptimalSetError::Unexpected(_) => 500,
        }
    }

    /// Message safe to return to a caller.
    pub fn public_message(&self) -> String {
        match self {
            OptimalSetError::Unexpected(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

// `isbns` stays loosely typed so a non-array gets its own message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimalLibraryRequest {
    #[serde(default)]
    pub isbns: serde_json::Value,
}

impl OptimalLibraryRequest {
    /// The ISBN list, if `isbns` is an array. Non-string entries keep their
    /// JSON text and are left to ISBN validation.
    pub fn isbn_list(&self) -> Option<Vec<String>> {
        let entries = self.isbns.as_array()?;
        Some(
            entries
                .iter()
                .map(|entry| match entry {
                    serde_json::Value::String(isbn) => isbn.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

/// Handles a `calculate-optimal-library-set` request body.
pub async fn handle_optimal_library_set(
    engine: Arc<OptimalLibraryEngine>,
    body: &str,
) -> ApiReply<OptimalLibraryResponse> {
    let request: OptimalLibraryRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejected request body");
            return ApiReply::error(400, "Invalid JSON payload");
        }
    };

    let Some(isbns) = request.isbn_list() else {
        return ApiReply::error(400, "isbns array is required");
    };

    // The engine runs in its own task so a panic becomes an Unexpected error
    let result = tokio::spawn(async move { engine.calculate_optimal_library_set(&isbns).await })
        .await
        .unwrap_or_else(|e| Err(OptimalSetError::Unexpected(e.to_string())));

    match result {
        Ok(response) => ApiReply::success(response, None),
        Err(err) => {
            if let OptimalSetError::Unexpected(detail) = &err {
                tracing::error!(%detail, "optimal library set calculation crashed");
            }
            ApiReply::error(err.status_code(), err.public_message())
        }
    }
}

/// Handles a title search with raw query-string values.
pub async fn handle_book_search(
    service: &BookSearchService,
    title: Option<&str>,
    page: Option<&str>,
    limit: Option<&str>,
) -> ApiReply<BookSearchResult> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return ApiReply::error(400, "Title parameter is required");
    }

    let Ok(page) = page.map(str::parse::<i64>).transpose() else {
        return ApiReply::error(400, "Page must be a valid number");
    };
    let Ok(limit) = limit.map(str::parse::<i64>).transpose() else {
        return ApiReply::error(400, "Limit must be a valid number");
    };

    let options = BookSearchOptions {
        page: page.map(clamp_to_u32),
        limit: limit.map(clamp_to_u32),
    };

    match service.search_by_title(title, options).await {
        Ok(result) => ApiReply::success(result, Some("Books retrieved successfully")),
        Err(err @ BookSearchError::InvalidInput(_)) => ApiReply::error(400, err.to_string()),
        Err(err @ BookSearchError::Upstream(_)) => {
            tracing::warn!(error = %err, "title search failed");
            ApiReply::error(400, err.to_string())
        }
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}
