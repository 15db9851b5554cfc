// Optimal library set engine: validates the request, fetches the directory,
// fans out per-ISBN catalog and holdings lookups, then runs the combination
// search over the resulting holding index.

use std::{collections::HashMap, sync::Arc};

use futures::future::{join, join_all};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{task::JoinError, time::Instant};

use crate::catalog::{BookCatalog, BookMetadata};
use crate::directory::LibraryDirectory;
use crate::holdings::{HoldingLibrary, LibraryHoldings};
use crate::index::HoldingIndex;
use crate::lookup::Lookup;
use crate::search::{find_optimal_sets, OptimalLibrarySet};

pub const MIN_ISBNS: usize = 1;
pub const MAX_ISBNS: usize = 3;

const ISBN_COUNT_MESSAGE: &str = "ISBN list must contain 1-3 items";
const DIRECTORY_FAILURE_MESSAGE: &str = "Failed to fetch libraries from database";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimalSetError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    UpstreamFailure(String),

    #[error("{0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalLibraryResponse {
    pub optimal_sets: Vec<OptimalLibrarySet>,
}

/// Digits, hyphens and a check character `X` (either case). No checksum.
pub fn is_valid_isbn(isbn: &str) -> bool {
    !isbn.is_empty()
        && isbn
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == 'X' || c == 'x')
}

/// Checks count and format, returning the distinct ISBNs in request order.
pub fn validate_isbns(isbns: &[String]) -> Result<Vec<String>, OptimalSetError> {
    if isbns.len() < MIN_ISBNS || isbns.len() > MAX_ISBNS {
        return Err(OptimalSetError::InvalidInput(ISBN_COUNT_MESSAGE.to_string()));
    }

    let invalid: Vec<&str> = isbns
        .iter()
        .map(String::as_str)
        .filter(|isbn| !is_valid_isbn(isbn))
        .collect();
    if !invalid.is_empty() {
        return Err(OptimalSetError::InvalidInput(format!(
            "Invalid ISBN format: {}",
            invalid.join(", ")
        )));
    }

    let mut distinct: Vec<String> = Vec::with_capacity(isbns.len());
    for isbn in isbns {
        if !distinct.contains(isbn) {
            distinct.push(isbn.clone());
        }
    }
    Ok(distinct)
}

pub struct OptimalLibraryEngine {
    directory: Arc<dyn LibraryDirectory>,
    catalog: Arc<dyn BookCatalog>,
    holdings: Arc<dyn LibraryHoldings>,
}

impl OptimalLibraryEngine {
    pub fn new(
        directory: Arc<dyn LibraryDirectory>,
        catalog: Arc<dyn BookCatalog>,
        holdings: Arc<dyn LibraryHoldings>,
    ) -> Self {
        Self {
            directory,
            catalog,
            holdings,
        }
    }

    pub async fn calculate_optimal_library_set(
        &self,
        isbns: &[String],
    ) -> Result<OptimalLibraryResponse, OptimalSetError> {
        let started = Instant::now();
        let requested = validate_isbns(isbns)?;

        let libraries = self.directory.get_all_libraries().await.map_err(|e| {
            tracing::error!(error = %e, "library directory unavailable");
            OptimalSetError::UpstreamFailure(DIRECTORY_FAILURE_MESSAGE.to_string())
        })?;

        let (metadata, holdings) = self.fetch_per_isbn(&requested).await;

        let mut books: HashMap<String, BookMetadata> = HashMap::with_capacity(requested.len());
        for (isbn, lookup) in requested.iter().zip(metadata) {
            let book = match lookup {
                Lookup::Found(book) => book,
                Lookup::Empty => {
                    tracing::debug!(isbn = %isbn, "no catalog match, using placeholder");
                    BookMetadata::placeholder(isbn)
                }
                Lookup::Failed(reason) => {
                    tracing::warn!(
                        isbn = %isbn,
                        %reason,
                        "catalog lookup failed, using placeholder"
                    );
                    BookMetadata::placeholder(isbn)
                }
            };
            books.insert(isbn.clone(), book);
        }

        let holders: Vec<Vec<HoldingLibrary>> = requested
            .iter()
            .zip(holdings)
            .map(|(isbn, lookup)| match lookup {
                Lookup::Found(libs) => libs,
                Lookup::Empty => Vec::new(),
                Lookup::Failed(reason) => {
                    tracing::warn!(
                        isbn = %isbn,
                        %reason,
                        "holdings lookup failed, treating as unheld"
                    );
                    Vec::new()
                }
            })
            .collect();

        let index = HoldingIndex::build(
            &libraries,
            requested
                .iter()
                .zip(&holders)
                .map(|(isbn, libs)| (isbn.as_str(), libs.as_slice())),
        );

        let optimal_sets = find_optimal_sets(&requested, &libraries, &index, &books);

        tracing::info!(
            isbns = requested.len(),
            directory_size = libraries.len(),
            holding_libraries = index.library_count(),
            optimal_sets = optimal_sets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "optimal library sets calculated"
        );

        Ok(OptimalLibraryResponse { optimal_sets })
    }

    // Both lookups for every ISBN run at once; a failed or panicking branch
    // settles as Lookup::Failed without touching its siblings.
    async fn fetch_per_isbn(
        &self,
        isbns: &[String],
    ) -> (Vec<Lookup<BookMetadata>>, Vec<Lookup<Vec<HoldingLibrary>>>) {
        let metadata_tasks: Vec<_> = isbns
            .iter()
            .map(|isbn| {
                let catalog = Arc::clone(&self.catalog);
                let isbn = isbn.clone();
                tokio::spawn(async move { catalog.search_by_isbn(&isbn).await })
            })
            .collect();

        let holdings_tasks: Vec<_> = isbns
            .iter()
            .map(|isbn| {
                let holdings = Arc::clone(&self.holdings);
                let isbn = isbn.clone();
                tokio::spawn(async move { holdings.search_by_isbn(&isbn).await })
            })
            .collect();

        let (metadata, holdings) = join(join_all(metadata_tasks), join_all(holdings_tasks)).await;

        (
            metadata.into_iter().map(settle).collect(),
            holdings.into_iter().map(settle).collect(),
        )
    }
}

fn settle<T>(joined: Result<Lookup<T>, JoinError>) -> Lookup<T> {
    joined.unwrap_or_else(|e| Lookup::Failed(format!("lookup task aborted: {e}")))
}

// In-memory collaborators with call logs and injectable failures
pub mod mock_services {
    use super::*;
    use crate::catalog::{CatalogError, CatalogItem, CatalogSearchResponse};
    use crate::directory::{DirectoryError, Library};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct MockDirectory {
        libraries: Mutex<Vec<Library>>,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl MockDirectory {
        pub fn new(libraries: Vec<Library>) -> Self {
            Self {
                libraries: Mutex::new(libraries),
                ..Default::default()
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LibraryDirectory for MockDirectory {
        async fn get_all_libraries(&self) -> Result<Vec<Library>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(DirectoryError::Fetch("connection refused".to_string()));
            }
            let mut libraries = self.libraries.lock().clone();
            libraries.sort_by_key(|l| l.lib_code);
            Ok(libraries)
        }
    }

    #[derive(Default)]
    pub struct MockCatalog {
        books: Mutex<HashMap<String, BookMetadata>>,
        failing: Mutex<HashSet<String>>,
        panicking: Mutex<HashSet<String>>,
        titles: Mutex<Vec<CatalogItem>>,
        isbn_calls: Mutex<Vec<String>>,
        title_calls: Mutex<Vec<(String, u32, u32)>>,
    }

    impl MockCatalog {
        pub fn add_book(&self, isbn: &str, title: &str, cover: &str) {
            self.books.lock().insert(
                isbn.to_string(),
                BookMetadata {
                    title: title.to_string(),
                    cover: cover.to_string(),
                },
            );
        }

        pub fn fail_isbn(&self, isbn: &str) {
            self.failing.lock().insert(isbn.to_string());
        }

        pub fn panic_on(&self, isbn: &str) {
            self.panicking.lock().insert(isbn.to_string());
        }

        pub fn set_title_results(&self, items: Vec<CatalogItem>) {
            *self.titles.lock() = items;
        }

        pub fn isbn_calls(&self) -> Vec<String> {
            self.isbn_calls.lock().clone()
        }

        pub fn title_calls(&self) -> Vec<(String, u32, u32)> {
            self.title_calls.lock().clone()
        }
    }

    #[async_trait]
    impl BookCatalog for MockCatalog {
        async fn search_by_isbn(&self, isbn: &str) -> Lookup<BookMetadata> {
            self.isbn_calls.lock().push(isbn.to_string());

            let panics = self.panicking.lock().contains(isbn);
            if panics {
                panic!("catalog crashed on {isbn}");
            }
            if self.failing.lock().contains(isbn) {
                return Lookup::Failed("Service temporarily unavailable".to_string());
            }
            match self.books.lock().get(isbn) {
                Some(book) => Lookup::Found(book.clone()),
                None => Lookup::Empty,
            }
        }

        async fn search_by_title(
            &self,
            title: &str,
            start: u32,
            max_results: u32,
        ) -> Result<CatalogSearchResponse, CatalogError> {
            self.title_calls
                .lock()
                .push((title.to_string(), start, max_results));

            let titles = self.titles.lock();
            let item: Vec<CatalogItem> = titles
                .iter()
                .skip(start.saturating_sub(1) as usize)
                .take(max_results as usize)
                .cloned()
                .collect();

            Ok(CatalogSearchResponse {
                total_results: titles.len() as u64,
                start_index: start as u64,
                items_per_page: item.len() as u64,
                query: title.to_string(),
                item,
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    pub struct MockHoldings {
        holdings: Mutex<HashMap<String, Vec<HoldingLibrary>>>,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockHoldings {
        /// Registers `codes` (external string form) as holders of `isbn`.
        pub fn add_holdings(&self, isbn: &str, codes: &[&str]) {
            let libs = codes
                .iter()
                .map(|code| HoldingLibrary::new(*code, format!("External {code}")))
                .collect();
            self.holdings.lock().insert(isbn.to_string(), libs);
        }

        pub fn fail_isbn(&self, isbn: &str) {
            self.failing.lock().insert(isbn.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LibraryHoldings for MockHoldings {
        async fn search_by_isbn(&self, isbn: &str) -> Lookup<Vec<HoldingLibrary>> {
            self.calls.lock().push(isbn.to_string());

            if self.failing.lock().contains(isbn) {
                return Lookup::Failed("API error: 503 - Service Unavailable".to_string());
            }
            match self.holdings.lock().get(isbn) {
                Some(libs) if !libs.is_empty() => Lookup::Found(libs.clone()),
                _ => Lookup::Empty,
            }
        }
    }
}
