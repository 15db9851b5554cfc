// Optimal library set engine and the book search surface around it

pub mod api;
pub mod book_search;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod engine;
pub mod gateway;
pub mod holdings;
pub mod index;
pub mod lookup;
pub mod search;

// Re-export key types for convenience
pub use api::{ApiReply, ApiResponse};
pub use book_search::{BookSearchOptions, BookSearchResult, BookSearchService};
pub use catalog::{AladdinCatalog, BookCatalog, BookMetadata};
pub use config::{AppConfig, ConfigError};
pub use directory::{
    InMemoryLibraryDirectory, Library, LibraryCode, LibraryDirectory, RestLibraryDirectory,
};
pub use engine::{OptimalLibraryEngine, OptimalLibraryResponse, OptimalSetError};
pub use gateway::{ExternalGateway, GatewayConfig, GatewayError, RetryConfig};
pub use holdings::{Data4LibraryHoldings, HoldingLibrary, LibraryHoldings};
pub use lookup::Lookup;
pub use search::{find_optimal_sets, OptimalLibrarySet};
