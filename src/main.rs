use std::sync::Arc;

use anyhow::Context;
use bookshore::api::{handle_book_search, handle_optimal_library_set};
use bookshore::book_search::BookSearchService;
use bookshore::catalog::AladdinCatalog;
use bookshore::config::AppConfig;
use bookshore::directory::RestLibraryDirectory;
use bookshore::engine::OptimalLibraryEngine;
use bookshore::holdings::Data4LibraryHoldings;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookshore")]
#[command(about = "Find the libraries that together hold the books you want.")]
struct CommandLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the smallest library sets covering 1-3 ISBNs
    #[command(alias = "o")]
    Optimal {
        #[arg(required = true)]
        isbns: Vec<String>,
    },
    /// Search the catalog by title
    #[command(alias = "s")]
    Search {
        title: String,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse();
    let config = AppConfig::from_env().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_writer(std::io::stderr)
        .init();

    let catalog = Arc::new(AladdinCatalog::new(config.catalog)?);

    let (status, json) = match cli.command {
        Commands::Optimal { isbns } => {
            let engine = Arc::new(OptimalLibraryEngine::new(
                Arc::new(RestLibraryDirectory::new(config.directory)?),
                catalog,
                Arc::new(Data4LibraryHoldings::new(config.holdings)?),
            ));
            let body = serde_json::json!({ "isbns": isbns }).to_string();
            let reply = handle_optimal_library_set(engine, &body).await;
            (reply.status, reply.to_json()?)
        }
        Commands::Search { title, page, limit } => {
            let service = BookSearchService::new(catalog);
            let reply =
                handle_book_search(&service, Some(&title), page.as_deref(), limit.as_deref()).await;
            (reply.status, reply.to_json()?)
        }
    };

    println!("{json}");
    tracing::debug!(status, "request finished");

    if status >= 400 {
        std::process::exit(1);
    }
    Ok(())
}
