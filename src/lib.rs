//! # tap-googleads
//!
//! A Singer tap that extracts Google Ads reporting data.
//!
//! ## Features
//!
//! - **Stream Catalog**: Built-in report streams merged with user-defined
//!   GAQL reports, validated before any network activity
//! - **OAuth2**: Refresh-token flow with cached access tokens
//! - **Paging**: `nextPageToken` iteration over `googleAds:search`
//! - **Incremental Sync**: Per-stream bookmarks on `segments.date`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use tap_googleads::{Connector, GoogleAdsTap, StateManager, SyncConfig, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> tap_googleads::Result<()> {
//!     let tap = GoogleAdsTap::new();
//!     let config = TapConfig::from_file("config.json")?;
//!
//!     let catalog = tap.discover(&config).await?;
//!     println!("{:?}", catalog.names());
//!
//!     let mut messages = tap
//!         .read(&config, &[], StateManager::in_memory(), SyncConfig::default())
//!         .await?;
//!     while let Some(msg) = messages.next().await {
//!         println!("{}", msg?.to_json());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Connector Interface                      │
//! │  spec()   check()   discover() → Catalog   read() → Messages    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Catalog  │   Auth    │     HTTP      │ Paginate  │   State     │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Builtin  │ OAuth2    │ Retry         │ Page      │ Bookmarks   │
//! │ Custom   │ Dev token │ Rate Limit    │ token     │             │
//! │ Resolver │           │ Backoff       │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration and run context
pub mod config;

/// Stream catalog resolution
pub mod catalog;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// State management and bookmarks
pub mod state;

/// Main execution engine
pub mod engine;

/// Template interpolation
pub mod template;

/// Record schemas
pub mod schema;

/// Connector trait and the Google Ads tap
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::{resolve, BuiltinStream, Catalog, ResolvedStream};
pub use config::{CustomReportConfig, TapConfig, TapContext};
pub use connector::{CheckResult, Connector, GoogleAdsTap, MessageStream};
pub use engine::{Message, SyncConfig, SyncEngine};
pub use error::{Error, Result};
pub use state::StateManager;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
