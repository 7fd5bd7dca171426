//! chartdeck server - HTTP API for CSV uploads and chart datasets
//!
//! Exposes the upload pipeline from the `chartdeck` crate over HTTP, backed
//! by the document store from `store`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! Under the configured prefix (default `/api`):
//!
//! - `GET /` - greeting
//! - `POST /status` - record a status check
//! - `GET /status` - list status checks
//! - `POST /upload-csv` - upload a CSV file (multipart field `file`)
//! - `GET /chart-data/{id}` - fetch an uploaded dataset
//! - `GET /sample-data` - built-in sample datasets
//!
//! Outside the prefix:
//!
//! - `GET /health` - liveness check
//! - `GET /ready` - readiness check (pings the store)
//!
//! Every error response has the shape `{"detail": "<message>"}`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
