//! API route handlers
//!
//! - `health`: liveness and readiness checks
//! - `status`: status check log
//! - `upload`: CSV upload
//! - `chart_data`: stored dataset lookup
//! - `sample`: built-in sample datasets

pub mod chart_data;
pub mod health;
pub mod sample;
pub mod status;
pub mod upload;

use crate::error::ServerError;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: &'static str,
}

/// Root of the API prefix.
pub async fn hello() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello World",
    })
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::not_found("Not Found")
}
