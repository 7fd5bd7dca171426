use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use store::{StatusLog, StatusRecord};

/// Body of `POST /status`.
#[derive(Debug, Deserialize)]
pub struct StatusCreate {
    pub client_name: String,
}

/// Record a status check and echo it back.
pub async fn create_status(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<StatusCreate>, JsonRejection>,
) -> ServerResult<Json<StatusRecord>> {
    let Json(input) = payload?;
    let record = StatusRecord::new(input.client_name);
    state.store.append_status(&record).await?;

    tracing::debug!(id = %record.id, client = %record.client_name, "status_recorded");
    Ok(Json(record))
}

/// Status checks in insertion order, capped at `status_list_limit`.
pub async fn list_status(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<Json<Vec<StatusRecord>>> {
    let records = state
        .store
        .list_status(state.config.status_list_limit)
        .await?;
    Ok(Json(records))
}
