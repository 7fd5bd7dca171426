use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use store::DatasetStore;
use tabular::DatasetRecord;

/// Fetch a stored dataset by the id its upload returned.
pub async fn get_chart_data(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<DatasetRecord>> {
    state
        .store
        .find_dataset(&id)
        .await
        .map_err(ServerError::Lookup)?
        .map(Json)
        .ok_or_else(|| ServerError::not_found("Chart data not found"))
}
