use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use chartdeck::{upload_dataset_within, UploadSummary};
use std::sync::Arc;
use tokio::time::Instant;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Accept a CSV file, store it and return a summary with a short preview.
///
/// This route is not wrapped by the request timeout middleware. The
/// configured timeout covers reading the body and parsing it; the insert,
/// once started, always runs to completion and its outcome is reported.
pub async fn upload_csv(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<UploadSummary>> {
    let deadline = Instant::now() + state.config.timeout();
    let multipart = multipart.map_err(|e| ServerError::Upload(e.body_text()))?;
    let (filename, bytes) = tokio::time::timeout_at(
        deadline,
        read_file_part(multipart, state.config.max_body_size_mb),
    )
    .await
    .map_err(|_| ServerError::Timeout)??;

    let budget = deadline.saturating_duration_since(Instant::now());
    let summary = upload_dataset_within(
        &state.store,
        &filename,
        bytes,
        &state.config.tabular,
        budget,
    )
    .await?;
    Ok(Json(summary))
}

/// The `file` part, or failing that the first part with a filename.
async fn read_file_part(
    mut multipart: Multipart,
    limit_mb: usize,
) -> ServerResult<(String, Bytes)> {
    let mut fallback = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit_mb))?
    {
        let is_file_field = field.name() == Some(FILE_FIELD);
        if !is_file_field && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit_mb))?;

        if is_file_field {
            return Ok((filename, bytes));
        }
        fallback = Some((filename, bytes));
    }

    fallback.ok_or_else(|| ServerError::Upload(format!("missing multipart field '{FILE_FIELD}'")))
}

fn multipart_error(err: MultipartError, limit_mb: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(limit_mb)
    } else {
        ServerError::Upload(err.body_text())
    }
}
