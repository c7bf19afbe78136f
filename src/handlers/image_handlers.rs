//! HTTP handlers for image upload and deletion.
//!
//! Bodies are taken as raw bytes and decoded leniently: a malformed body is
//! logged and replaced by its default, so the pipelines (not the extractor)
//! decide the response status.

use crate::{
    errors::AppError,
    models::request::{BulkUploadRequest, DeleteRequest, UploadRequest},
    state::AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use tracing::warn;

fn decode<T: DeserializeOwned + Default>(body: &Bytes, route: &str) -> T {
    serde_json::from_slice(body).unwrap_or_else(|err| {
        warn!(route, "Unable to decode request body: {}", err);
        T::default()
    })
}

/// `POST /upload` — upload a single picture from a server-side path.
pub async fn upload_picture(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let req: UploadRequest = decode(&body, "/upload");
    state.uploads.upload_single(&req).await?;
    Ok((StatusCode::OK, "Picture successfully uploaded!\n"))
}

/// `POST /zipupload` — upload every image inside a zip archive.
pub async fn bulk_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let req: BulkUploadRequest = decode(&body, "/zipupload");
    state.uploads.upload_archive(&req).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /delete` — delete a list of keys. Always 200; denied keys are
/// listed in the body.
pub async fn delete_pictures(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req: DeleteRequest = decode(&body, "/delete");
    let report = state.deletes.delete_many(&req).await;
    (StatusCode::OK, report.render())
}
