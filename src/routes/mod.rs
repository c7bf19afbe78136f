//! Defines routes for the image endpoints.
//!
//! ## Structure
//! - `POST   /upload`    — upload one picture
//! - `POST   /zipupload` — upload every picture in a zip archive
//! - `DELETE /delete`    — delete a list of pictures
//! - `GET    /healthz`, `GET /readyz` — probes
//!
//! The image routes are mounted both at the root and under `/api`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{bulk_upload, delete_pictures, upload_picture},
    },
    state::AppState,
};
use axum::{
    Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_picture))
        .route("/zipupload", post(bulk_upload))
        .route("/delete", delete(delete_pictures))
}

/// Build the router with CORS open to any origin and request tracing.
pub fn routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::DELETE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(image_routes())
        .nest("/api", image_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
