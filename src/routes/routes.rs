//! Defines routes for the image hosting API.
//!
//! ## Structure
//! - **Auth endpoints**
//!   - `POST   /api/auth/login`  — exchange the admin password for a session cookie
//!   - `POST   /api/auth/logout` — clear the session cookie
//!   - `GET    /api/auth/verify` — `{ authenticated }`, 200 or 401
//!
//! - **Image endpoints** (require a session)
//!   - `POST   /api/upload` — multipart upload
//!   - `GET    /api/images` — list (supports limit, offset)
//!   - `DELETE /api/images` — delete one key or a batch
//!   - `GET    /api/config` — upload defaults for the UI

use crate::{
    handlers::{
        auth_handlers::{login, logout, verify},
        health_handlers::{healthz, readyz},
        image_handlers::{delete_images, list_images, upload_config, upload_image},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for multipart boundaries and the small option fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build and return the router for all API routes.
///
/// The body limit sits above `max_file_size` so oversize files are rejected
/// by the upload validation with a JSON error instead of by the transport.
pub fn routes(max_file_size: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Auth
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/verify", get(verify))
        // Images
        .route("/api/upload", post(upload_image))
        .route("/api/images", get(list_images).delete(delete_images))
        .route("/api/config", get(upload_config))
        .layer(DefaultBodyLimit::max(
            max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
}
