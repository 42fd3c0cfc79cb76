//! Login, logout and session verification, plus the extractor that gates
//! the management endpoints.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    errors::AppError,
    models::response::SuccessResponse,
    services::session::SESSION_COOKIE,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
}

/// Extractor that rejects the request with 401 unless the session cookie
/// carries a valid token.
pub struct AdminSession;

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let jar = CookieJar::from_headers(&parts.headers);
        state
            .sessions
            .verify(jar.get(SESSION_COOKIE).map(|c| c.value()))?;
        Ok(AdminSession)
    }
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SuccessResponse>), AppError> {
    let token = state.sessions.login(&body.password).inspect_err(|_| {
        warn!("rejected admin login attempt");
    })?;
    info!("admin session issued");

    Ok((
        jar.add(state.sessions.session_cookie(token)),
        Json(SuccessResponse::ok()),
    ))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    (
        jar.add(state.sessions.removal_cookie()),
        Json(SuccessResponse::ok()),
    )
}

/// `GET /api/auth/verify`
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (StatusCode, Json<VerifyResponse>) {
    match state
        .sessions
        .verify(jar.get(SESSION_COOKIE).map(|c| c.value()))
    {
        Ok(()) => (
            StatusCode::OK,
            Json(VerifyResponse {
                authenticated: true,
            }),
        ),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                authenticated: false,
            }),
        ),
    }
}
