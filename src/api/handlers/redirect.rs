//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, header},
    response::Redirect,
};
use std::net::SocketAddr;

use crate::api::dto::redirect::RedirectQuery;
use crate::domain::entities::ClickMetadata;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Header carrying the link secret, as an alternative to `?secret=`.
pub const SECRET_HEADER: &str = "x-link-secret";

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Collect click metadata (client IP, User-Agent, Referer)
/// 2. Resolve through [`crate::application::services::ResolutionService::resolve`]
/// 3. Return 307 Temporary Redirect
///
/// The click is queued by the service and recorded in the background; the
/// response never waits for it. A temporary redirect keeps browsers asking
/// again, so deactivation and destination changes take effect immediately.
///
/// # Errors
///
/// - 404 Not Found if no live record uses the code
/// - 410 Gone if the record is inactive or expired
/// - 401 Unauthorized if a secret is required and missing or wrong
/// - 503 Service Unavailable if the store is unavailable
pub async fn redirect_handler<U: UrlRepository + 'static>(
    Path(code): Path<String>,
    Query(query): Query<RedirectQuery>,
    State(state): State<AppState<U>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Redirect, AppError> {
    let secret = query.secret.or_else(|| {
        headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let metadata = ClickMetadata::new(
        Some(client_ip(&headers, addr, state.behind_proxy)),
        headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()),
        headers.get(header::REFERER).and_then(|v| v.to_str().ok()),
    );

    let destination = state
        .service
        .resolve(&code, secret.as_deref(), metadata)
        .await?;

    tracing::debug!(code = %code, "Redirecting");

    Ok(Redirect::temporary(&destination))
}
