//! HTTP request handlers for the download relay
//!
//! This module wires the HTTP surface to the core components:
//! - Landing page and URL submission (validator + registrar)
//! - Link details and downloads (store lookup + streaming relay)
//! - The analytics listing and the framework fallbacks

use std::any::Any;
use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::Utc;

use crate::database::{self, AppState};
use crate::error::AppError;
use crate::model::{LinkRecord, VerifyForm};
use crate::{registrar, relay, validator, view};

/// Renders the landing page
///
/// # Returns
///
/// - **200 OK** - HTML page with the URL submission form
pub async fn index() -> Html<String> {
    Html(view::index_page())
}

/// Validates and registers a submitted URL
///
/// # Request Body
///
/// Form-encoded `url=https%3A%2F%2Fexample.com%2Ffile.zip`
///
/// # Response
///
/// - **302 Found** - Redirect to `/viewdetails/{id}`
/// - **400 Bad Request** - The URL is a webpage or unreachable (nothing stored)
/// - **502 Bad Gateway** - The size request failed (nothing stored)
///
/// # Arguments
///
/// * `state` - Shared application state (store, HTTP client, configuration)
/// * `form` - Submitted form carrying the `url` field
pub async fn verify_url(
    State(state): State<AppState>,
    Form(form): Form<VerifyForm>,
) -> Result<Response, AppError> {
    let url = form.url.trim();

    // Refuse webpages and unreachable URLs before touching the store
    if !validator::validate(&state.http, url).await {
        return Err(AppError::Rejected);
    }

    // Register the URL (or extend its existing link) and redirect to its details
    let id = registrar::register(&state, url).await?;
    let location = format!("/viewdetails/{}", id);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Shows the details of a live link
///
/// # Path Parameters
///
/// - `id` - Link identifier
///
/// # Response
///
/// - **200 OK** - Detail page
/// - **404 Not Found** - Unknown identifier
/// - **410 Gone** - The link expired
pub async fn view_details(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    // Look up the record by its identifier
    let record = database::find_by_id(&state.db, &id)?.ok_or(AppError::NotFound)?;

    // Expired records are kept in the store but no longer shown
    let now = Utc::now();
    if record.is_expired(now) {
        return Err(AppError::Expired);
    }

    Ok(Html(view::detail_page(&record, now)))
}

/// Relays the file behind a live link
///
/// # Response
///
/// - **200 OK** - Streamed upstream body with rewritten headers
/// - **404 Not Found** / **410 Gone** - Unknown or expired identifier
/// - **502 Bad Gateway** - The upstream refused the request
pub async fn download(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    relay::stream(&state, &id).await
}

/// Lists every stored record, largest first, with the total size
///
/// Served on the configured analytics path without authentication.
pub async fn analytics(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    // Load every record, then collapse duplicates and order the rows
    let records = listing(database::list_all(&state.db)?);
    Ok(Html(view::analytics_page(&records)))
}

/// One row per URL (the last stored wins), ordered by size descending
fn listing(records: Vec<LinkRecord>) -> Vec<LinkRecord> {
    let mut by_url: HashMap<String, LinkRecord> = HashMap::new();
    for record in records {
        by_url.insert(record.url.clone(), record);
    }

    let mut rows: Vec<LinkRecord> = by_url.into_values().collect();
    rows.sort_by(|a, b| b.filesize.cmp(&a.filesize).then_with(|| a.id.cmp(&b.id)));
    rows
}

/// Fallback for paths that match neither a route nor an accessible file
pub async fn not_found(uri: Uri) -> Response {
    tracing::warn!(target: "not_found", "404 error at URL: {}", uri);
    (StatusCode::NOT_FOUND, Html(view::error_page("wrong address"))).into_response()
}

/// Converts a handler panic into the generic error page
///
/// # Arguments
///
/// * `panic` - Payload captured by `CatchPanicLayer`
///
/// # Returns
///
/// A **500 Internal Server Error** response; the panic message is logged,
/// never shown
pub fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    // Panic payloads are either `String` or `&'static str`
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(target: "internal_error", "500 error: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(view::error_page("something went wrong, try again later")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, url: &str, filesize: u64) -> LinkRecord {
        LinkRecord {
            id: id.to_string(),
            url: url.to_string(),
            filename: "f".to_string(),
            filesize,
            extension: String::new(),
            expiry_date: Utc::now() + Duration::days(1),
        }
    }

    #[test]
    fn listing_dedupes_by_url_and_sorts_by_size() {
        let rows = listing(vec![
            record("a", "https://x/1", 10),
            record("b", "https://x/2", 30),
            record("c", "https://x/1", 20),
        ]);

        let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
