//! Route definitions for the download relay
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. It creates the Axum router with the application state.

use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, Extensions, HeaderMap, StatusCode, Version};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::predicate::{Predicate, SizeAbove};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::database::AppState;
use crate::handler::{
    analytics, download, index, internal_error, not_found, verify_url, view_details,
};

/// Content types worth compressing; relayed files never match
const COMPRESSIBLE_TYPES: [&str; 6] = [
    "text/html",
    "text/css",
    "text/plain",
    "text/javascript",
    "application/json",
    "application/javascript",
];

/// Responses smaller than this are sent as is
const MIN_COMPRESS_SIZE: u16 = 32;

/// Compression predicate: only the text responses the relay renders or
/// serves from the accessible directory
///
/// Relayed downloads keep their upstream bytes and Content-Length.
pub fn compressible(
    _status: StatusCode,
    _version: Version,
    headers: &HeaderMap,
    _extensions: &Extensions,
) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let content_type = content_type.to_ascii_lowercase();
    COMPRESSIBLE_TYPES
        .iter()
        .any(|text_type| content_type.starts_with(text_type))
}

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /` - Landing page
/// - `POST /verifyurl` - Validates and registers a URL, redirects to its details
/// - `GET /viewdetails/{id}` - Link details
/// - `GET /download/{id}` - Streams the linked file
/// - `GET {analytics_path}` - Listing of all records (path from configuration)
/// - anything else - File from the accessible directory, or the 404 page
///
/// Text responses are compressed (br or gzip) when the client accepts it;
/// see [`compressible`].
///
/// # Arguments
///
/// * `state` - Application state shared by every handler
///
/// # Returns
///
/// A configured `Router` ready to be served
///
/// # Example Usage
///
/// ```no_run
/// # use nimbaha::config::Config;
/// # use nimbaha::database::{init_db, AppState};
/// # use nimbaha::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::new(db, Config::default()).unwrap();
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    // The analytics route is configurable, the rest are fixed
    let analytics_path = state.config.analytics_path.clone();

    // Unmatched paths fall through to the accessible directory, then to the 404 page
    let accessible_files =
        ServeDir::new(&state.config.accessible_dir).not_found_service(not_found.into_service());

    Router::new()
        .route("/", get(index))
        .route("/verifyurl", post(verify_url))
        .route("/viewdetails/{id}", get(view_details))
        .route("/download/{id}", get(download))
        .route(&analytics_path, get(analytics))
        .fallback_service(accessible_files)
        // Turn handler panics into the 500 page
        .layer(CatchPanicLayer::custom(internal_error))
        // Compress text responses only
        .layer(
            CompressionLayer::new()
                .compress_when(SizeAbove::new(MIN_COMPRESS_SIZE).and(compressible)),
        )
        // Inject the application state into all handlers
        .with_state(state)
}
