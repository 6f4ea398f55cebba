//! Direct-link validation
//!
//! A submitted URL is accepted when a HEAD request (redirects followed)
//! ends on something that is not an HTML page.

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument};

/// Returns `true` when `url` points at a downloadable file
///
/// - Final `Content-Type` containing `text/html` -> `false`
/// - Missing `Content-Type` -> `true`
/// - Any request failure (bad URL, refused connection, timeout) -> `false`
#[instrument(skip(client))]
pub async fn validate(client: &reqwest::Client, url: &str) -> bool {
    let response = match client.head(url).send().await {
        Ok(response) => response,
        Err(err) => {
            info!(error = %err, "link check failed");
            return false;
        }
    };

    let final_url = response.url().to_string();
    if final_url != url {
        debug!(final_url = %final_url, "link redirected");
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if is_webpage(&content_type) {
        info!(final_url = %final_url, "link is a web page");
        return false;
    }

    debug!(final_url = %final_url, status = %response.status(), "reached file");
    true
}

fn is_webpage(content_type: &str) -> bool {
    content_type.contains("text/html")
}
