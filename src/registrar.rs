//! Link registration
//!
//! Turns a validated URL into a stored record: known URLs get their expiry
//! pushed back, new URLs have their size requested and inserted under a
//! fresh random identifier.

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use tracing::{debug, info, instrument};

use crate::database::{self, AppState};
use crate::error::AppError;
use crate::model::LinkRecord;

/// Length of generated link identifiers
pub const ID_LENGTH: usize = 16;

/// Registers `url` and returns the identifier that serves it
///
/// The URL must already have passed [`crate::validator::validate`].
#[instrument(skip(state))]
pub async fn register(state: &AppState, url: &str) -> Result<String, AppError> {
    if let Some(existing) = database::find_by_url(&state.db, url)? {
        let refreshed = LinkRecord {
            expiry_date: Utc::now() + state.config.retention,
            ..existing
        };
        let id = database::upsert_by_url(&state.db, &refreshed)?;
        info!(id = %id, "extended existing link");
        return Ok(id);
    }

    let filesize = fetch_size(&state.http, url).await?;
    let (filename, extension) = split_filename(&last_path_segment(url));

    let record = LinkRecord {
        id: generate_id(),
        url: url.to_string(),
        filename,
        filesize,
        extension,
        expiry_date: Utc::now() + state.config.retention,
    };

    // A concurrent registration of the same URL may have won; its id is returned
    let id = database::upsert_by_url(&state.db, &record)?;
    info!(id = %id, filesize, "registered link");
    Ok(id)
}

/// Random alphanumeric identifier of [`ID_LENGTH`] characters
pub fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Reads the declared size of `url` without downloading its body
///
/// The response is dropped as soon as the headers arrive.
async fn fetch_size(client: &reqwest::Client, url: &str) -> Result<u64, AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| AppError::Upstream {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(AppError::UpstreamStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let size = declared_length(response.headers()).ok_or_else(|| AppError::MissingContentLength {
        url: url.to_string(),
    })?;
    debug!(size, "size request answered");
    Ok(size)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Last segment of the URL path, empty for bare hosts or unparseable input
pub fn last_path_segment(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_default()
}

/// Splits a file name into stem and extension (with its dot)
///
/// Leading dots belong to the stem, so ".bashrc" has no extension.
pub fn split_filename(name: &str) -> (String, String) {
    let first_non_dot = name.find(|c: char| c != '.').unwrap_or(name.len());
    match name.rfind('.') {
        Some(dot) if dot > first_non_dot => (name[..dot].to_string(), name[dot..].to_string()),
        _ => (name.to_string(), String::new()),
    }
}
