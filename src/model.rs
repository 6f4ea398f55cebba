//! Data models for the download relay
//!
//! This module defines the persisted link record and the request payloads
//! accepted by the HTTP handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered direct-download link, stored in the database
///
/// One record exists per distinct source URL. The record is created on the
/// first successful registration and only its expiry changes afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinkRecord {
    /// Opaque identifier exposed in `/viewdetails/{id}` and `/download/{id}`
    pub id: String,

    /// Source URL exactly as it was submitted
    pub url: String,

    /// File stem taken from the last path segment of the URL (e.g. "file")
    pub filename: String,

    /// Size declared by the upstream `Content-Length` at registration time
    pub filesize: u64,

    /// Extension including its leading dot (e.g. ".zip"), empty when absent
    pub extension: String,

    /// Moment after which the link can no longer be viewed or downloaded
    pub expiry_date: DateTime<Utc>,
}

impl LinkRecord {
    /// A link is expired once its expiry timestamp is not in the future
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }
}

/// Form payload posted by the landing page
///
/// # Example
/// Body: `url=https%3A%2F%2Fexample.com%2Ffile.zip`
#[derive(Deserialize)]
pub struct VerifyForm {
    /// Candidate direct-file URL
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expiry_date: DateTime<Utc>) -> LinkRecord {
        LinkRecord {
            id: "abcdefgh12345678".to_string(),
            url: "https://example.com/file.zip".to_string(),
            filename: "file".to_string(),
            filesize: 10,
            extension: ".zip".to_string(),
            expiry_date,
        }
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        assert!(record(now).is_expired(now));
        assert!(record(now - Duration::seconds(1)).is_expired(now));
        assert!(!record(now + Duration::seconds(1)).is_expired(now));
    }
}
