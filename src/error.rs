//! Application error type and its HTML rendering
//!
//! Every handler returns `Result<_, AppError>`. Errors are turned into the
//! shared error page with a status code matching the failure.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::database::StoreError;
use crate::view;

/// Failures surfaced to the user
#[derive(Debug, Error)]
pub enum AppError {
    /// The submitted URL is a webpage or could not be reached
    #[error("link is invalid or not a direct file link")]
    Rejected,

    /// No record carries the requested identifier
    #[error("link does not exist")]
    NotFound,

    /// The record exists but its retention window has passed
    #[error("download time for this link has ended")]
    Expired,

    /// The size request answered without a usable `Content-Length`
    #[error("upstream did not declare a content length for {url}")]
    MissingContentLength {
        /// The requested URL.
        url: String,
    },

    /// Network-level failure talking to the upstream server
    #[error("network error contacting {url}: {source}")]
    Upstream {
        /// The upstream URL.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus {
        /// The upstream URL.
        url: String,
        /// The status code received.
        status: u16,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status used when rendering this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Rejected => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Expired => StatusCode::GONE,
            AppError::MissingContentLength { .. }
            | AppError::Upstream { .. }
            | AppError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown on the error page
    ///
    /// Upstream and internal details stay in the logs.
    fn user_message(&self) -> String {
        match self {
            AppError::Rejected | AppError::NotFound | AppError::Expired => self.to_string(),
            AppError::MissingContentLength { .. }
            | AppError::Upstream { .. }
            | AppError::UpstreamStatus { .. } => {
                "the file server could not be reached, try again later".to_string()
            }
            AppError::Store(_) | AppError::Internal(_) => {
                "something went wrong, try again later".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Rejected => tracing::info!("{}", self),
            AppError::NotFound | AppError::Expired => tracing::debug!("{}", self),
            AppError::MissingContentLength { .. }
            | AppError::Upstream { .. }
            | AppError::UpstreamStatus { .. } => tracing::warn!("{}", self),
            AppError::Store(_) | AppError::Internal(_) => tracing::error!("{}", self),
        }

        (self.status(), Html(view::error_page(&self.user_message()))).into_response()
    }
}
