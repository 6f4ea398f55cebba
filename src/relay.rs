//! Streaming relay
//!
//! Serves a registered link by forwarding the upstream response body in
//! fixed-size chunks. Only one chunk is held in memory at a time; dropping
//! the response body (client gone) drops the upstream response with it.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use chrono::Utc;
use futures_util::{stream, Stream, StreamExt};
use tracing::{debug, info, instrument};

use crate::database::{self, AppState};
use crate::error::AppError;
use crate::registrar::last_path_segment;

/// Headers that describe the upstream connection rather than the payload
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

/// Opens the upstream stream for link `id`
///
/// Unknown and expired links are answered without contacting the upstream
/// server. Upstream failures before the body starts become
/// [`AppError::Upstream`] or [`AppError::UpstreamStatus`]; failures after
/// that end the body early. Nothing is retried.
#[instrument(skip(state))]
pub async fn stream(state: &AppState, id: &str) -> Result<Response, AppError> {
    let record = database::find_by_id(&state.db, id)?.ok_or(AppError::NotFound)?;
    if record.is_expired(Utc::now()) {
        return Err(AppError::Expired);
    }

    let upstream = state
        .http
        .get(&record.url)
        .send()
        .await
        .map_err(|source| AppError::Upstream {
            url: record.url.clone(),
            source,
        })?;

    if !upstream.status().is_success() {
        return Err(AppError::UpstreamStatus {
            url: record.url.clone(),
            status: upstream.status().as_u16(),
        });
    }

    let headers = relay_headers(upstream.headers(), &last_path_segment(&record.url))?;
    info!(url = %record.url, "relaying download");

    let body = Body::from_stream(rechunk(
        Box::pin(upstream.bytes_stream()),
        state.config.chunk_size,
    ));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Copies end-to-end upstream headers and decides the content disposition
///
/// Anything that is not an image is sent as an attachment named after the
/// last segment of the source URL path.
fn relay_headers(upstream: &HeaderMap, basename: &str) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if !HOP_BY_HOP.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    let content_type = headers
        .entry(header::CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/octet-stream"))
        .to_str()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if !content_type.starts_with("image/") {
        let name = if basename.is_empty() { "download" } else { basename };
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
            .map_err(|e| AppError::Internal(format!("invalid content disposition: {e}")))?;
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(headers)
}

/// Regroups an upstream byte stream into chunks of exactly `chunk_size`
/// bytes; only the last chunk may be shorter
///
/// An upstream error is forwarded once and ends the stream.
pub fn rechunk<S, E>(upstream: S, chunk_size: usize) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let chunk_size = chunk_size.max(1);

    stream::unfold(
        (upstream, Vec::new(), false),
        move |(mut upstream, mut buffer, finished)| async move {
            if finished {
                return None;
            }

            loop {
                if buffer.len() >= chunk_size {
                    let rest = buffer.split_off(chunk_size);
                    let chunk = Bytes::from(std::mem::replace(&mut buffer, rest));
                    return Some((Ok(chunk), (upstream, buffer, false)));
                }

                match upstream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(err)) => {
                        debug!("upstream stream failed, ending relay");
                        return Some((Err(err), (upstream, Vec::new(), true)));
                    }
                    None if buffer.is_empty() => return None,
                    None => {
                        let chunk = Bytes::from(std::mem::take(&mut buffer));
                        return Some((Ok(chunk), (upstream, buffer, true)));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_chunks(
        parts: Vec<Result<&'static [u8], &'static str>>,
        chunk_size: usize,
    ) -> Vec<Result<Vec<u8>, &'static str>> {
        let upstream = stream::iter(
            parts
                .into_iter()
                .map(|part| part.map(Bytes::from_static))
                .collect::<Vec<_>>(),
        );
        rechunk(upstream, chunk_size)
            .map(|item| item.map(|bytes| bytes.to_vec()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn rechunk_emits_fixed_size_chunks_and_a_short_tail() {
        let chunks = collect_chunks(vec![Ok(&b"abcde"[..]), Ok(&b"fg"[..]), Ok(&b"hijklmn"[..])], 4).await;
        assert_eq!(
            chunks,
            vec![
                Ok(b"abcd".to_vec()),
                Ok(b"efgh".to_vec()),
                Ok(b"ijkl".to_vec()),
                Ok(b"mn".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn rechunk_splits_oversized_upstream_pieces() {
        let chunks = collect_chunks(vec![Ok(&b"0123456789"[..])], 3).await;
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3], Ok(b"9".to_vec()));
    }

    #[tokio::test]
    async fn rechunk_stops_after_an_error() {
        let chunks = collect_chunks(vec![Ok(&b"ab"[..]), Err("reset"), Ok(&b"cd"[..])], 8).await;
        assert_eq!(chunks, vec![Err("reset")]);
    }

    #[tokio::test]
    async fn rechunk_of_empty_body_is_empty() {
        assert!(collect_chunks(vec![], 8).await.is_empty());
    }

    #[test]
    fn non_images_become_attachments() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let headers = relay_headers(&upstream, "file.zip").unwrap();
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=\"file.zip\"");
        assert_eq!(headers[header::CONTENT_LENGTH], "12");
        assert!(!headers.contains_key(header::TRANSFER_ENCODING));
    }

    #[test]
    fn images_are_shown_inline() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        let headers = relay_headers(&upstream, "cat.png").unwrap();
        assert!(!headers.contains_key(header::CONTENT_DISPOSITION));
    }

    #[test]
    fn missing_content_type_defaults_to_octet_stream() {
        let headers = relay_headers(&HeaderMap::new(), "").unwrap();
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=\"download\"");
    }
}
