use crate::types::{Result, SleuthError};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::io;
use tokio_util::io::StreamReader;

/// Response body as an `AsyncRead`, ready for the SSE reader.
pub type EventByteReader = StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>;

/// Open the event stream at `url`.
///
/// A non-success status is read in full and returned as an upstream error;
/// the body of a successful response is handed over unread.
pub async fn open_event_stream(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
) -> Result<EventByteReader> {
    let mut request = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    tracing::info!("[CLIENT] GET {}", url);
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("[CLIENT] upstream returned {}: {}", status, body);
        return Err(SleuthError::Upstream(status, body).into());
    }

    if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        if !content_type.starts_with("text/event-stream") {
            tracing::warn!("[CLIENT] unexpected content type {}", content_type);
        }
    }

    let body = response
        .bytes_stream()
        .map_err(io::Error::other)
        .boxed();
    Ok(StreamReader::new(body))
}
