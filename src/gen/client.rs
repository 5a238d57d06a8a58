use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::utils::http::get_http_client;

/// Per-attempt failure. The generation loop records these and moves on to
/// the next attempt; none of them aborts a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("endpoint returned {0}")]
    Status(StatusCode),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

/// `GET <base>/<url-encoded prompt>?width=<w>&height=<h>`. The prompt is
/// pushed as a path segment so percent-encoding is handled by `url`.
pub fn build_image_url(
    base: &str,
    prompt: &str,
    width: u32,
    height: u32,
) -> Result<Url, FetchError> {
    let mut url =
        Url::parse(base).map_err(|err| FetchError::InvalidUrl(format!("{base}: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(format!("{base} cannot take a path")))?
        .push(prompt);
    url.query_pairs_mut()
        .append_pair("width", &width.to_string())
        .append_pair("height", &height.to_string());
    Ok(url)
}

/// Fetches one image, honoring the session's per-attempt timeout. Returns
/// the raw bytes on a 2xx response.
pub async fn fetch_image(url: Url, timeout_seconds: u64) -> Result<Vec<u8>, FetchError> {
    let response = get_http_client()
        .get(url)
        .timeout(Duration::from_secs(timeout_seconds))
        .send()
        .await
        .map_err(|err| classify(err, timeout_seconds))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| classify(err, timeout_seconds))?;
    Ok(bytes.to_vec())
}

fn classify(err: reqwest::Error, timeout_seconds: u64) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout_seconds)
    } else {
        FetchError::Network(err)
    }
}
