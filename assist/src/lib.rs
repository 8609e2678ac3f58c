//! HTTP clients for CCCBuilder.
//!
//! # Architecture
//!
//! - [`HttpDataSource`] - requirement catalog and articulation dataset fetches
//! - [`SearchRunner`] - chunked, cache-aware articulation search over a
//!   newline-delimited JSON stream
//! - [`CacheClient`] - shared result cache lookup and fire-and-forget finalize
//!
//! The search reports progress through a [`tokio::sync::mpsc::Sender<SearchEvent>`]
//! channel so records can be displayed as they arrive.
//!
//! # Error Handling
//!
//! Dataset fetches return [`AssistError`]. The search never fails because of a
//! bad record or a failed chunk: malformed lines are logged and skipped, and a
//! failed chunk ends the search with the records collected so far and the
//! failure recorded in [`SearchReport::interrupted`].

mod cache;
mod decoder;
mod endpoints;
mod error;
mod links;
mod search;
mod source;

use std::sync::OnceLock;
use std::time::Duration;

use serde::de::DeserializeOwned;

pub use cache::{CacheClient, CacheStatus};
pub use decoder::{LineDecoder, MAX_LINE_BUFFER_BYTES};
pub use endpoints::Endpoints;
pub use error::AssistError;
pub use links::{AgreementLink, LinkTemplates, build_links, chunk_links};
pub use search::{
    ResultSource, SearchEvent, SearchHandle, SearchOutcome, SearchReport, SearchRequest, SearchRunner,
};
pub use source::HttpDataSource;

pub use cccb_types;

const CONNECT_TIMEOUT_SECS: u64 = 30;

// TCP keepalive matches typical load balancer idle windows.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared client. The search has no deadline of its own, so only the
/// connect timeout is set.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build configured HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("cccb/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Send a request and decode a JSON body, mapping every failure to
/// [`AssistError`] tagged with the URL.
pub(crate) async fn send_json<T>(request: reqwest::RequestBuilder, url: &url::Url) -> Result<T, AssistError>
where
    T: DeserializeOwned,
{
    let response = request.send().await.map_err(|source| AssistError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = read_capped_error_body(response).await;
        return Err(AssistError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }

    let bytes = response.bytes().await.map_err(|source| AssistError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| AssistError::Decode {
        url: url.to_string(),
        source,
    })
}
