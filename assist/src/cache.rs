//! Shared search-result cache.
//!
//! The cache is keyed by the composite course id. A lookup answers one of:
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 200 | Ready: the body holds the cached records |
//! | 204 | Absent or incomplete: search, then finalize |
//! | 206 | Another caller is filling it: search, never finalize |
//!
//! Any other status and any transport failure count as absent.

use cccb_types::{CompositeCourseId, SearchRecord};
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use url::Url;

use crate::endpoints::join_segments;
use crate::error::AssistError;
use crate::read_capped_error_body;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    Ready(Vec<SearchRecord>),
    Absent,
    InProgress,
}

impl CacheStatus {
    /// Whether a search that ran after this lookup may finalize the cache.
    #[must_use]
    pub const fn allows_finalize(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

#[derive(Debug, Clone)]
pub struct CacheClient {
    client: reqwest::Client,
    lookup_url: Option<Url>,
    finalize_url: Option<Url>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct FinalizeBody<'a> {
    full_course_id: &'a str,
}

impl CacheClient {
    #[must_use]
    pub fn new(client: reqwest::Client, lookup_url: Option<Url>, finalize_url: Option<Url>) -> Self {
        Self {
            client,
            lookup_url,
            finalize_url,
        }
    }

    /// Never fails: anything other than a usable answer is [`CacheStatus::Absent`].
    pub async fn lookup(&self, id: &CompositeCourseId) -> CacheStatus {
        let Some(base) = &self.lookup_url else {
            return CacheStatus::Absent;
        };
        let key = id.to_string();
        let url = match join_segments("cache_lookup", base, &[key.as_str()]) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%e, "Cache lookup skipped");
                return CacheStatus::Absent;
            }
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%e, course = %key, "Cache lookup failed");
                return CacheStatus::Absent;
            }
        };

        match response.status() {
            StatusCode::OK => match response.bytes().await {
                Ok(bytes) => match serde_json::from_slice::<Vec<SearchRecord>>(&bytes) {
                    Ok(records) => {
                        tracing::debug!(course = %key, records = records.len(), "Cache ready");
                        CacheStatus::Ready(records)
                    }
                    Err(e) => {
                        tracing::warn!(%e, course = %key, "Unreadable cache body");
                        CacheStatus::Absent
                    }
                },
                Err(e) => {
                    tracing::warn!(%e, course = %key, "Cache body read failed");
                    CacheStatus::Absent
                }
            },
            StatusCode::NO_CONTENT => {
                tracing::info!(course = %key, "Restarting incomplete caching job");
                CacheStatus::Absent
            }
            StatusCode::PARTIAL_CONTENT => CacheStatus::InProgress,
            status => {
                tracing::debug!(course = %key, %status, "Unexpected cache status");
                CacheStatus::Absent
            }
        }
    }

    /// Mark the cache entry for `id` as complete.
    pub async fn finalize(&self, id: &CompositeCourseId) -> Result<(), AssistError> {
        let Some(url) = &self.finalize_url else {
            return Ok(());
        };
        let key = id.to_string();
        let response = self
            .client
            .post(url.clone())
            .json(&FinalizeBody { full_course_id: &key })
            .send()
            .await
            .map_err(|source| AssistError::Transport {
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
        Ok(())
    }

    /// Finalize in the background. Failures are logged and dropped.
    /// Returns `None` when no finalize endpoint is configured.
    pub fn spawn_finalize(&self, id: CompositeCourseId) -> Option<JoinHandle<()>> {
        self.finalize_url.as_ref()?;
        let cache = self.clone();
        Some(tokio::spawn(async move {
            match cache.finalize(&id).await {
                Ok(()) => tracing::debug!(course = %id, "Cache finalized"),
                Err(e) => tracing::warn!(%e, course = %id, "Error finalizing cache job"),
            }
        }))
    }
}
