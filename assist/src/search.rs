//! Chunked cross-institution articulation search.
//!
//! ```text
//! lookup cache ──ready──▶ report (no chunk requests)
//!      │
//!      └─absent/in progress─▶ build links ─▶ queue of chunks
//!                                                │
//!                     ┌──────────────────────────┘
//!                     ▼
//!              POST chunk ─▶ decode lines ─▶ Record / Progress events
//!                     │
//!                     └─ queue empty ─▶ finalize (fire-and-forget)
//! ```
//!
//! Chunks run strictly one after another. Independent searches may run
//! concurrently; each owns its cache, finalize and abort lifecycle.

use futures_util::StreamExt;
use futures_util::future::{AbortHandle, Abortable, Aborted};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use cccb_config::{Institution, SearchConfig};
use cccb_types::{SearchRecord, SearchTarget};

use crate::cache::{CacheClient, CacheStatus};
use crate::decoder::LineDecoder;
use crate::endpoints::Endpoints;
use crate::error::AssistError;
use crate::links::{AgreementLink, LinkTemplates, build_links, chunk_links};
use crate::read_capped_error_body;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// The cache answered; no chunk requests will be made.
    CacheHit { records: usize },
    ChunkStarted { index: usize, total: usize, links: usize },
    /// A record with at least one result entry.
    Record(SearchRecord),
    Progress { completed: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Live,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub target: SearchTarget,
    pub source: ResultSource,
    pub records: Vec<SearchRecord>,
    pub chunks_total: usize,
    pub chunks_completed: usize,
    pub progress: usize,
    /// Why the chunk queue stopped early, if it did.
    pub interrupted: Option<String>,
    pub finalize_requested: bool,
}

impl SearchReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    #[must_use]
    pub fn has_results(&self) -> bool {
        self.records.iter().any(SearchRecord::has_results)
    }
}

/// What to search for and which college to leave out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub target: SearchTarget,
    pub primary_ccc_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkBody<'a> {
    links: &'a [AgreementLink],
    course_id: &'a str,
    year: &'a str,
}

/// Progress counter bounded by the candidate total.
#[derive(Debug, Clone, Copy)]
struct Progress {
    completed: usize,
    total: usize,
}

impl Progress {
    fn tick(&mut self) -> SearchEvent {
        self.completed = (self.completed + 1).min(self.total);
        self.event()
    }

    fn complete(&mut self) -> SearchEvent {
        self.completed = self.total;
        self.event()
    }

    const fn event(self) -> SearchEvent {
        SearchEvent::Progress {
            completed: self.completed,
            total: self.total,
        }
    }
}

async fn send_event(tx: &mpsc::Sender<SearchEvent>, event: SearchEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// Progress ticks are superseded by the next one; drop them when the
/// receiver is behind instead of stalling the stream.
fn offer_progress(tx: &mpsc::Sender<SearchEvent>, event: SearchEvent) {
    let _ = tx.try_send(event);
}

#[derive(Debug, Clone)]
pub struct SearchRunner {
    client: reqwest::Client,
    search_url: Url,
    cache: CacheClient,
    templates: LinkTemplates,
    colleges: Vec<Institution>,
    settings: SearchConfig,
}

impl SearchRunner {
    pub fn new(
        client: reqwest::Client,
        endpoints: &Endpoints,
        colleges: Vec<Institution>,
        settings: SearchConfig,
    ) -> Result<Self, AssistError> {
        Ok(Self {
            search_url: endpoints.search()?.clone(),
            templates: endpoints.link_templates()?,
            cache: CacheClient::new(
                client.clone(),
                endpoints.cache_lookup.clone(),
                endpoints.cache_finalize.clone(),
            ),
            client,
            colleges,
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> SearchConfig {
        self.settings
    }

    /// Run one search to completion, emitting events as records arrive.
    ///
    /// Events are best-effort: a dropped receiver does not stop the search.
    pub async fn run(
        &self,
        request: &SearchRequest,
        tx: &mpsc::Sender<SearchEvent>,
    ) -> Result<SearchReport, AssistError> {
        let target = &request.target;
        let mut progress = Progress {
            completed: 0,
            total: self.settings.candidate_total,
        };

        let cache = self.cache.lookup(&target.course).await;
        if let CacheStatus::Ready(records) = cache {
            tracing::info!(course = %target.course, records = records.len(), "Search served from cache");
            send_event(tx, SearchEvent::CacheHit { records: records.len() }).await;
            for record in records.iter().filter(|r| r.has_results()) {
                send_event(tx, SearchEvent::Record(record.clone())).await;
            }
            offer_progress(tx, progress.complete());
            return Ok(SearchReport {
                target: target.clone(),
                source: ResultSource::Cache,
                records,
                chunks_total: 0,
                chunks_completed: 0,
                progress: progress.completed,
                interrupted: None,
                finalize_requested: false,
            });
        }

        let links = build_links(&self.templates, &self.colleges, &request.primary_ccc_id, target);
        let mut queue = chunk_links(links, self.settings.chunk_size);
        let mut report = SearchReport {
            target: target.clone(),
            source: ResultSource::Live,
            records: Vec::new(),
            chunks_total: queue.len(),
            chunks_completed: 0,
            progress: 0,
            interrupted: None,
            finalize_requested: false,
        };
        tracing::info!(
            course = %target.course,
            chunks = report.chunks_total,
            in_progress_elsewhere = matches!(cache, CacheStatus::InProgress),
            "Starting articulation search"
        );

        while let Some(chunk) = queue.pop_front() {
            let index = report.chunks_completed;
            send_event(
                tx,
                SearchEvent::ChunkStarted {
                    index,
                    total: report.chunks_total,
                    links: chunk.len(),
                },
            )
            .await;

            match self.run_chunk(&chunk, target, &mut report, &mut progress, tx).await {
                Ok(()) => {
                    report.chunks_completed += 1;
                    tracing::debug!(
                        chunk = index,
                        records = report.records.len(),
                        progress = progress.completed,
                        "Chunk complete"
                    );
                }
                Err(e) => {
                    tracing::warn!(%e, chunk = index, remaining = queue.len(), "Search chunk failed");
                    report.interrupted = Some(e.to_string());
                    queue.clear();
                }
            }
        }

        if report.is_complete() {
            offer_progress(tx, progress.complete());
        }
        report.progress = progress.completed;

        if report.is_complete() && !report.records.is_empty() && cache.allows_finalize() {
            report.finalize_requested = self.cache.spawn_finalize(target.course.clone()).is_some();
        }

        tracing::info!(
            course = %target.course,
            records = report.records.len(),
            complete = report.is_complete(),
            "Articulation search finished"
        );
        Ok(report)
    }

    async fn run_chunk(
        &self,
        chunk: &[AgreementLink],
        target: &SearchTarget,
        report: &mut SearchReport,
        progress: &mut Progress,
        tx: &mpsc::Sender<SearchEvent>,
    ) -> Result<(), AssistError> {
        let body = ChunkBody {
            links: chunk,
            course_id: target.base_course_id(),
            year: target.year(),
        };
        let response = self
            .client
            .post(self.search_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|source| AssistError::Transport {
                url: self.search_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(AssistError::Status {
                url: self.search_url.to_string(),
                status,
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|source| AssistError::Transport {
                url: self.search_url.to_string(),
                source,
            })?;
            for line in decoder.feed(&bytes)? {
                handle_line(&line, report, progress, tx).await;
            }
        }
        if let Some(line) = decoder.finish() {
            handle_line(&line, report, progress, tx).await;
        }
        Ok(())
    }

    /// Run the search on a background task that [`SearchHandle::abort`] can
    /// cancel, in flight or between chunks.
    #[must_use]
    pub fn spawn(&self, request: SearchRequest) -> SearchHandle {
        let runner = self.clone();
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (abort, registration) = AbortHandle::new_pair();
        let task = tokio::spawn(Abortable::new(
            async move { runner.run(&request, &tx).await },
            registration,
        ));
        SearchHandle { events, abort, task }
    }
}

async fn handle_line(
    line: &[u8],
    report: &mut SearchReport,
    progress: &mut Progress,
    tx: &mpsc::Sender<SearchEvent>,
) {
    offer_progress(tx, progress.tick());
    match serde_json::from_slice::<SearchRecord>(line) {
        Ok(record) if record.has_results() => {
            send_event(tx, SearchEvent::Record(record.clone())).await;
            report.records.push(record);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(%e, payload_bytes = line.len(), "Skipping malformed search record");
        }
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    Completed(SearchReport),
    Cancelled,
    Failed(AssistError),
}

/// A search running on a background task.
///
/// Progress ticks never block the search, but chunk and record events wait
/// for channel capacity: drain `events`, or drop it, while the search runs.
#[derive(Debug)]
pub struct SearchHandle {
    /// Drain this before [`join`](Self::join) to observe progress.
    pub events: mpsc::Receiver<SearchEvent>,
    abort: AbortHandle,
    task: JoinHandle<Result<Result<SearchReport, AssistError>, Aborted>>,
}

impl SearchHandle {
    pub fn abort(&self) {
        self.abort.abort();
    }

    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Wait for the task. Undrained events are discarded.
    pub async fn join(self) -> SearchOutcome {
        let Self { events, task, .. } = self;
        drop(events);
        match task.await {
            Ok(Ok(Ok(report))) => SearchOutcome::Completed(report),
            Ok(Ok(Err(e))) => SearchOutcome::Failed(e),
            Ok(Err(Aborted)) => SearchOutcome::Cancelled,
            Err(e) if e.is_cancelled() => SearchOutcome::Cancelled,
            Err(e) => SearchOutcome::Failed(AssistError::Task(e.to_string())),
        }
    }
}
