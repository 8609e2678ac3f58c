//! Shared test utilities and fixtures
//!
//! Mock service endpoints and canned wire payloads for the integration suite.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::sleep;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use cccb_assist::{Endpoints, SearchEvent, SearchHandle, SearchOutcome, SearchRunner, http_client};
use cccb_config::{Institution, SearchConfig};

pub const SEARCH_PATH: &str = "/search";
pub const FINALIZE_PATH: &str = "/cache-finalize";

/// Every endpoint pointed at `server`.
pub fn endpoints(server: &MockServer) -> Endpoints {
    let url = |p: &str| Some(Url::parse(&format!("{}{p}", server.uri())).expect("mock url"));
    Endpoints {
        requirements: url("/requirements"),
        articulations: url("/articulations"),
        equivalence: url("/equivalence"),
        search: url(SEARCH_PATH),
        cache_lookup: url("/cache"),
        cache_finalize: url(FINALIZE_PATH),
        agreement_api_params: Some("https://assist.example/api/articulation/Agreements?Key".to_string()),
        agreement_view_params: Some("https://assist.example/transfer/results?year".to_string()),
    }
}

/// Sending colleges with ids `1..=count`.
pub fn colleges(count: usize) -> Vec<Institution> {
    (1..=count)
        .map(|id| Institution::new(id.to_string(), format!("College {id}")))
        .collect()
}

pub fn runner(server: &MockServer, colleges: Vec<Institution>) -> SearchRunner {
    SearchRunner::new(
        http_client().clone(),
        &endpoints(server),
        colleges,
        SearchConfig::default(),
    )
    .expect("runner with full endpoints")
}

/// A record as the search service streams it: college marker, agreement
/// marker, then one course.
pub fn hit_record(college: &str, prefix: &str, number: &str, title: &str) -> Value {
    json!({
        "result": [
            { "ccName": college },
            { "agreementLink": format!("https://assist.example/{college}") },
            { "prefix": prefix, "number": number, "title": title }
        ]
    })
}

pub fn ndjson(records: &[Value]) -> String {
    let mut body = String::new();
    for record in records {
        body.push_str(&record.to_string());
        body.push('\n');
    }
    body
}

pub async fn mount_cache_status(server: &MockServer, status: u16, body: Option<Value>) {
    let mut response = ResponseTemplate::new(status);
    if let Some(body) = body {
        response = response.set_body_json(body);
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/cache/[^/]+$"))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_search_stream(server: &MockServer, body: String, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(body),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_finalize(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(FINALIZE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

/// Finalize runs detached from the search; poll until it shows up.
pub async fn wait_for_finalize(server: &MockServer) -> Vec<Request> {
    for _ in 0..100 {
        let requests = requests_to(server, FINALIZE_PATH).await;
        if !requests.is_empty() {
            return requests;
        }
        sleep(Duration::from_millis(20)).await;
    }
    Vec::new()
}

/// Drain every event, then wait for the search task.
pub async fn drain(mut handle: SearchHandle) -> (Vec<SearchEvent>, SearchOutcome) {
    let mut events = Vec::new();
    while let Some(event) = handle.events.recv().await {
        events.push(event);
    }
    (events, handle.join().await)
}
