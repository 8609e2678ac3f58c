//! Chunked search against a mock search service.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::{sleep, timeout};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cccb_assist::{ResultSource, SearchEvent, SearchOutcome, SearchReport, SearchRequest};
use cccb_types::SearchTarget;

use crate::common::{
    FINALIZE_PATH, SEARCH_PATH, colleges, drain, hit_record, mount_cache_status, mount_finalize, mount_search_stream,
    ndjson, requests_to, runner, wait_for_finalize,
};

fn request() -> SearchRequest {
    SearchRequest {
        target: SearchTarget::parse("123456_75", "79/cs", None).expect("valid target"),
        primary_ccc_id: "1".to_string(),
    }
}

fn completed(outcome: SearchOutcome) -> SearchReport {
    match outcome {
        SearchOutcome::Completed(report) => report,
        other => panic!("expected a completed search, got {other:?}"),
    }
}

#[tokio::test]
async fn live_search_chunks_every_college_and_finalizes() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 204, None).await;
    mount_finalize(&server).await;
    let body = ndjson(&[hit_record("Foothill College", "MATH", "1A", "Calculus")]);
    mount_search_stream(&server, body, 5).await;

    // 141 colleges, one of them the primary: 140 links.
    let handle = runner(&server, colleges(141)).spawn(request());
    let (events, outcome) = drain(handle).await;
    let report = completed(outcome);

    assert_eq!(report.source, ResultSource::Live);
    assert_eq!(report.chunks_total, 5);
    assert_eq!(report.chunks_completed, 5);
    assert_eq!(report.records.len(), 5);
    assert_eq!(report.progress, 116);
    assert!(report.is_complete());
    assert!(report.finalize_requested);
    assert_eq!(events.last(), Some(&SearchEvent::Progress { completed: 116, total: 116 }));

    let sizes: Vec<usize> = requests_to(&server, SEARCH_PATH)
        .await
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).expect("json chunk body");
            assert_eq!(body["courseId"], "123456");
            assert_eq!(body["year"], "75");
            body["links"].as_array().map_or(0, Vec::len)
        })
        .collect();
    assert_eq!(sizes, vec![29, 29, 29, 29, 24]);

    let finalize = wait_for_finalize(&server).await;
    assert_eq!(finalize.len(), 1);
    let body: Value = serde_json::from_slice(&finalize[0].body).expect("json finalize body");
    assert_eq!(body, json!({ "fullCourseId": "123456_75" }));
}

#[tokio::test]
async fn ready_cache_issues_no_chunk_requests() {
    let server = MockServer::start().await;
    mount_cache_status(
        &server,
        200,
        Some(json!([hit_record("Foothill College", "MATH", "1A", "Calculus")])),
    )
    .await;
    mount_search_stream(&server, String::new(), 0).await;
    mount_finalize(&server).await;

    let (events, outcome) = drain(runner(&server, colleges(141)).spawn(request())).await;
    let report = completed(outcome);

    assert_eq!(report.source, ResultSource::Cache);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.progress, 116);
    assert!(!report.finalize_requested);
    assert_eq!(events.first(), Some(&SearchEvent::CacheHit { records: 1 }));

    let lookups = requests_to(&server, "/cache/123456_75").await;
    assert_eq!(lookups.len(), 1);
    assert!(requests_to(&server, FINALIZE_PATH).await.is_empty());
}

#[tokio::test]
async fn in_progress_cache_searches_without_finalizing() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 206, None).await;
    mount_finalize(&server).await;
    let body = ndjson(&[hit_record("Foothill College", "MATH", "1A", "Calculus")]);
    mount_search_stream(&server, body, 1).await;

    let (_, outcome) = drain(runner(&server, colleges(10)).spawn(request())).await;
    let report = completed(outcome);

    assert_eq!(report.records.len(), 1);
    assert!(!report.finalize_requested);
    sleep(Duration::from_millis(50)).await;
    assert!(requests_to(&server, FINALIZE_PATH).await.is_empty());
}

#[tokio::test]
async fn malformed_and_empty_records_are_skipped() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 204, None).await;
    mount_finalize(&server).await;
    let mut body = String::from("this is not json\n\n{\"result\": []}\r\n");
    body.push_str(&ndjson(&[hit_record("Ohlone College", "CS", "102", "Data Structures")]));
    // Last record without a trailing newline.
    body.push_str(&hit_record("Mission College", "CIS", "22B", "Python").to_string());
    mount_search_stream(&server, body, 1).await;

    let (events, outcome) = drain(runner(&server, colleges(5)).spawn(request())).await;
    let report = completed(outcome);

    assert_eq!(report.records.len(), 2);
    let record_events = events.iter().filter(|e| matches!(e, SearchEvent::Record(_))).count();
    assert_eq!(record_events, 2);
}

#[tokio::test]
async fn failed_chunk_stops_the_queue() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 204, None).await;
    mount_finalize(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    // 60 links: three chunks queued, only the first is sent.
    let (_, outcome) = drain(runner(&server, colleges(61)).spawn(request())).await;
    let report = completed(outcome);

    assert_eq!(report.chunks_total, 3);
    assert_eq!(report.chunks_completed, 0);
    assert!(!report.is_complete());
    assert!(report.interrupted.as_deref().is_some_and(|r| r.contains("upstream down")));
    assert!(!report.finalize_requested);
    sleep(Duration::from_millis(50)).await;
    assert!(requests_to(&server, FINALIZE_PATH).await.is_empty());
}

#[tokio::test]
async fn failed_chunk_keeps_records_already_collected() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 204, None).await;
    mount_finalize(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ndjson(&[hit_record("Foothill College", "MATH", "1A", "Calculus")])),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    // 60 links: the first chunk streams a hit, the second fails, the third
    // is never sent.
    let (events, outcome) = drain(runner(&server, colleges(61)).spawn(request())).await;
    let report = completed(outcome);

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.chunks_completed, 1);
    assert!(report.interrupted.is_some());
    assert!(!report.finalize_requested);
    assert!(events.iter().any(|e| matches!(e, SearchEvent::Record(_))));
    sleep(Duration::from_millis(50)).await;
    assert!(requests_to(&server, FINALIZE_PATH).await.is_empty());
}

#[tokio::test]
async fn undrained_events_do_not_stall_the_search() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 204, None).await;
    mount_finalize(&server).await;
    let mut body = "{\"result\": []}\n".repeat(400);
    body.push_str(&ndjson(&[hit_record("Foothill College", "MATH", "1A", "Calculus")]));
    mount_search_stream(&server, body, 1).await;

    // The receiver stays alive and unread while the search runs.
    let handle = runner(&server, colleges(5)).spawn(request());
    let finalize = wait_for_finalize(&server).await;
    assert_eq!(finalize.len(), 1);

    let report = completed(handle.join().await);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.progress, 116);
}

#[tokio::test]
async fn abort_cancels_an_in_flight_chunk() {
    let server = MockServer::start().await;
    mount_cache_status(&server, 204, None).await;
    mount_finalize(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let mut handle = runner(&server, colleges(141)).spawn(request());
    // Wait until the first chunk is on the wire.
    while let Some(event) = handle.events.recv().await {
        if matches!(event, SearchEvent::ChunkStarted { .. }) {
            break;
        }
    }
    handle.abort();

    let outcome = timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("abort ends the search promptly");
    assert!(matches!(outcome, SearchOutcome::Cancelled));
    assert!(requests_to(&server, FINALIZE_PATH).await.is_empty());
}
