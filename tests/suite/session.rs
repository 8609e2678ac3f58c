//! Sessions backed by mock catalog, agreement and search services.

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cccb_assist::{HttpDataSource, http_client};
use cccb_config::{Institution, InstitutionDirectory};
use cccb_engine::{Adoption, SearchPhase, Selection, Session, SessionError};
use cccb_types::{Course, CourseKey, FoundCourse, PlanCourse};

use crate::common::{colleges, endpoints, hit_record, mount_cache_status, mount_search_stream, ndjson, runner};

fn agreement(ccc_id: &str, articulated: Value) -> Value {
    json!({
        "cccInfo": { "id": ccc_id, "name": format!("College {ccc_id}") },
        "universityInfo": { "id": "79", "name": "UC Berkeley" },
        "articulationInfo": { "major": "Computer Science", "majorId": "cs" },
        "articulatedCourses": articulated
    })
}

async fn mount_datasets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/requirements/79/cs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "requiredCourses": [{
                    "type": "AllCourses",
                    "courses": [
                        { "courseId": "61A_75", "coursePrefix": "COMPSCI", "courseNumber": "61A", "courseTitle": "SICP" },
                        { "courseId": "123456_75", "coursePrefix": "COMPSCI", "courseNumber": "70", "courseTitle": "Discrete Math" }
                    ]
                }]
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/articulations"))
        .and(body_json(json!([{ "cccId": "113", "fyId": "79", "yr": "75", "majorId": "cs" }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([agreement(
            "113",
            json!([{
                "articulationType": "Course",
                "courseId": "61A",
                "coursePrefix": "COMPSCI",
                "courseNumber": "61A",
                "courseTitle": "SICP",
                "articulationOptions": [[
                    { "courseId": "900", "coursePrefix": "CIS", "courseNumber": "22A", "courseTitle": "Python" }
                ]]
            }])
        )])))
        .expect(1)
        .mount(server)
        .await;
}

fn fy_70() -> Course {
    Course::course("123456_75", "COMPSCI", "70", "Discrete Math")
}

#[tokio::test]
async fn open_builds_plan_from_services() {
    let server = MockServer::start().await;
    mount_datasets(&server).await;
    let source = HttpDataSource::new(http_client().clone(), &endpoints(&server)).expect("data source");

    let session = Session::open(&source, "113", "75", &[Selection::new("79", "cs")])
        .await
        .expect("session opens");

    let plan: Vec<CourseKey> = session.plan().iter().map(PlanCourse::key).collect();
    assert_eq!(plan, vec![CourseKey::course("900")]);
    assert!(session.plan()[0].covers(&CourseKey::course("61A_75")));
    assert!(!session.is_complete());

    let unresolved = session.unresolved_courses();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].1.key(), CourseKey::course("123456"));
}

#[tokio::test]
async fn open_fails_without_partial_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/requirements/79/cs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/articulations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let source = HttpDataSource::new(http_client().clone(), &endpoints(&server)).expect("data source");

    let err = Session::open(&source, "113", "75", &[Selection::new("79", "cs")])
        .await
        .expect_err("articulation failure is fatal");
    assert!(matches!(err, SessionError::Fetch { what: "articulations", .. }));
}

#[tokio::test]
async fn search_hit_links_through_equivalence() {
    let server = MockServer::start().await;
    mount_datasets(&server).await;
    mount_cache_status(&server, 204, None).await;
    let body = ndjson(&[hit_record("Foothill College", "MATH", "22", "Discrete Mathematics")]);
    mount_search_stream(&server, body, 1).await;
    Mock::given(method("POST"))
        .and(path("/equivalence"))
        .and(body_json(json!([{ "cccId": "51", "fyId": "79", "yr": "75", "majorId": "cs" }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([agreement(
            "201",
            json!([{
                "articulationType": "Course",
                "courseId": "123456",
                "coursePrefix": "COMPSCI",
                "courseNumber": "70",
                "courseTitle": "Discrete Math",
                "articulationOptions": [[
                    { "courseId": "555", "coursePrefix": "MATH", "courseNumber": "022", "courseTitle": "Discrete Mathematics" }
                ]]
            }])
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpDataSource::new(http_client().clone(), &endpoints(&server)).expect("data source");
    let mut session = Session::open(&source, "113", "75", &[Selection::new("79", "cs")])
        .await
        .expect("session opens");
    let inputs = session.requirements()[0].inputs.clone();

    let runner = runner(&server, colleges(20));
    let mut handle = session.start_search(&runner, &fy_70(), &inputs).expect("search starts");
    assert_eq!(session.searches().phase(&fy_70().key()), SearchPhase::Searching);
    assert!(matches!(
        session.start_search(&runner, &fy_70(), &inputs),
        Err(SessionError::SearchRunning(_))
    ));

    while handle.events.recv().await.is_some() {}
    let outcome = handle.join().await;
    assert_eq!(session.finish_search(&fy_70(), &outcome), SearchPhase::Found);

    let hits = session.search_hits(&fy_70()).expect("hits recorded").to_vec();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].college_name.as_deref(), Some("Foothill College"));
    assert_eq!(
        hits[0].options,
        vec![vec![FoundCourse::new("MATH", "22", "Discrete Mathematics")]]
    );

    let colleges = InstitutionDirectory::new(vec![
        Institution::new("113", "De Anza College"),
        Institution::new("51", "Foothill College"),
    ]);
    let adoption = session
        .link_search_hit(&source, &colleges, &fy_70(), &hits[0], &hits[0].options[0])
        .await;
    assert_eq!(adoption, Adoption::Linked { added: 1 });
    assert!(session.is_complete());
    assert!(session.unresolved_courses().is_empty());

    assert!(session.reset_search(&fy_70()));
    assert_eq!(session.searches().phase(&fy_70().key()), SearchPhase::Idle);
}

#[tokio::test]
async fn cancelled_search_returns_to_idle() {
    let server = MockServer::start().await;
    mount_datasets(&server).await;
    mount_cache_status(&server, 204, None).await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let source = HttpDataSource::new(http_client().clone(), &endpoints(&server)).expect("data source");
    let mut session = Session::open(&source, "113", "75", &[Selection::new("79", "cs")])
        .await
        .expect("session opens");
    let inputs = session.requirements()[0].inputs.clone();

    let handle = session
        .start_search(&runner(&server, colleges(20)), &fy_70(), &inputs)
        .expect("search starts");
    assert!(session.cancel_search(&fy_70()));

    let outcome = handle.join().await;
    assert_eq!(session.finish_search(&fy_70(), &outcome), SearchPhase::Idle);
}
