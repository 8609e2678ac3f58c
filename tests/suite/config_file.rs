//! Configuration files feeding the HTTP layer.

use std::io::Write;

use cccb_assist::{AssistError, Endpoints, build_links};
use cccb_config::{CccbConfig, ConfigError, DEFAULT_CHUNK_SIZE};
use cccb_types::SearchTarget;

const CONFIG: &str = r#"
[endpoints]
requirements = "http://localhost:9000/requirements"
articulations = "http://localhost:9000/articulations"
search = "http://localhost:9000/search"
agreement_api_params = "https://assist.example/api/Agreements?Key"
agreement_view_params = "https://assist.example/results?year"

[[institutions]]
id = "113"
name = "De Anza College"
code = "DAC"

[[institutions]]
id = "51"
name = "Foothill College"

[[universities]]
id = "79"
name = "University of California, Berkeley"
code = "UCB"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn loaded_config_drives_link_building() {
    let file = write_config(CONFIG);
    let config = CccbConfig::load_from(file.path()).expect("valid config");
    assert_eq!(config.search.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(
        config.university_name("79").as_deref(),
        Some("University of California, Berkeley")
    );

    let endpoints = Endpoints::from_config(&config.endpoints).expect("endpoints parse");
    let templates = endpoints.link_templates().expect("templates configured");
    let target = SearchTarget::parse("123456_75", "cs", Some("79")).expect("target");

    let links = build_links(&templates, &config.institutions, "113", &target);
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].link,
        "https://assist.example/api/Agreements?Key=75/51/to/79/Major/cs"
    );
    assert!(links[0].agreement_link.contains("institution=51"));
}

#[test]
fn missing_endpoint_is_reported_by_name() {
    let file = write_config("[endpoints]\nrequirements = \"http://localhost:9000/requirements\"\n");
    let config = CccbConfig::load_from(file.path()).expect("valid config");
    let endpoints = Endpoints::from_config(&config.endpoints).expect("endpoints parse");

    let err = endpoints.search().expect_err("search endpoint missing");
    assert!(matches!(err, AssistError::Config(ConfigError::MissingEndpoint("search"))));
}

#[test]
fn invalid_url_is_rejected() {
    let file = write_config("[endpoints]\nsearch = \"not a url\"\n");
    let config = CccbConfig::load_from(file.path()).expect("valid toml");
    let err = Endpoints::from_config(&config.endpoints).expect_err("bad url");
    assert!(matches!(err, AssistError::InvalidEndpoint { name: "search", .. }));
}
