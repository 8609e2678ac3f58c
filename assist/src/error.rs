use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Config(#[from] cccb_config::ConfigError),

    #[error("invalid {name} endpoint {value:?}: {source}")]
    InvalidEndpoint {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },

    #[error("{name} endpoint {value:?} cannot take path segments")]
    NotABase { name: &'static str, value: String },

    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("search stream line exceeded {0} bytes")]
    LineTooLong(usize),

    #[error("search task failed: {0}")]
    Task(String),
}
