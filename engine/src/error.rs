use cccb_assist::AssistError;
use cccb_types::{CourseKey, IdParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no university and major selected")]
    NoSelections,

    /// Requirement and articulation fetches are all-or-nothing.
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: AssistError,
    },

    #[error(transparent)]
    Id(#[from] IdParseError),

    #[error("{0} has no articulation in the loaded agreements")]
    NoArticulation(CourseKey),

    #[error("{key} has no articulation option {index}")]
    NoSuchOption { key: CourseKey, index: usize },

    #[error("a search for {0} is already running")]
    SearchRunning(CourseKey),

    #[error("search for {0} has finished; reset it before searching again")]
    SearchNotIdle(CourseKey),
}
