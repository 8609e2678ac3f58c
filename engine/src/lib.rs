//! Session orchestration for CCCBuilder.
//!
//! A [`Session`] ties the synchronous plan engine in `cccb-core` to the
//! HTTP side in `cccb-assist`: it loads the datasets for the selected
//! universities and majors, keeps the plan built to quiescence after every
//! change, and tracks one search per FY course.

mod error;
mod session;
mod source;
mod tracker;

pub use error::SessionError;
pub use session::{Adoption, RequirementStatus, Selection, Session};
pub use source::DataSource;
pub use tracker::{SearchPhase, SearchState, SearchTracker};
