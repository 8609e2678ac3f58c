//! Core domain types for CCCBuilder.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! Wire shapes follow the catalog and agreement JSON (camelCase keys, string
//! identifiers). Invariants are enforced at the deserialization boundary with
//! `#[serde(try_from)]`, so a value of these types is always well-formed.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod articulation;
mod course;
mod ids;
mod plan;
mod requirement;
mod search;

pub use articulation::{Articulation, ArticulationInfo, ArticulationObj, ArticulationOption, InstitutionInfo};
pub use course::{Course, CourseDataError, CourseKind};
pub use ids::{
    CompositeCourseId, CourseKey, IdParseError, IdValue, MajorRef, SearchTarget, strip_year_suffix,
};
pub use plan::{ArticulationTarget, Exclusions, PlanCourse};
pub use requirement::{
    Conjunction, CourseGroup, GroupRule, Requirement, RequirementGroup, RequirementInputs,
};
pub use search::{CourseDescription, FoundCourse, SearchEntry, SearchRecord};
