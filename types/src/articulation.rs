//! Articulation agreements between a community college and a university.

use serde::{Deserialize, Serialize};

use crate::course::{Course, CourseDataError, CourseKind, RawCourse, lenient};
use crate::ids::CourseKey;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticulationInfo {
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_id: Option<String>,
}

/// One combination of community-college courses that fully satisfies a
/// single FY course.
pub type ArticulationOption = Vec<Course>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticulation {
    #[serde(default)]
    articulation_type: CourseKind,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    course_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    course_prefix: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    course_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    course_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    series_title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    credits: Option<f64>,
    #[serde(default)]
    articulation_options: Vec<ArticulationOption>,
}

/// An FY course or series and the option-sets that satisfy it.
///
/// Invariant: the FY side carries the id matching its `articulationType`
/// (enforced via `#[serde(try_from)]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArticulation", into = "RawArticulation")]
pub struct Articulation {
    fy_course: Course,
    options: Vec<ArticulationOption>,
}

impl TryFrom<RawArticulation> for Articulation {
    type Error = CourseDataError;

    fn try_from(raw: RawArticulation) -> Result<Self, Self::Error> {
        let fy_course = Course::from_raw_parts(RawCourse {
            kind: Some(raw.articulation_type),
            course_id: raw.course_id,
            series_id: raw.series_id,
            course_prefix: raw.course_prefix,
            course_number: raw.course_number,
            course_title: raw.course_title,
            series_title: raw.series_title,
            credits: raw.credits,
            note: None,
        })?;
        Ok(Self {
            fy_course,
            options: raw.articulation_options,
        })
    }
}

impl From<Articulation> for RawArticulation {
    fn from(articulation: Articulation) -> Self {
        let raw = RawCourse::from(articulation.fy_course);
        Self {
            articulation_type: raw.kind.unwrap_or_default(),
            course_id: raw.course_id,
            series_id: raw.series_id,
            course_prefix: raw.course_prefix,
            course_number: raw.course_number,
            course_title: raw.course_title,
            series_title: raw.series_title,
            credits: raw.credits,
            articulation_options: articulation.options,
        }
    }
}

impl Articulation {
    #[must_use]
    pub fn new(fy_course: Course, options: Vec<ArticulationOption>) -> Self {
        Self { fy_course, options }
    }

    /// The FY course or series this articulation satisfies.
    #[must_use]
    pub fn fy_course(&self) -> &Course {
        &self.fy_course
    }

    #[must_use]
    pub fn options(&self) -> &[ArticulationOption] {
        &self.options
    }

    #[must_use]
    pub fn key(&self) -> CourseKey {
        self.fy_course.key()
    }
}

/// Articulation agreement for one (college, university, major, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticulationObj {
    pub ccc_info: InstitutionInfo,
    pub university_info: InstitutionInfo,
    pub articulation_info: ArticulationInfo,
    #[serde(default)]
    pub articulated_courses: Vec<Articulation>,
    #[serde(default)]
    pub non_articulated_courses: Vec<Course>,
}

impl ArticulationObj {
    /// `true` when this agreement belongs to the given university and major.
    #[must_use]
    pub fn is_for(&self, fy_id: &str, major_id: &str) -> bool {
        let same_university = self
            .university_info
            .id
            .as_deref()
            .is_some_and(|id| id.trim() == fy_id.trim());
        let same_major = self
            .articulation_info
            .major_id
            .as_deref()
            .is_some_and(|id| id.trim() == major_id.trim());
        same_university && same_major
    }
}
