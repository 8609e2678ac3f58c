//! Courses and course series as they appear in catalogs and agreements.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::CourseKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CourseKind {
    #[default]
    Course,
    Series,
}

impl CourseKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Course => "Course",
            Self::Series => "Series",
        }
    }
}

impl fmt::Display for CourseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CourseDataError {
    #[error("{0} record has no identifier")]
    MissingId(CourseKind),
    #[error("course group of type {0} requires an amount")]
    MissingAmount(&'static str),
    #[error("course group amount {0} is not a whole, non-negative number")]
    InvalidAmount(f64),
}

/// Lenient wire helpers: catalogs are inconsistent about quoting numbers.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Number(f64),
        Text(String),
    }

    pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
            Some(StringOrNumber::Number(n)) => Some(n),
            Some(StringOrNumber::Text(s)) => s.trim().parse::<f64>().ok(),
            None => None,
        })
    }

    pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
            Some(StringOrNumber::Number(n)) if n.fract() == 0.0 && n >= 0.0 => {
                Some(format!("{}", n as u64))
            }
            Some(StringOrNumber::Number(n)) => Some(n.to_string()),
            Some(StringOrNumber::Text(s)) if s.trim().is_empty() => None,
            Some(StringOrNumber::Text(s)) => Some(s),
            None => None,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCourse {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub(crate) kind: Option<CourseKind>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) course_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) course_prefix: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) course_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) course_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) series_title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) credits: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) note: Option<String>,
}

/// A course or course series.
///
/// Invariant: a course carries a `courseId` and a series carries a
/// `seriesId` (enforced via `#[serde(try_from)]`). When `type` is absent the
/// kind is inferred from whichever id is present, course first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCourse", into = "RawCourse")]
pub struct Course {
    kind: CourseKind,
    id: String,
    prefix: Option<String>,
    number: Option<String>,
    title: Option<String>,
    credits: Option<f64>,
    note: Option<String>,
}

impl TryFrom<RawCourse> for Course {
    type Error = CourseDataError;

    fn try_from(raw: RawCourse) -> Result<Self, Self::Error> {
        let kind = match raw.kind {
            Some(kind) => kind,
            None if raw.course_id.is_some() => CourseKind::Course,
            None if raw.series_id.is_some() => CourseKind::Series,
            None => CourseKind::Course,
        };
        let (id, title) = match kind {
            CourseKind::Course => (raw.course_id, raw.course_title.or(raw.series_title)),
            CourseKind::Series => (raw.series_id, raw.series_title.or(raw.course_title)),
        };
        let id = id.ok_or(CourseDataError::MissingId(kind))?;

        Ok(Self {
            kind,
            id,
            prefix: raw.course_prefix,
            number: raw.course_number,
            title,
            credits: raw.credits,
            note: raw.note,
        })
    }
}

impl From<Course> for RawCourse {
    fn from(course: Course) -> Self {
        let mut raw = RawCourse {
            kind: Some(course.kind),
            course_prefix: course.prefix,
            course_number: course.number,
            credits: course.credits,
            note: course.note,
            ..RawCourse::default()
        };
        match course.kind {
            CourseKind::Course => {
                raw.course_id = Some(course.id);
                raw.course_title = course.title;
            }
            CourseKind::Series => {
                raw.series_id = Some(course.id);
                raw.series_title = course.title;
            }
        }
        raw
    }
}

impl Course {
    #[must_use]
    pub fn new(kind: CourseKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            prefix: None,
            number: None,
            title: None,
            credits: None,
            note: None,
        }
    }

    /// Single course with the usual catalog attributes.
    #[must_use]
    pub fn course(
        id: impl Into<String>,
        prefix: impl Into<String>,
        number: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self::new(CourseKind::Course, id)
            .with_prefix(prefix)
            .with_number(number)
            .with_title(title)
    }

    #[must_use]
    pub fn series(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(CourseKind::Series, id).with_title(title)
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_credits(mut self, credits: f64) -> Self {
        self.credits = Some(credits);
        self
    }

    pub(crate) fn from_raw_parts(raw: RawCourse) -> Result<Self, CourseDataError> {
        Self::try_from(raw)
    }

    #[must_use]
    pub fn key(&self) -> CourseKey {
        match self.kind {
            CourseKind::Course => CourseKey::course(&self.id),
            CourseKind::Series => CourseKey::series(&self.id),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CourseKind {
        self.kind
    }

    #[must_use]
    pub const fn is_series(&self) -> bool {
        matches!(self.kind, CourseKind::Series)
    }

    /// The id exactly as received, year suffix included.
    #[must_use]
    pub fn raw_id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[must_use]
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub const fn credits(&self) -> Option<f64> {
        self.credits
    }

    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Display label, `"MATH 1A - Calculus"` for courses, the title for series.
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_series() {
            return self.title.clone().unwrap_or_else(|| self.id.clone());
        }
        let code = [self.prefix.as_deref(), self.number.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        match (code.is_empty(), self.title.as_deref()) {
            (false, Some(title)) => format!("{code} - {title}"),
            (false, None) => code,
            (true, Some(title)) => title.to_string(),
            (true, None) => self.id.clone(),
        }
    }
}
