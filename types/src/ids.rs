//! Course identity and composite identifiers.
//!
//! Every identifier crossing the wire is a string. Requirement catalogs tag
//! course ids with the catalog year (`"123456_75"`) while articulation
//! datasets store the plain id (`"123456"`); [`CourseKey`] is the one place
//! where the two are reconciled.

use std::fmt;

use thiserror::Error;

/// Strip a trailing `_<digits>` catalog-year suffix from an identifier.
///
/// Identifiers without a purely numeric suffix are returned unchanged.
#[must_use]
pub fn strip_year_suffix(id: &str) -> &str {
    match id.trim().rsplit_once('_') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => id.trim(),
    }
}

/// Numeric-when-possible identifier value.
///
/// `"0042"` and `"42"` are the same course; an id that is not an integer
/// falls back to exact string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdValue {
    Numeric(u64),
    Text(String),
}

impl IdValue {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<u64>()
            .map_or_else(|_| Self::Text(trimmed.to_string()), Self::Numeric)
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Identity of a course or series with a single equality relation.
///
/// Course ids compare numerically after the year suffix is stripped; series
/// ids compare as strings after the same stripping. A course and a series
/// never compare equal, even with identical raw ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CourseKey {
    Course(IdValue),
    Series(String),
}

impl CourseKey {
    #[must_use]
    pub fn course(raw: &str) -> Self {
        Self::Course(IdValue::parse(strip_year_suffix(raw)))
    }

    #[must_use]
    pub fn series(raw: &str) -> Self {
        Self::Series(strip_year_suffix(raw).to_string())
    }

    #[must_use]
    pub const fn is_series(&self) -> bool {
        matches!(self, Self::Series(_))
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Course(id) => write!(f, "course:{id}"),
            Self::Series(id) => write!(f, "series:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("course id {0:?} is not of the form <baseId>_<year>")]
    NotComposite(String),
    #[error("major id {0:?} does not name a major key")]
    MissingMajorKey(String),
    #[error("major id {0:?} does not name a receiving institution")]
    MissingReceivingInstitution(String),
}

/// A `"<baseId>_<year>"` identifier, used as the search cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeCourseId {
    base: String,
    year: String,
}

impl CompositeCourseId {
    pub fn parse(raw: &str) -> Result<Self, IdParseError> {
        let trimmed = raw.trim();
        let base = strip_year_suffix(trimmed);
        if base.len() == trimmed.len() {
            return Err(IdParseError::NotComposite(raw.to_string()));
        }
        let year = &trimmed[base.len() + 1..];
        Ok(Self {
            base: base.to_string(),
            year: year.to_string(),
        })
    }

    #[must_use]
    pub fn new(base: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            year: year.into(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn year(&self) -> &str {
        &self.year
    }
}

impl fmt::Display for CompositeCourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.year)
    }
}

/// Receiving institution and major key extracted from a `majorId`.
///
/// Accepted shapes:
/// - agreement key: `"<year>/<sending>/to/<receiving>/Major/<majorKey>"`
/// - short form: `"<receiving>/<majorKey>"`
/// - bare key: `"<majorKey>"`, receiving institution taken from `fyId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorRef {
    pub receiving_id: String,
    pub major_key: String,
}

impl MajorRef {
    pub fn parse(major_id: &str, fy_id: Option<&str>) -> Result<Self, IdParseError> {
        let trimmed = major_id.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(IdParseError::MissingMajorKey(major_id.to_string()));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();

        if let Some(major_pos) = segments.iter().position(|s| *s == "Major") {
            let major_key = segments[major_pos + 1..].join("/");
            if major_key.is_empty() {
                return Err(IdParseError::MissingMajorKey(major_id.to_string()));
            }
            let receiving = segments
                .iter()
                .position(|s| *s == "to")
                .and_then(|to_pos| segments.get(to_pos + 1))
                .copied()
                .filter(|s| *s != "Major")
                .or(fy_id)
                .ok_or_else(|| IdParseError::MissingReceivingInstitution(major_id.to_string()))?;
            return Ok(Self {
                receiving_id: receiving.to_string(),
                major_key,
            });
        }

        match segments.as_slice() {
            [key] => {
                let receiving = fy_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| IdParseError::MissingReceivingInstitution(major_id.to_string()))?;
                Ok(Self {
                    receiving_id: receiving.trim().to_string(),
                    major_key: (*key).to_string(),
                })
            }
            [receiving, rest @ ..] => Ok(Self {
                receiving_id: (*receiving).to_string(),
                major_key: rest.join("/"),
            }),
            [] => Err(IdParseError::MissingMajorKey(major_id.to_string())),
        }
    }
}

/// Everything the search subsystem needs to address one FY course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub receiving_id: String,
    pub major_key: String,
    pub course: CompositeCourseId,
}

impl SearchTarget {
    pub fn parse(course_id: &str, major_id: &str, fy_id: Option<&str>) -> Result<Self, IdParseError> {
        let course = CompositeCourseId::parse(course_id)?;
        let major = MajorRef::parse(major_id, fy_id)?;
        Ok(Self {
            receiving_id: major.receiving_id,
            major_key: major.major_key,
            course,
        })
    }

    #[must_use]
    pub fn year(&self) -> &str {
        self.course.year()
    }

    #[must_use]
    pub fn base_course_id(&self) -> &str {
        self.course.base()
    }
}
