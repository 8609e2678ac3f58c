//! Records produced by the cross-institution articulation search.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One decoded line of the search stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(default)]
    pub result: Vec<SearchEntry>,
}

impl SearchRecord {
    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.result.is_empty()
    }
}

/// A single entry of a search record's `result` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchEntry {
    /// Marks which sending college the following entries belong to.
    College {
        #[serde(rename = "ccName")]
        cc_name: String,
    },
    /// Human-facing agreement page for the current college.
    AgreementLink {
        #[serde(rename = "agreementLink")]
        agreement_link: String,
    },
    /// An ordered course series.
    Series(Vec<CourseDescription>),
    Course(#[serde(deserialize_with = "course_object")] FoundCourse),
    /// A `"PREFIX NUMBER - Title"` label.
    Label(String),
    Other(Value),
}

impl SearchEntry {
    /// Courses described by this entry, in order, if it describes any.
    /// A series with any unreadable member describes nothing.
    #[must_use]
    pub fn courses(&self) -> Option<Vec<FoundCourse>> {
        match self {
            Self::Series(series) if !series.is_empty() => series.iter().map(CourseDescription::course).collect(),
            Self::Course(course) => Some(vec![course.clone()]),
            Self::Label(label) => FoundCourse::parse_label(label).map(|c| vec![c]),
            _ => None,
        }
    }
}

/// One member of a course series: a course object or a label string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CourseDescription {
    Object(#[serde(deserialize_with = "course_object")] FoundCourse),
    Label(String),
}

impl CourseDescription {
    #[must_use]
    pub fn course(&self) -> Option<FoundCourse> {
        match self {
            Self::Object(course) => Some(course.clone()),
            Self::Label(label) => FoundCourse::parse_label(label),
        }
    }
}

/// Derived struct deserialization also accepts sequences; a course
/// entry must be a JSON object.
fn course_object<'de, D>(deserializer: D) -> Result<FoundCourse, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Err(D::Error::custom("course entry must be an object"));
    }
    FoundCourse::deserialize(value).map_err(D::Error::custom)
}

/// A community-college course as reported by the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundCourse {
    #[serde(alias = "coursePrefix")]
    pub prefix: String,
    #[serde(alias = "courseNumber")]
    pub number: String,
    #[serde(alias = "courseTitle", default)]
    pub title: String,
}

impl FoundCourse {
    #[must_use]
    pub fn new(prefix: impl Into<String>, number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            number: number.into(),
            title: title.into(),
        }
    }

    /// Parse `"MATH 1A - Calculus I"`; the prefix may itself contain spaces
    /// (`"C S 61A - ..."`), the number is the last word before the dash.
    #[must_use]
    pub fn parse_label(label: &str) -> Option<Self> {
        let (code, title) = label.split_once(" - ")?;
        let (prefix, number) = code.trim().rsplit_once(char::is_whitespace)?;
        let prefix = prefix.trim();
        if prefix.is_empty() || number.is_empty() {
            return None;
        }
        Some(Self::new(prefix, number, title.trim()))
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {} - {}", self.prefix, self.number, self.title)
    }
}
