//! Destination degree requirements.

use serde::{Deserialize, Serialize};

use crate::course::{Course, CourseDataError, lenient};

/// How many of a group's courses must be completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupRule {
    /// Every listed course.
    AllCourses,
    /// At least this many courses.
    NCourses(u32),
    /// At least this many credits.
    NCredits(f64),
}

impl GroupRule {
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::AllCourses => "AllCourses",
            Self::NCourses(_) => "NCourses",
            Self::NCredits(_) => "NCredits",
        }
    }

    /// `true` when the group has no `amount`, i.e. every course is mandatory.
    #[must_use]
    pub const fn is_unconstrained(self) -> bool {
        matches!(self, Self::AllCourses)
    }

    /// Measure the group must reach, given how many courses it lists.
    #[must_use]
    pub fn target(self, course_count: usize) -> f64 {
        match self {
            Self::AllCourses => course_count as f64,
            Self::NCourses(n) => f64::from(n),
            Self::NCredits(credits) => credits,
        }
    }

    /// How much one satisfied course adds to the group's measure.
    #[must_use]
    pub fn contribution(self, course: &Course) -> f64 {
        match self {
            Self::AllCourses | Self::NCourses(_) => 1.0,
            Self::NCredits(_) => course.credits().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum RawGroupType {
    AllCourses,
    NCourses,
    NCredits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCourseGroup {
    #[serde(rename = "type")]
    kind: RawGroupType,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    amount: Option<f64>,
    #[serde(default)]
    courses: Vec<Course>,
}

/// One group of interchangeable requirement courses.
///
/// Invariant: `amount` is present unless the type is `AllCourses`
/// (enforced via `#[serde(try_from)]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCourseGroup", into = "RawCourseGroup")]
pub struct CourseGroup {
    pub rule: GroupRule,
    pub courses: Vec<Course>,
}

impl TryFrom<RawCourseGroup> for CourseGroup {
    type Error = CourseDataError;

    fn try_from(raw: RawCourseGroup) -> Result<Self, Self::Error> {
        let rule = match (raw.kind, raw.amount) {
            (RawGroupType::AllCourses, _) => GroupRule::AllCourses,
            (RawGroupType::NCourses, Some(n)) => {
                if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
                    return Err(CourseDataError::InvalidAmount(n));
                }
                GroupRule::NCourses(n as u32)
            }
            (RawGroupType::NCredits, Some(n)) => {
                if n < 0.0 || !n.is_finite() {
                    return Err(CourseDataError::InvalidAmount(n));
                }
                GroupRule::NCredits(n)
            }
            (RawGroupType::NCourses, None) => {
                return Err(CourseDataError::MissingAmount("NCourses"));
            }
            (RawGroupType::NCredits, None) => {
                return Err(CourseDataError::MissingAmount("NCredits"));
            }
        };
        Ok(Self {
            rule,
            courses: raw.courses,
        })
    }
}

impl From<CourseGroup> for RawCourseGroup {
    fn from(group: CourseGroup) -> Self {
        let (kind, amount) = match group.rule {
            GroupRule::AllCourses => (RawGroupType::AllCourses, None),
            GroupRule::NCourses(n) => (RawGroupType::NCourses, Some(f64::from(n))),
            GroupRule::NCredits(c) => (RawGroupType::NCredits, Some(c)),
        };
        Self {
            kind,
            amount,
            courses: group.courses,
        }
    }
}

impl CourseGroup {
    #[must_use]
    pub fn new(rule: GroupRule, courses: Vec<Course>) -> Self {
        Self { rule, courses }
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.rule.target(self.courses.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub required_courses: Vec<CourseGroup>,
    #[serde(default)]
    pub conjunction: Conjunction,
}

impl Requirement {
    #[must_use]
    pub fn and(groups: Vec<CourseGroup>) -> Self {
        Self {
            required_courses: groups,
            conjunction: Conjunction::And,
        }
    }

    #[must_use]
    pub fn or(groups: Vec<CourseGroup>) -> Self {
        Self {
            required_courses: groups,
            conjunction: Conjunction::Or,
        }
    }
}

/// The selection a requirement tree was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementInputs {
    pub ccc_id: String,
    pub fy_id: String,
    pub yr: String,
    pub major_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementGroup {
    pub inputs: RequirementInputs,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}
