//! Plan data model: chosen community-college courses and skipped FY courses.
//!
//! Pure domain types with no IO and no async.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::articulation::{ArticulationInfo, InstitutionInfo};
use crate::course::Course;
use crate::ids::CourseKey;

/// One FY requirement a plan course satisfies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticulationTarget {
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    pub fy_course: Course,
}

impl ArticulationTarget {
    #[must_use]
    pub fn new(info: &ArticulationInfo, fy_course: Course) -> Self {
        Self {
            major: info.major.clone(),
            major_id: info.major_id.clone(),
            term: info.term.clone(),
            fy_course,
        }
    }

    #[must_use]
    pub fn fy_key(&self) -> CourseKey {
        self.fy_course.key()
    }
}

/// A community-college course chosen for the plan.
///
/// `articulates_to` is a reverse index of every FY course this course helps
/// satisfy. Entries are unique per FY course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCourse {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub articulates_to: Vec<ArticulationTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccc_info: Option<InstitutionInfo>,
}

impl PlanCourse {
    #[must_use]
    pub fn new(course: Course, ccc_info: Option<InstitutionInfo>) -> Self {
        Self {
            course,
            articulates_to: Vec::new(),
            ccc_info,
        }
    }

    #[must_use]
    pub fn key(&self) -> CourseKey {
        self.course.key()
    }

    /// `true` if some entry already references this FY course.
    #[must_use]
    pub fn covers(&self, fy_key: &CourseKey) -> bool {
        self.articulates_to.iter().any(|t| &t.fy_key() == fy_key)
    }

    /// Append `target` unless an entry for the same FY course exists.
    ///
    /// Returns `true` when the entry was added.
    pub fn add_target(&mut self, target: ArticulationTarget) -> bool {
        if self.covers(&target.fy_key()) {
            return false;
        }
        self.articulates_to.push(target);
        true
    }

    /// Sorted set of FY courses this course satisfies.
    #[must_use]
    pub fn coverage(&self) -> BTreeSet<CourseKey> {
        self.articulates_to.iter().map(ArticulationTarget::fy_key).collect()
    }
}

/// FY courses the student chose not to search for.
///
/// Grows monotonically for the lifetime of a session; there is no removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exclusions {
    courses: BTreeMap<CourseKey, Course>,
}

impl Exclusions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the course was not already excluded.
    pub fn insert(&mut self, course: Course) -> bool {
        let key = course.key();
        if self.courses.contains_key(&key) {
            return false;
        }
        self.courses.insert(key, course);
        true
    }

    #[must_use]
    pub fn contains(&self, course: &Course) -> bool {
        self.courses.contains_key(&course.key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }
}

impl FromIterator<Course> for Exclusions {
    fn from_iter<T: IntoIterator<Item = Course>>(iter: T) -> Self {
        let mut exclusions = Self::new();
        for course in iter {
            exclusions.insert(course);
        }
        exclusions
    }
}
