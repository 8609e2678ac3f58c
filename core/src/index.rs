//! Lookup of FY courses in an articulation dataset.

use std::collections::HashMap;

use cccb_types::{Articulation, ArticulationObj, ArticulationOption, Course, CourseKey, PlanCourse, RequirementInputs};

/// An articulation together with the agreement it was found in.
#[derive(Debug, Clone, Copy)]
pub struct ArticulationMatch<'a> {
    pub articulation: &'a Articulation,
    pub agreement: &'a ArticulationObj,
}

impl<'a> ArticulationMatch<'a> {
    #[must_use]
    pub fn options(&self) -> &'a [ArticulationOption] {
        self.articulation.options()
    }

    #[must_use]
    pub fn fy_course(&self) -> &'a Course {
        self.articulation.fy_course()
    }
}

/// Articulations keyed by FY course, in dataset order.
///
/// A course can be articulated by several agreements (one per university and
/// major). Lookups with a scope prefer the agreement that belongs to the
/// requirement tree being evaluated and fall back to the first match.
#[derive(Debug, Clone)]
pub struct ArticulationIndex<'a> {
    agreements: &'a [ArticulationObj],
    by_key: HashMap<CourseKey, Vec<(usize, usize)>>,
}

impl<'a> ArticulationIndex<'a> {
    #[must_use]
    pub fn new(agreements: &'a [ArticulationObj]) -> Self {
        let mut by_key: HashMap<CourseKey, Vec<(usize, usize)>> = HashMap::new();
        for (a, agreement) in agreements.iter().enumerate() {
            for (i, articulation) in agreement.articulated_courses.iter().enumerate() {
                by_key.entry(articulation.key()).or_default().push((a, i));
            }
        }
        Self { agreements, by_key }
    }

    #[must_use]
    pub fn agreements(&self) -> &'a [ArticulationObj] {
        self.agreements
    }

    fn resolve(&self, (a, i): (usize, usize)) -> ArticulationMatch<'a> {
        let agreement = &self.agreements[a];
        ArticulationMatch {
            articulation: &agreement.articulated_courses[i],
            agreement,
        }
    }

    /// First articulation for `course` across the whole dataset.
    #[must_use]
    pub fn find(&self, course: &Course) -> Option<ArticulationMatch<'a>> {
        self.find_scoped(course, None)
    }

    #[must_use]
    pub fn find_scoped(
        &self,
        course: &Course,
        scope: Option<&RequirementInputs>,
    ) -> Option<ArticulationMatch<'a>> {
        let hits = self.by_key.get(&course.key())?;
        let scoped = scope.and_then(|inputs| {
            hits.iter()
                .copied()
                .find(|&(a, _)| self.agreements[a].is_for(&inputs.fy_id, &inputs.major_id))
        });
        scoped.or_else(|| hits.first().copied()).map(|hit| self.resolve(hit))
    }
}

/// Linear scan for the first articulation of `course`.
///
/// Use [`ArticulationIndex`] when looking up more than a handful of courses.
#[must_use]
pub fn find_articulation<'a>(
    course: &Course,
    agreements: &'a [ArticulationObj],
) -> Option<ArticulationMatch<'a>> {
    let key = course.key();
    agreements.iter().find_map(|agreement| {
        agreement
            .articulated_courses
            .iter()
            .find(|a| a.key() == key)
            .map(|articulation| ArticulationMatch {
                articulation,
                agreement,
            })
    })
}

/// `true` when every course of a non-empty option is already in the plan.
#[must_use]
pub fn option_in_plan(option: &[Course], plan: &[PlanCourse]) -> bool {
    !option.is_empty()
        && option
            .iter()
            .all(|course| plan.iter().any(|pc| pc.key() == course.key()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use cccb_types::{ArticulationInfo, InstitutionInfo};

    use super::*;

    pub fn cc(id: &str, number: &str) -> Course {
        Course::course(id, "CC", number, format!("CC {number}"))
    }

    pub fn fy(id: &str, number: &str) -> Course {
        Course::course(id, "FY", number, format!("FY {number}"))
    }

    pub fn agreement(fy_id: &str, major_id: &str, articulations: Vec<Articulation>) -> ArticulationObj {
        ArticulationObj {
            ccc_info: InstitutionInfo {
                code: None,
                id: Some("113".to_string()),
                name: "De Anza College".to_string(),
            },
            university_info: InstitutionInfo {
                code: None,
                id: Some(fy_id.to_string()),
                name: format!("University {fy_id}"),
            },
            articulation_info: ArticulationInfo {
                major: format!("Major {major_id}"),
                major_id: Some(major_id.to_string()),
                term: None,
                term_id: None,
            },
            articulated_courses: articulations,
            non_articulated_courses: Vec::new(),
        }
    }

    pub fn inputs(fy_id: &str, major_id: &str) -> RequirementInputs {
        RequirementInputs {
            ccc_id: "113".to_string(),
            fy_id: fy_id.to_string(),
            yr: "75".to_string(),
            major_id: major_id.to_string(),
        }
    }
}
