//! Completion checks for requirements against the current plan.

use cccb_types::{
    ArticulationObj, Conjunction, Course, CourseGroup, Exclusions, PlanCourse, Requirement,
    RequirementInputs,
};

use crate::builder::contribution;
use crate::index::{ArticulationIndex, option_in_plan};

/// Progress of one course group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStatus {
    pub fulfilled: f64,
    pub needed: f64,
    /// Either `fulfilled >= needed`, or every course in the group is excluded.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    index: ArticulationIndex<'a>,
    plan: &'a [PlanCourse],
    exclusions: &'a Exclusions,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(agreements: &'a [ArticulationObj], plan: &'a [PlanCourse], exclusions: &'a Exclusions) -> Self {
        Self {
            index: ArticulationIndex::new(agreements),
            plan,
            exclusions,
        }
    }

    fn plan_references(&self, course: &Course) -> bool {
        let key = course.key();
        self.plan.iter().any(|pc| pc.covers(&key))
    }

    /// A course counts as satisfied when some articulation option is fully
    /// present in the plan, or a plan course already names it as a target.
    /// Courses with no articulation at all are satisfied by exclusion.
    #[must_use]
    pub fn course_satisfied(&self, course: &Course, scope: Option<&RequirementInputs>) -> bool {
        let by_option = match self.index.find_scoped(course, scope) {
            Some(found) => found.options().iter().any(|o| option_in_plan(o, self.plan)),
            None => self.exclusions.contains(course),
        };
        by_option || self.plan_references(course)
    }

    #[must_use]
    pub fn group_status(&self, group: &CourseGroup, scope: Option<&RequirementInputs>) -> GroupStatus {
        let needed = group.target();
        let mut fulfilled = 0.0;
        for course in &group.courses {
            if !self.course_satisfied(course, scope) {
                continue;
            }
            fulfilled += match self.index.find_scoped(course, scope) {
                Some(found) => contribution(group.rule, course, &found),
                None => group.rule.contribution(course),
            };
        }
        let all_excluded = group.courses.iter().all(|c| self.exclusions.contains(c));
        GroupStatus {
            fulfilled,
            needed,
            finished: fulfilled >= needed || all_excluded,
        }
    }

    #[must_use]
    pub fn requirement_completed(&self, requirement: &Requirement, scope: Option<&RequirementInputs>) -> bool {
        let mut finished = requirement
            .required_courses
            .iter()
            .map(|group| self.group_status(group, scope).finished);
        match requirement.conjunction {
            Conjunction::And => finished.all(|f| f),
            Conjunction::Or => finished.any(|f| f),
        }
    }
}

/// Whether `requirement` is complete given the plan and exclusions.
#[must_use]
pub fn requirement_completed(
    requirement: &Requirement,
    agreements: &[ArticulationObj],
    plan: &[PlanCourse],
    exclusions: &Exclusions,
) -> bool {
    Evaluator::new(agreements, plan, exclusions).requirement_completed(requirement, None)
}
