//! Greedy construction of a plan from requirement trees.
//!
//! The builder walks every requirement group and merges articulation options
//! into the plan. A single pass can make an option newly present, which in
//! turn satisfies courses visited earlier, so passes repeat until the plan
//! stops growing. Minimization runs once the plan is stable.

use cccb_types::{
    ArticulationObj, ArticulationTarget, Conjunction, Course, CourseGroup, GroupRule, PlanCourse,
    Requirement, RequirementGroup, RequirementInputs,
};

use crate::index::{ArticulationIndex, ArticulationMatch, option_in_plan};
use crate::minimize::minimize_courses;

/// Merge `option` into the plan as satisfying `fy_course`.
///
/// Courses already in the plan gain a target for `fy_course` unless they
/// already reference it; missing courses are appended. Returns how many
/// targets or courses were added, so `0` means the plan is unchanged.
pub fn update_plan_courses(
    plan: &mut Vec<PlanCourse>,
    option: &[Course],
    agreement: &ArticulationObj,
    fy_course: &Course,
) -> usize {
    let mut added = 0;
    for course in option {
        let target = ArticulationTarget::new(&agreement.articulation_info, fy_course.clone());
        let key = course.key();
        if let Some(existing) = plan.iter_mut().find(|pc| pc.key() == key) {
            if existing.add_target(target) {
                added += 1;
            }
        } else {
            let mut entry = PlanCourse::new(course.clone(), Some(agreement.ccc_info.clone()));
            entry.add_target(target);
            plan.push(entry);
            added += 1;
        }
    }
    added
}

/// Outcome of a [`PlanBuilder::build`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Passes run, including the final one that changed nothing.
    pub passes: usize,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone)]
pub struct PlanBuilder<'a> {
    index: ArticulationIndex<'a>,
}

impl<'a> PlanBuilder<'a> {
    #[must_use]
    pub fn new(agreements: &'a [ArticulationObj]) -> Self {
        Self {
            index: ArticulationIndex::new(agreements),
        }
    }

    #[must_use]
    pub fn index(&self) -> &ArticulationIndex<'a> {
        &self.index
    }

    /// Run passes until the plan is stable, then minimize it.
    pub fn build(&self, requirements: &[RequirementGroup], plan: &mut Vec<PlanCourse>) -> BuildReport {
        let mut report = BuildReport::default();
        loop {
            report.passes += 1;
            let added = self.pass(requirements, plan);
            report.added += added;
            if added == 0 {
                break;
            }
        }
        report.removed = minimize_courses(plan);
        tracing::debug!(
            passes = report.passes,
            added = report.added,
            removed = report.removed,
            plan_len = plan.len(),
            "Plan rebuilt"
        );
        report
    }

    /// One traversal of every requirement. Returns the number of additions.
    pub fn pass(&self, requirements: &[RequirementGroup], plan: &mut Vec<PlanCourse>) -> usize {
        let mut added = 0;
        for group in requirements {
            for requirement in &group.requirements {
                for course_group in selected_groups(requirement) {
                    added += self.process_group(course_group, &group.inputs, plan);
                }
            }
        }
        added
    }

    fn process_group(
        &self,
        group: &CourseGroup,
        scope: &RequirementInputs,
        plan: &mut Vec<PlanCourse>,
    ) -> usize {
        let target = group.target();
        let mut fulfilled = 0.0;
        let mut added = 0;

        for course in &group.courses {
            if fulfilled >= target {
                break;
            }
            let Some(found) = self.index.find_scoped(course, Some(scope)) else {
                continue;
            };

            let options = found.options();
            let mut merged = false;
            if options.len() == 1 && group.rule.is_unconstrained() {
                added += update_plan_courses(plan, &options[0], found.agreement, found.fy_course());
                merged = true;
            } else {
                for option in options {
                    if option_in_plan(option, plan) {
                        added += update_plan_courses(plan, option, found.agreement, found.fy_course());
                        merged = true;
                    }
                }
            }

            if merged {
                fulfilled += contribution(group.rule, course, &found);
            }
        }
        added
    }
}

/// Groups of a requirement the builder acts on.
///
/// For `Or` only the group with the fewest courses is worked on; the first
/// one wins a tie.
fn selected_groups(requirement: &Requirement) -> Vec<&CourseGroup> {
    match requirement.conjunction {
        Conjunction::And => requirement.required_courses.iter().collect(),
        Conjunction::Or => requirement
            .required_courses
            .iter()
            .min_by_key(|g| g.courses.len())
            .into_iter()
            .collect(),
    }
}

/// Credit weight falls back to the FY course in the agreement when the
/// requirement course carries no credits of its own.
pub(crate) fn contribution(rule: GroupRule, course: &Course, found: &ArticulationMatch<'_>) -> f64 {
    match rule {
        GroupRule::NCredits(_) if course.credits().is_none() => rule.contribution(found.fy_course()),
        _ => rule.contribution(course),
    }
}

/// Build to quiescence and minimize in one call.
pub fn build_plan(
    requirements: &[RequirementGroup],
    agreements: &[ArticulationObj],
    plan: &mut Vec<PlanCourse>,
) -> BuildReport {
    PlanBuilder::new(agreements).build(requirements, plan)
}
