//! Removal of plan courses made redundant by a broader course.

use std::collections::BTreeSet;

use cccb_types::{CourseKey, PlanCourse};

/// Drop every plan course whose coverage is a non-empty strict subset of
/// another course's coverage. Returns the number of courses removed.
///
/// Courses with identical coverage are all kept, as are courses that cover
/// nothing yet (manual picks waiting for a rebuild to link them). Because
/// strict inclusion is transitive, every removed course is dominated by some
/// course that stays, so no FY course loses its last satisfier.
pub fn minimize_courses(plan: &mut Vec<PlanCourse>) -> usize {
    let coverage: Vec<BTreeSet<CourseKey>> = plan.iter().map(PlanCourse::coverage).collect();
    let dominated: Vec<bool> = coverage
        .iter()
        .enumerate()
        .map(|(i, mine)| {
            !mine.is_empty()
                && coverage
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && mine.len() < other.len() && mine.is_subset(other))
        })
        .collect();

    let before = plan.len();
    let mut flags = dominated.into_iter();
    plan.retain(|pc| {
        let drop = flags.next().unwrap_or(false);
        if drop {
            tracing::debug!(course = %pc.key(), "Dropping redundant plan course");
        }
        !drop
    });
    before - plan.len()
}
