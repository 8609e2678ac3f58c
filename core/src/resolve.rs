//! Mapping courses reported by the search back onto an articulation dataset.

use cccb_types::{Articulation, ArticulationObj, Course, FoundCourse, IdValue};

/// An option in the dataset whose courses are exactly the searched courses.
#[derive(Debug, Clone, Copy)]
pub struct Equivalence<'a> {
    pub articulation: &'a Articulation,
    pub option: &'a [Course],
    pub agreement: &'a ArticulationObj,
}

/// Course numbers compare numerically when both sides are numeric.
fn numbers_match(found: &str, known: &str) -> bool {
    match (IdValue::parse(found), IdValue::parse(known)) {
        (IdValue::Numeric(a), IdValue::Numeric(b)) => a == b,
        (a, b) => a.to_string().eq_ignore_ascii_case(&b.to_string()),
    }
}

/// Same prefix, course number and title.
#[must_use]
pub fn course_matches(found: &FoundCourse, course: &Course) -> bool {
    let (Some(prefix), Some(number)) = (course.prefix(), course.number()) else {
        return false;
    };
    found.prefix.trim() == prefix.trim()
        && numbers_match(&found.number, number)
        && found.title.trim() == course.title().unwrap_or_default().trim()
}

/// Find the first option, in dataset order, made of exactly `found`
/// (same length, position by position).
#[must_use]
pub fn find_equivalent<'a>(found: &[FoundCourse], agreements: &'a [ArticulationObj]) -> Option<Equivalence<'a>> {
    if found.is_empty() {
        return None;
    }
    agreements.iter().find_map(|agreement| {
        agreement.articulated_courses.iter().find_map(|articulation| {
            articulation
                .options()
                .iter()
                .find(|option| {
                    option.len() == found.len()
                        && option.iter().zip(found).all(|(course, f)| course_matches(f, course))
                })
                .map(|option| Equivalence {
                    articulation,
                    option: option.as_slice(),
                    agreement,
                })
        })
    })
}
