//! Presentation helpers over requirement catalogs.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

use cccb_types::{Course, CourseGroup, CourseKey, GroupRule, RequirementGroup};

/// Compare two strings treating runs of ASCII digits as numbers, so
/// `"2" < "10"` and `"1B" < "10A"`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let take_run = |it: &mut Peekable<Chars<'_>>| {
                    let mut run = String::new();
                    while let Some(c) = it.next_if(char::is_ascii_digit) {
                        run.push(c);
                    }
                    run
                };
                let (ra, rb) = (take_run(&mut left), take_run(&mut right));
                let (ta, tb) = (ra.trim_start_matches('0'), rb.trim_start_matches('0'));
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Courses ordered by prefix then course number; series go last in their
/// original order.
#[must_use]
pub fn sort_courses(courses: &[Course]) -> Vec<Course> {
    let mut sorted = courses.to_vec();
    sorted.sort_by(|a, b| match (a.is_series(), b.is_series()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => natural_cmp(a.prefix().unwrap_or_default(), b.prefix().unwrap_or_default())
            .then_with(|| natural_cmp(a.number().unwrap_or_default(), b.number().unwrap_or_default())),
    });
    sorted
}

/// Lettered instruction line for a requirement with several groups, e.g.
/// `"Complete A, B and C"`. Empty for fewer than two groups.
#[must_use]
pub fn create_instructions(groups: &[CourseGroup]) -> String {
    if groups.len() < 2 {
        return String::new();
    }
    let mut letters: Vec<String> = (0..groups.len()).map(group_letter).collect();
    let last = letters.pop().unwrap_or_default();
    format!("Complete {} and {last}", letters.join(", "))
}

/// `A`..`Z`, then `AA`, `AB`, ...
fn group_letter(index: usize) -> String {
    let mut n = index;
    let mut out = Vec::new();
    loop {
        out.push(char::from(b'A' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out.iter().rev().collect()
}

/// Requirement groups bucketed by university, in first-seen order.
#[must_use]
pub fn group_by_university(requirements: Vec<RequirementGroup>) -> Vec<Vec<RequirementGroup>> {
    let mut buckets: Vec<Vec<RequirementGroup>> = Vec::new();
    for group in requirements {
        match buckets
            .iter_mut()
            .find(|b| b.first().is_some_and(|g| g.inputs.fy_id == group.inputs.fy_id))
        {
            Some(bucket) => bucket.push(group),
            None => buckets.push(vec![group]),
        }
    }
    buckets
}

/// Drop courses already listed by an earlier major at the same university.
///
/// An `NCourses` group that loses as many courses as it asks for is emptied:
/// the earlier major already covers it. Output is grouped by university.
#[must_use]
pub fn remove_duplicates(requirements: Vec<RequirementGroup>) -> Vec<RequirementGroup> {
    let mut out = Vec::with_capacity(requirements.len());
    for bucket in group_by_university(requirements) {
        let mut seen: BTreeSet<CourseKey> = BTreeSet::new();
        for mut group in bucket {
            for requirement in &mut group.requirements {
                for course_group in &mut requirement.required_courses {
                    dedupe_group(course_group, &mut seen);
                }
            }
            out.push(group);
        }
    }
    out
}

fn dedupe_group(group: &mut CourseGroup, seen: &mut BTreeSet<CourseKey>) {
    let before = group.courses.len();
    let mut kept = Vec::with_capacity(before);
    for course in group.courses.drain(..) {
        if seen.insert(course.key()) {
            kept.push(course);
        }
    }
    let removed = before - kept.len();
    group.courses = match group.rule {
        GroupRule::NCourses(n) if removed > 0 && removed >= n as usize => Vec::new(),
        _ => kept,
    };
}
