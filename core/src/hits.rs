//! Grouping of raw search records by sending college.

use std::mem;

use cccb_types::{FoundCourse, SearchEntry, SearchRecord};

/// Course options one college offers for the searched FY course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollegeHits {
    pub college_name: Option<String>,
    pub agreement_link: Option<String>,
    /// Each entry is one option: a single course or an ordered series.
    pub options: Vec<Vec<FoundCourse>>,
}

impl CollegeHits {
    fn is_empty(&self) -> bool {
        self.college_name.is_none() && self.agreement_link.is_none() && self.options.is_empty()
    }
}

/// Split records into per-college hits. A `ccName` entry starts a new
/// college; entries that describe no course and no college are skipped.
#[must_use]
pub fn group_search_hits(records: &[SearchRecord]) -> Vec<CollegeHits> {
    let mut out = Vec::new();
    for record in records {
        let mut current = CollegeHits::default();
        for entry in &record.result {
            match entry {
                SearchEntry::College { cc_name } => {
                    if !current.is_empty() {
                        out.push(mem::take(&mut current));
                    }
                    current.college_name = Some(cc_name.clone());
                }
                SearchEntry::AgreementLink { agreement_link } => {
                    current.agreement_link = Some(agreement_link.clone());
                }
                other => {
                    if let Some(courses) = other.courses() {
                        current.options.push(courses);
                    }
                }
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}
