//! Known institutions and name matching.

use serde::{Deserialize, Serialize};

use cccb_types::IdValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Institution {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Lookup table of colleges or universities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstitutionDirectory {
    institutions: Vec<Institution>,
}

impl InstitutionDirectory {
    #[must_use]
    pub fn new(institutions: Vec<Institution>) -> Self {
        Self { institutions }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Institution> {
        let wanted = IdValue::parse(id);
        self.institutions.iter().find(|i| IdValue::parse(&i.id) == wanted)
    }

    /// Display name for an id, or `None` when the id is unknown.
    #[must_use]
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|i| i.name.as_str())
    }

    /// Institutions whose name, code or abbreviation matches `query`.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Institution> {
        self.institutions
            .iter()
            .filter(|i| {
                match_name(&i.name, query)
                    || i.code.as_deref().is_some_and(|code| code.eq_ignore_ascii_case(query.trim()))
            })
            .collect()
    }

    /// The institution a display name refers to: an exact name match
    /// ignoring case, else the first fuzzy match.
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> Option<&Institution> {
        let name = name.trim();
        self.institutions
            .iter()
            .find(|i| i.name.trim().eq_ignore_ascii_case(name))
            .or_else(|| self.search(name).into_iter().next())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Institution> {
        self.institutions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Initials of every word except "of", lowercased: "University of
/// California, Los Angeles" -> "ucla".
fn abbreviation(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !word.eq_ignore_ascii_case("of"))
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Fuzzy institution name matching.
///
/// Accepts abbreviations ("ucla", "sjsu"), short abbreviation prefixes for
/// names that are not part of the UC system, plain substrings, and queries
/// whose every word appears in the name.
#[must_use]
pub fn match_name(name: &str, query: &str) -> bool {
    let (norm_name, norm_query) = (normalize(name), normalize(query));
    if norm_name.is_empty() || norm_query.is_empty() {
        return false;
    }

    let name_abbr = abbreviation(name);
    let query_abbr = abbreviation(query);
    if name_abbr == query_abbr {
        return true;
    }

    if query_abbr.len() <= 4
        && name_abbr.starts_with(&query_abbr)
        && norm_name.contains(&query_abbr)
        && !norm_name.contains("university")
        && !norm_name.contains("california")
    {
        return true;
    }

    if norm_name.contains(&norm_query) {
        return true;
    }

    let name_words: Vec<&str> = norm_name.split_whitespace().collect();
    norm_query.split_whitespace().all(|q| {
        name_words.iter().any(|w| w.contains(q)) || (q.len() <= 4 && name_abbr.starts_with(q))
    })
}
