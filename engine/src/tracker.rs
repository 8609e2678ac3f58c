//! Per-course search state.
//!
//! ```text
//! Idle ──begin──▶ Searching ──complete──▶ Found | Exhausted
//!  ▲                  │                          │
//!  └────cancel────────┘◀─────────reset───────────┘
//! ```

use std::collections::HashMap;

use futures_util::future::AbortHandle;

use cccb_assist::SearchReport;
use cccb_core::{CollegeHits, group_search_hits};
use cccb_types::CourseKey;

use crate::error::SessionError;

#[derive(Debug)]
pub enum SearchState {
    Searching {
        abort_handle: AbortHandle,
    },
    Found {
        hits: Vec<CollegeHits>,
        /// Whether a hit has been resolved into the plan.
        linked: bool,
    },
    /// The search ended without results; `reason` is set when it was cut
    /// short by a failed request.
    Exhausted {
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Searching,
    Found,
    Exhausted,
}

#[derive(Debug, Default)]
pub struct SearchTracker {
    states: HashMap<CourseKey, SearchState>,
}

impl SearchTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self, key: &CourseKey) -> Option<&SearchState> {
        self.states.get(key)
    }

    #[must_use]
    pub fn phase(&self, key: &CourseKey) -> SearchPhase {
        match self.states.get(key) {
            None => SearchPhase::Idle,
            Some(SearchState::Searching { .. }) => SearchPhase::Searching,
            Some(SearchState::Found { .. }) => SearchPhase::Found,
            Some(SearchState::Exhausted { .. }) => SearchPhase::Exhausted,
        }
    }

    /// Check that a search may start for `key`.
    pub fn ensure_idle(&self, key: &CourseKey) -> Result<(), SessionError> {
        match self.phase(key) {
            SearchPhase::Idle => Ok(()),
            SearchPhase::Searching => Err(SessionError::SearchRunning(key.clone())),
            SearchPhase::Found | SearchPhase::Exhausted => Err(SessionError::SearchNotIdle(key.clone())),
        }
    }

    pub fn begin(&mut self, key: CourseKey, abort_handle: AbortHandle) -> Result<(), SessionError> {
        self.ensure_idle(&key)?;
        self.states.insert(key, SearchState::Searching { abort_handle });
        Ok(())
    }

    /// Record a finished search. Ignored unless `key` is searching, so a
    /// report arriving after a cancel does not resurrect the search.
    pub fn complete(&mut self, key: &CourseKey, report: &SearchReport) -> SearchPhase {
        if self.phase(key) != SearchPhase::Searching {
            return self.phase(key);
        }
        let hits = group_search_hits(&report.records);
        let state = if hits.iter().any(|h| !h.options.is_empty()) {
            SearchState::Found { hits, linked: false }
        } else {
            SearchState::Exhausted {
                reason: report.interrupted.clone(),
            }
        };
        self.states.insert(key.clone(), state);
        self.phase(key)
    }

    /// The search task itself failed.
    pub fn fail(&mut self, key: &CourseKey, reason: String) {
        if self.phase(key) == SearchPhase::Searching {
            self.states.insert(key.clone(), SearchState::Exhausted { reason: Some(reason) });
        }
    }

    pub fn mark_linked(&mut self, key: &CourseKey) {
        if let Some(SearchState::Found { linked, .. }) = self.states.get_mut(key) {
            *linked = true;
        }
    }

    /// Back to idle from any state, aborting a running search.
    pub fn reset(&mut self, key: &CourseKey) -> bool {
        match self.states.remove(key) {
            Some(SearchState::Searching { abort_handle }) => {
                abort_handle.abort();
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Abort a running search. Returns `false` if none was running.
    pub fn cancel(&mut self, key: &CourseKey) -> bool {
        if self.phase(key) != SearchPhase::Searching {
            return false;
        }
        self.reset(key)
    }

    pub fn abort_all(&mut self) {
        for state in self.states.values() {
            if let SearchState::Searching { abort_handle } = state {
                abort_handle.abort();
            }
        }
        self.states
            .retain(|_, state| !matches!(state, SearchState::Searching { .. }));
    }

    pub fn searching(&self) -> impl Iterator<Item = &CourseKey> {
        self.states
            .iter()
            .filter(|(_, s)| matches!(s, SearchState::Searching { .. }))
            .map(|(k, _)| k)
    }
}
