//! Agreement links for the cross-institution search.

use std::collections::VecDeque;

use cccb_config::Institution;
use cccb_types::{IdValue, SearchTarget};
use serde::{Deserialize, Serialize};

/// One sending institution's agreement: the data link the search service
/// fetches and the page a student can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementLink {
    pub link: String,
    pub agreement_link: String,
}

/// Query prefixes the agreement keys are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplates {
    api_params: String,
    view_params: String,
}

impl LinkTemplates {
    #[must_use]
    pub fn new(api_params: impl Into<String>, view_params: impl Into<String>) -> Self {
        Self {
            api_params: api_params.into(),
            view_params: view_params.into(),
        }
    }

    #[must_use]
    pub fn link(&self, sending_id: &str, target: &SearchTarget) -> AgreementLink {
        let year = target.year();
        let receiving = &target.receiving_id;
        let view_key = format!("{year}/{sending_id}/to/{receiving}/Major/{}", target.major_key);
        AgreementLink {
            link: format!("{}={view_key}", self.api_params),
            agreement_link: format!(
                "{}={year}&institution={sending_id}&agreement={receiving}&agreementType=to\
                 &view=agreement&viewBy=major&viewSendingAgreements=false&viewByKey={view_key}",
                self.view_params
            ),
        }
    }
}

/// One link per candidate college, skipping the primary college and entries
/// without an id.
#[must_use]
pub fn build_links(
    templates: &LinkTemplates,
    colleges: &[Institution],
    primary_ccc_id: &str,
    target: &SearchTarget,
) -> Vec<AgreementLink> {
    let primary = IdValue::parse(primary_ccc_id);
    colleges
        .iter()
        .map(|college| college.id.trim())
        .filter(|id| !id.is_empty() && IdValue::parse(id) != primary)
        .map(|id| templates.link(id, target))
        .collect()
}

/// Split links into a queue of chunks of at most `chunk_size` links.
#[must_use]
pub fn chunk_links(links: Vec<AgreementLink>, chunk_size: usize) -> VecDeque<Vec<AgreementLink>> {
    let chunk_size = chunk_size.max(1);
    let mut queue = VecDeque::with_capacity(links.len().div_ceil(chunk_size));
    let mut links = links.into_iter().peekable();
    while links.peek().is_some() {
        queue.push_back(links.by_ref().take(chunk_size).collect());
    }
    queue
}
