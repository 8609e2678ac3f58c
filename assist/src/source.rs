//! Requirement catalog and articulation dataset fetches.

use serde::Deserialize;
use url::Url;

use cccb_types::{ArticulationObj, Requirement, RequirementGroup, RequirementInputs};

use crate::endpoints::{Endpoints, join_segments};
use crate::error::AssistError;
use crate::send_json;

/// The catalog may answer with a full group or just its requirements; the
/// inputs are always the ones that were asked for.
#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementsBody {
    Bare(Vec<Requirement>),
    Group {
        #[serde(default)]
        requirements: Vec<Requirement>,
    },
}

#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: reqwest::Client,
    requirements_url: Url,
    articulations_url: Url,
    equivalence_url: Option<Url>,
}

impl HttpDataSource {
    pub fn new(client: reqwest::Client, endpoints: &Endpoints) -> Result<Self, AssistError> {
        Ok(Self {
            client,
            requirements_url: endpoints.requirements()?.clone(),
            articulations_url: endpoints.articulations()?.clone(),
            equivalence_url: endpoints.equivalence.clone(),
        })
    }

    /// GET `{requirements}/{fyId}/{majorId}`.
    pub async fn fetch_requirements(&self, inputs: &RequirementInputs) -> Result<RequirementGroup, AssistError> {
        let url = join_segments(
            "requirements",
            &self.requirements_url,
            &[inputs.fy_id.as_str(), inputs.major_id.as_str()],
        )?;
        let body: RequirementsBody = send_json(self.client.get(url.clone()), &url).await?;
        let requirements = match body {
            RequirementsBody::Bare(requirements) | RequirementsBody::Group { requirements } => requirements,
        };
        tracing::debug!(fy_id = %inputs.fy_id, major_id = %inputs.major_id, requirements = requirements.len(), "Requirements fetched");
        Ok(RequirementGroup {
            inputs: inputs.clone(),
            requirements,
        })
    }

    /// POST every selection in one request to the primary dataset.
    pub async fn fetch_articulations(&self, inputs: &[RequirementInputs]) -> Result<Vec<ArticulationObj>, AssistError> {
        self.post_selections(&self.articulations_url, inputs).await
    }

    /// The equivalence dataset, or `Ok(None)` when no endpoint is configured.
    pub async fn fetch_equivalence(
        &self,
        inputs: &[RequirementInputs],
    ) -> Result<Option<Vec<ArticulationObj>>, AssistError> {
        match &self.equivalence_url {
            Some(url) => self.post_selections(url, inputs).await.map(Some),
            None => Ok(None),
        }
    }

    async fn post_selections(&self, url: &Url, inputs: &[RequirementInputs]) -> Result<Vec<ArticulationObj>, AssistError> {
        let agreements: Vec<ArticulationObj> = send_json(self.client.post(url.clone()).json(inputs), url).await?;
        tracing::debug!(%url, agreements = agreements.len(), "Articulations fetched");
        Ok(agreements)
    }
}
