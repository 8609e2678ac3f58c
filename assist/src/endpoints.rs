use cccb_config::{ConfigError, EndpointsConfig};
use url::Url;

use crate::error::AssistError;
use crate::links::LinkTemplates;

/// Parsed service URLs. Only the endpoints a caller actually uses need to be
/// configured; accessors report the missing ones.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub requirements: Option<Url>,
    pub articulations: Option<Url>,
    pub equivalence: Option<Url>,
    pub search: Option<Url>,
    pub cache_lookup: Option<Url>,
    pub cache_finalize: Option<Url>,
    pub agreement_api_params: Option<String>,
    pub agreement_view_params: Option<String>,
}

fn parse(name: &'static str, value: Option<&str>) -> Result<Option<Url>, AssistError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    Url::parse(value)
        .map(Some)
        .map_err(|source| AssistError::InvalidEndpoint {
            name,
            value: value.to_string(),
            source,
        })
}

fn required<'a>(url: Option<&'a Url>, name: &'static str) -> Result<&'a Url, AssistError> {
    url.ok_or(AssistError::Config(ConfigError::MissingEndpoint(name)))
}

impl Endpoints {
    /// Expand `${VAR}` references and parse every configured URL.
    pub fn from_config(config: &EndpointsConfig) -> Result<Self, AssistError> {
        let config = config.expanded();
        Ok(Self {
            requirements: parse("requirements", config.requirements.as_deref())?,
            articulations: parse("articulations", config.articulations.as_deref())?,
            equivalence: parse("equivalence", config.equivalence.as_deref())?,
            search: parse("search", config.search.as_deref())?,
            cache_lookup: parse("cache_lookup", config.cache_lookup.as_deref())?,
            cache_finalize: parse("cache_finalize", config.cache_finalize.as_deref())?,
            agreement_api_params: config.agreement_api_params,
            agreement_view_params: config.agreement_view_params,
        })
    }

    pub fn requirements(&self) -> Result<&Url, AssistError> {
        required(self.requirements.as_ref(), "requirements")
    }

    pub fn articulations(&self) -> Result<&Url, AssistError> {
        required(self.articulations.as_ref(), "articulations")
    }

    pub fn search(&self) -> Result<&Url, AssistError> {
        required(self.search.as_ref(), "search")
    }

    pub fn link_templates(&self) -> Result<LinkTemplates, AssistError> {
        let api = EndpointsConfig::require(self.agreement_api_params.as_deref(), "agreement_api_params")?;
        let view = EndpointsConfig::require(self.agreement_view_params.as_deref(), "agreement_view_params")?;
        Ok(LinkTemplates::new(api, view))
    }
}

/// `base` with `segments` appended as individually encoded path segments.
pub(crate) fn join_segments(name: &'static str, base: &Url, segments: &[&str]) -> Result<Url, AssistError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AssistError::NotABase {
            name,
            value: base.to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
