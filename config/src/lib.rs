//! Configuration for CCCBuilder.
//!
//! Read from `~/.cccb/config.toml`. Every section is optional; a missing file
//! yields [`CccbConfig::default`] with environment overrides applied. Endpoint URLs may reference environment
//! variables as `${VAR}`.
//!
//! ```toml
//! [endpoints]
//! requirements = "${CCCB_API}/requirements"
//! articulations = "${CCCB_API}/articulations"
//! search = "${CCCB_API}/search"
//!
//! [search]
//! chunk_size = 29
//!
//! [[institutions]]
//! id = "113"
//! name = "De Anza College"
//! ```

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use toml::de::Error as TomlError;

pub use cccb_core::{Institution, InstitutionDirectory};

pub const DEFAULT_CHUNK_SIZE: usize = 29;
pub const DEFAULT_CANDIDATE_TOTAL: usize = 116;

/// Environment override for [`SearchConfig::chunk_size`].
pub const CHUNK_SIZE_ENV: &str = "CCCB_SEARCH_CHUNK_SIZE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: TomlError,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("endpoint `{0}` is not configured")]
    MissingEndpoint(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CccbConfig {
    pub endpoints: EndpointsConfig,
    pub search: SearchConfig,
    /// Community colleges: candidate senders for the articulation search.
    pub institutions: Vec<Institution>,
    pub universities: Vec<Institution>,
}

/// Service URLs. `agreement_api_params` and `agreement_view_params` are the
/// prefixes the search link builder appends agreement keys to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub requirements: Option<String>,
    pub articulations: Option<String>,
    pub equivalence: Option<String>,
    pub search: Option<String>,
    pub cache_lookup: Option<String>,
    pub cache_finalize: Option<String>,
    pub agreement_api_params: Option<String>,
    pub agreement_view_params: Option<String>,
}

impl EndpointsConfig {
    /// Copy with every `${VAR}` reference expanded.
    #[must_use]
    pub fn expanded(&self) -> Self {
        let expand = |value: &Option<String>| value.as_deref().map(expand_env_vars);
        Self {
            requirements: expand(&self.requirements),
            articulations: expand(&self.articulations),
            equivalence: expand(&self.equivalence),
            search: expand(&self.search),
            cache_lookup: expand(&self.cache_lookup),
            cache_finalize: expand(&self.cache_finalize),
            agreement_api_params: expand(&self.agreement_api_params),
            agreement_view_params: expand(&self.agreement_view_params),
        }
    }

    /// The value of a required endpoint, or [`ConfigError::MissingEndpoint`].
    pub fn require<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, ConfigError> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingEndpoint(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Sending institutions per streaming request.
    pub chunk_size: usize,
    /// Upper bound of the progress counter.
    pub candidate_total: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            candidate_total: DEFAULT_CANDIDATE_TOTAL,
        }
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &after[..close];
        if var.is_empty() {
            out.push_str("${}");
        } else {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cccb").join("config.toml"))
}

impl CccbConfig {
    /// Load `~/.cccb/config.toml`, or defaults when there is no file.
    /// Environment overrides apply either way.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(config_path().as_deref(), |key| env::var(key).ok())
    }

    /// Load a specific file and apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::read(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn parse(content: &str) -> Result<Self, TomlError> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Apply overrides read through `lookup`, keyed by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(CHUNK_SIZE_ENV) {
            self.search.chunk_size = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: CHUNK_SIZE_ENV,
                reason: format!("{raw:?}: {e}"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "search.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn colleges(&self) -> InstitutionDirectory {
        InstitutionDirectory::new(self.institutions.clone())
    }

    #[must_use]
    pub fn university_directory(&self) -> InstitutionDirectory {
        InstitutionDirectory::new(self.universities.clone())
    }

    /// Display name of a university by id.
    #[must_use]
    pub fn university_name(&self, fy_id: &str) -> Option<String> {
        self.university_directory().name_of(fy_id).map(str::to_string)
    }
}
