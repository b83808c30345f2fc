use std::path::{Path, PathBuf};

use mason_types::{ProviderDefinition, ProvidersDocument};
use serde::Deserialize;

use crate::error::MasonError;

fn default_poll_interval_seconds() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevBacklogSettings {
    pub api_url: String,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaServiceSettings {
    pub api_url: String,
}

fn default_max_tasks_per_story() -> usize {
    10
}

fn default_default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecompositionSettings {
    #[serde(default = "default_max_tasks_per_story")]
    pub max_tasks_per_story: usize,
    #[serde(default = "default_default_max_attempts")]
    pub default_max_attempts: u32,
}

impl Default for DecompositionSettings {
    fn default() -> Self {
        Self {
            max_tasks_per_story: default_max_tasks_per_story(),
            default_max_attempts: default_default_max_attempts(),
        }
    }
}

fn default_strategy() -> String {
    "smart".to_string()
}

fn default_rate_limit_cooldown() -> i64 {
    300
}

fn default_high_load_threshold() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSelectionSettings {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_rate_limit_cooldown")]
    pub rate_limit_cooldown: i64,
    #[serde(default = "default_high_load_threshold")]
    pub high_load_threshold: u64,
}

impl Default for ProviderSelectionSettings {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            rate_limit_cooldown: default_rate_limit_cooldown(),
            high_load_threshold: default_high_load_threshold(),
        }
    }
}

fn default_artifacts_root() -> PathBuf {
    PathBuf::from("./artifacts")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsSettings {
    #[serde(default = "default_artifacts_root")]
    pub root: PathBuf,
}

impl Default for ArtifactsSettings {
    fn default() -> Self {
        Self { root: default_artifacts_root() }
    }
}

/// Typed equivalent of the dot-path config accessors named in §6
/// (`devbacklog.api_url`, `decomposition.max_tasks_per_story`, …). Each
/// field falls back to the documented default via `serde(default)` rather
/// than stringly-typed path lookups, which is more idiomatic in a
/// statically typed loader while preserving every default value and key
/// name from the original.
#[derive(Debug, Clone, Deserialize)]
pub struct MasonSettings {
    pub devbacklog: DevBacklogSettings,
    pub qa_service: QaServiceSettings,
    #[serde(default)]
    pub decomposition: DecompositionSettings,
    #[serde(default)]
    pub provider_selection: ProviderSelectionSettings,
    #[serde(default)]
    pub artifacts: ArtifactsSettings,
}

#[derive(Debug, Clone, Deserialize)]
struct MasonDocument {
    mason: MasonSettings,
}

/// Search locations for a named config document, in priority order: a
/// project-local path, a system path under `/opt/mason/`, then a
/// user-home path. First hit wins (§6).
fn search_locations(file_name: &str, explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut locations = vec![PathBuf::from(file_name), PathBuf::from("/opt/mason").join(file_name)];
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".mason").join(file_name));
    }
    locations
}

/// Loads the `mason.yaml` settings document. A missing file at every
/// search location is a fatal startup error (§6/§7).
pub async fn load_settings(explicit_path: Option<&Path>) -> Result<(MasonSettings, PathBuf), MasonError> {
    for candidate in search_locations("mason.yaml", explicit_path) {
        match tokio::fs::read_to_string(&candidate).await {
            Ok(contents) => {
                let doc: MasonDocument = serde_yaml::from_str(&contents).map_err(|e| {
                    MasonError::ConfigInvalid(format!("{}: {e}", candidate.display()))
                })?;
                return Ok((doc.mason, candidate));
            }
            Err(_) => continue,
        }
    }
    Err(MasonError::ConfigMissing(
        "no mason.yaml found in the project directory, /opt/mason, or the user home directory"
            .to_string(),
    ))
}

/// Loads the `providers.json` document listing `ProviderDefinition`s.
/// Same search-order and fatal-on-missing semantics as `load_settings`.
pub async fn load_provider_definitions(
    explicit_path: Option<&Path>,
) -> Result<Vec<ProviderDefinition>, MasonError> {
    for candidate in search_locations("providers.json", explicit_path) {
        match tokio::fs::read_to_string(&candidate).await {
            Ok(contents) => {
                let doc: ProvidersDocument = serde_json::from_str(&contents).map_err(|e| {
                    MasonError::ConfigInvalid(format!("{}: {e}", candidate.display()))
                })?;
                return Ok(doc.providers);
            }
            Err(_) => continue,
        }
    }
    Err(MasonError::ConfigMissing(
        "no providers.json found in the project directory, /opt/mason, or the user home directory"
            .to_string(),
    ))
}
