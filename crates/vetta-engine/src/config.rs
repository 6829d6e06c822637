use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VettaConfig {
    #[serde(default = "default_job_server_url")]
    pub job_server_url: String,
    /// Id of the profile-data container on the review site.
    #[serde(default = "default_profile_container_id")]
    pub profile_container_id: String,
    /// Id of the next-page control on the review site.
    #[serde(default = "default_next_control_id")]
    pub next_control_id: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Pacing delay after each submission.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Where processing state is persisted; defaults to ~/.vetta/state.json.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for VettaConfig {
    fn default() -> Self {
        Self {
            job_server_url: default_job_server_url(),
            profile_container_id: default_profile_container_id(),
            next_control_id: default_next_control_id(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            step_delay_ms: default_step_delay_ms(),
            state_path: None,
        }
    }
}

impl VettaConfig {
    pub fn state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_path {
            return path.clone();
        }
        match dirs::home_dir() {
            Some(home) => home.join(".vetta").join("state.json"),
            None => PathBuf::from("./vetta-state.json"),
        }
    }
}

fn default_job_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_profile_container_id() -> String {
    "candidateProfileContainer".to_string()
}

fn default_next_control_id() -> String {
    "nextPageButton".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_max_polls() -> u32 {
    50
}

fn default_step_delay_ms() -> u64 {
    500
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./vetta.yaml
    /// 2. ~/.vetta/config.yaml
    /// 3. Default configuration
    ///
    /// `VETTA_JOB_SERVER_URL` in the environment beats the file in all cases.
    pub async fn load_default() -> Result<VettaConfig, ConfigError> {
        let mut config = Self::load_first_file().await?;
        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<VettaConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut config: VettaConfig = serde_yaml::from_str(&content)?;
        apply_env_overrides(&mut config);
        Ok(config)
    }

    async fn load_first_file() -> Result<VettaConfig, ConfigError> {
        let local_config = PathBuf::from("./vetta.yaml");
        if local_config.exists() {
            let content = tokio::fs::read_to_string(&local_config).await?;
            return Ok(serde_yaml::from_str(&content)?);
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".vetta").join("config.yaml");
            if home_config.exists() {
                let content = tokio::fs::read_to_string(&home_config).await?;
                return Ok(serde_yaml::from_str(&content)?);
            }
        }

        Ok(VettaConfig::default())
    }
}

fn apply_env_overrides(config: &mut VettaConfig) {
    if let Ok(url) = std::env::var("VETTA_JOB_SERVER_URL") {
        if !url.trim().is_empty() {
            config.job_server_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_review_site_contract() {
        let config = VettaConfig::default();
        assert_eq!(config.job_server_url, "http://localhost:3000");
        assert_eq!(config.profile_container_id, "candidateProfileContainer");
        assert_eq!(config.next_control_id, "nextPageButton");
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.max_polls, 50);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config: VettaConfig =
            serde_yaml::from_str("job_server_url: http://127.0.0.1:9000\n").unwrap();
        assert_eq!(config.job_server_url, "http://127.0.0.1:9000");
        assert_eq!(config.next_control_id, "nextPageButton");
        assert_eq!(config.step_delay_ms, 500);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let result: Result<VettaConfig, _> = serde_yaml::from_str(": not yaml [");
        assert!(result.is_err());
    }
}
