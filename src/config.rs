use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-sc.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: Option<String>,
    pub retry_budget: usize,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_resolution: f64,
    pub identity_cutoff: f64,
    pub jobs: usize,
    pub early_exit_factor: Option<f64>,
    pub endpoints: Endpoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            retry_budget: 10,
            retry_delay_ms: 1000,
            request_timeout_secs: 60,
            max_resolution: 5.0,
            identity_cutoff: 0.90,
            jobs: 1,
            early_exit_factor: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl Settings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub biounit: String,
    pub bundle: String,
    pub structure: String,
    pub entry_info: String,
    pub assembly_info: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            biounit: "https://ftp.wwpdb.org/pub/pdb/data/biounit/PDB/divided/".to_string(),
            bundle: "https://files.rcsb.org/pub/pdb/compatible/pdb_bundle/".to_string(),
            structure: "https://ftp.wwpdb.org/pub/pdb/data/structures/divided/pdb/".to_string(),
            entry_info: "https://data.rcsb.org/rest/v1/core/entry/".to_string(),
            assembly_info: "https://data.rcsb.org/rest/v1/core/assembly/".to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Settings, KiraError> {
        let settings: Settings =
            serde_json::from_str(content).map_err(|err| KiraError::ConfigParse(err.to_string()))?;
        if settings.retry_budget == 0 {
            return Err(KiraError::ConfigParse(
                "retry_budget must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&settings.identity_cutoff) {
            return Err(KiraError::ConfigParse(format!(
                "identity_cutoff must be within [0, 1], got {}",
                settings.identity_cutoff
            )));
        }
        if let Some(factor) = settings.early_exit_factor {
            if !factor.is_finite() || factor < 1.0 {
                return Err(KiraError::ConfigParse(format!(
                    "early_exit_factor must be at least 1.0, got {factor}"
                )));
            }
        }
        Ok(settings)
    }
}
