//! Runtime configuration.
//!
//! Reads `drugpredict.toml` from the current directory, or the path in the
//! `DRUGPREDICT_CONFIG` env var. Every field has a default, so a missing file
//! yields a usable configuration. The deployment env vars `PORT`, `BASE_URL`
//! and `ALLOWED_ORIGINS` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DrugPredictError, Result};

pub const CONFIG_ENV_VAR: &str = "DRUGPREDICT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "drugpredict.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chembl: ChemblConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub padel: PadelConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

// ── ChEMBL ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemblConfig {
    #[serde(default = "default_chembl_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    /// Rows requested per activity page (ChEMBL caps this at 1000).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_activity_type")]
    pub activity_type: String,
}

fn default_chembl_url()      -> String { "https://www.ebi.ac.uk/chembl/api/data".to_string() }
fn default_request_timeout() -> u64    { 30 }
fn default_page_size()       -> usize  { 1000 }
fn default_activity_type()   -> String { "IC50".to_string() }

impl Default for ChemblConfig {
    fn default() -> Self {
        Self {
            base_url: default_chembl_url(),
            timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
            activity_type: default_activity_type(),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Limit used when a request does not name one ("all" or a count).
    #[serde(default = "default_limit")]
    pub default_limit: String,
    /// Minimum viable number of records after retrieval and preprocessing.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    /// Number of compounds echoed back in the result payload.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

fn default_limit()       -> String { "1000".to_string() }
fn default_min_records() -> usize  { 10 }
fn default_sample_size() -> usize  { 100 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            min_records: default_min_records(),
            sample_size: default_sample_size(),
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_processed_subdir")]
    pub processed_subdir: String,
    #[serde(default = "default_outputs_subdir")]
    pub outputs_subdir: String,
    /// Absolute prefix for `/outputs/...` plot paths in result payloads.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_data_dir()         -> PathBuf { PathBuf::from("data") }
fn default_processed_subdir() -> String  { "processed".to_string() }
fn default_outputs_subdir()   -> String  { "outputs".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            processed_subdir: default_processed_subdir(),
            outputs_subdir: default_outputs_subdir(),
            public_base_url: None,
        }
    }
}

impl OutputConfig {
    /// Directory for CSV artifacts.
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join(&self.processed_subdir)
    }

    /// Directory for rendered charts.
    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join(&self.outputs_subdir)
    }
}

// ── Extended descriptors (PaDEL) ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PadelConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_padel_script")]
    pub script: PathBuf,
    /// File name, inside the per-call scratch directory, the script writes.
    #[serde(default = "default_padel_output")]
    pub output_file: String,
    #[serde(default = "default_padel_timeout")]
    pub timeout_secs: u64,
}

fn bool_true()             -> bool    { true }
fn default_padel_script()  -> PathBuf { PathBuf::from("scripts/padel.sh") }
fn default_padel_output()  -> String  { "descriptors_output.csv".to_string() }
fn default_padel_timeout() -> u64     { 300 }

impl Default for PadelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script: default_padel_script(),
            output_file: default_padel_output(),
            timeout_secs: default_padel_timeout(),
        }
    }
}

// ── Model ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Minimum variance an extended descriptor column needs to be kept.
    #[serde(default = "default_variance_threshold")]
    pub variance_threshold: f64,
}

fn default_n_estimators()       -> usize { 100 }
fn default_seed()               -> u64   { 42 }
fn default_test_fraction()      -> f64   { 0.2 }
fn default_variance_threshold() -> f64   { 0.8 * (1.0 - 0.8) }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            variance_threshold: default_variance_threshold(),
        }
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Concurrent pipeline runs; further submissions queue.
    #[serde(default = "default_workers")]
    pub max_workers: usize,
    /// How long a finished task stays queryable.
    #[serde(default = "default_task_ttl")]
    pub task_ttl_secs: u64,
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_bind()           -> String { "0.0.0.0:5001".to_string() }
fn default_workers()        -> usize  { 4 }
fn default_task_ttl()       -> u64    { 3600 }
fn default_max_tasks()      -> usize  { 1024 }
fn default_sweep_interval() -> u64    { 60 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_workers: default_workers(),
            task_ttl_secs: default_task_ttl(),
            max_tasks: default_max_tasks(),
            sweep_interval_secs: default_sweep_interval(),
            allowed_origins: vec![],
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl Config {
    /// Load configuration from `DRUGPREDICT_CONFIG` or `drugpredict.toml`,
    /// falling back to defaults when the file does not exist, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_ENV_VAR).ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(DrugPredictError::Config(format!("Config file not found: {}", path)));
        } else {
            tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without env overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply the deployment env vars. `lookup` is injected so tests do not
    /// touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map(|(h, _)| h.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.bind = format!("{}:{}", host, port.trim());
        }
        if let Some(base) = lookup("BASE_URL").filter(|b| !b.trim().is_empty()) {
            self.output.public_base_url = Some(base.trim().trim_end_matches('/').to_string());
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chembl.page_size == 0 || self.chembl.page_size > 1000 {
            return Err(DrugPredictError::Config(format!(
                "chembl.page_size must be in 1..=1000, got {}",
                self.chembl.page_size
            )));
        }
        if !(0.0..1.0).contains(&self.model.test_fraction) || self.model.test_fraction == 0.0 {
            return Err(DrugPredictError::Config(format!(
                "model.test_fraction must be in (0, 1), got {}",
                self.model.test_fraction
            )));
        }
        if self.model.n_estimators == 0 {
            return Err(DrugPredictError::Config("model.n_estimators must be positive".into()));
        }
        if self.server.max_workers == 0 {
            return Err(DrugPredictError::Config("server.max_workers must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.min_records, 10);
        assert_eq!(config.pipeline.default_limit, "1000");
        assert_eq!(config.chembl.activity_type, "IC50");
        assert_eq!(config.model.n_estimators, 100);
        assert_eq!(config.model.seed, 42);
        assert!((config.model.variance_threshold - 0.16).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            max_workers = 2

            [output]
            data_dir = "/tmp/dp"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.max_workers, 2);
        assert_eq!(config.server.task_ttl_secs, 3600);
        assert_eq!(config.output.outputs_dir(), PathBuf::from("/tmp/dp/outputs"));
        assert_eq!(config.output.processed_dir(), PathBuf::from("/tmp/dp/processed"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("BASE_URL", "https://example.org/"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.output.public_base_url.as_deref(), Some("https://example.org"));
        assert_eq!(config.server.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.chembl.page_size = 5000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.test_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Config::from_toml_str("[server\nbind = 1").unwrap_err();
        assert!(matches!(err, DrugPredictError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drugpredict.toml");
        std::fs::write(&path, "[padel]\nenabled = false\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(!config.padel.enabled);
        assert_eq!(config.padel.timeout_secs, 300);
    }
}
