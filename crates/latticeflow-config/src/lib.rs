//! Controller configuration for latticeflow
//!
//! Settings are read from a YAML file and then overridden by environment
//! variables, so the same binary can run from a mounted ConfigMap or from
//! a plain pod environment.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_PATH_ENV: &str = "LATTICEFLOW_CONFIG_PATH";
const CANDIDATES: [&str; 2] = ["latticeflow.local.yaml", "latticeflow.yaml"];

/// Controller-wide settings shared by every reconciler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Name of the cluster this controller runs in
    pub cluster_name: String,

    /// Account owning the remote resources
    pub account_id: String,

    /// Region of the remote control plane
    pub region: String,

    /// VPC the cluster's pods live in; every target group is created here
    pub vpc_id: String,

    /// Service network that routes are associated with when none is given
    pub default_service_network: Option<String>,

    /// Requeue policy applied by the reconcile wrapper
    pub requeue: RequeueConfig,
}

/// Requeue timings, expressed in seconds so the YAML stays readable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequeueConfig {
    pub retry_initial_delay_secs: u64,
    pub retry_max_delay_secs: u64,
    pub backoff_multiplier: f64,
    pub safety_interval_secs: u64,
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            retry_initial_delay_secs: 20,
            retry_max_delay_secs: 300,
            backoff_multiplier: 2.0,
            safety_interval_secs: 300,
        }
    }
}

impl RequeueConfig {
    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_secs(self.retry_initial_delay_secs)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_secs(self.retry_max_delay_secs)
    }

    pub fn safety_interval(&self) -> Duration {
        Duration::from_secs(self.safety_interval_secs)
    }

    /// Delay before the `attempt`-th retry (0-based), capped at the max delay
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let initial = self.retry_initial_delay().as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = initial * self.backoff_multiplier.max(1.0).powi(exponent);
        let capped = scaled.min(self.retry_max_delay().as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

impl ControllerConfig {
    /// Locate the config file, parse it and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file() {
            Ok(path) => Self::from_file(&path)?,
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("no controller config file found, using environment only");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file without applying overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("loaded controller config from {}", path.display());
        Ok(config)
    }

    /// Environment variables win over file values when set and non-empty
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 4] = [
            ("CLUSTER_NAME", &mut self.cluster_name),
            ("AWS_ACCOUNT_ID", &mut self.account_id),
            ("REGION", &mut self.region),
            ("CLUSTER_VPC_ID", &mut self.vpc_id),
        ];
        for (key, slot) in overrides {
            if let Some(value) = non_empty_env(key) {
                *slot = value;
            }
        }
        if let Some(value) = non_empty_env("DEFAULT_SERVICE_NETWORK") {
            self.default_service_network = Some(value);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.is_empty() {
            return Err(ConfigError::MissingField("cluster_name"));
        }
        if self.account_id.is_empty() {
            return Err(ConfigError::MissingField("account_id"));
        }
        if self.vpc_id.is_empty() {
            return Err(ConfigError::MissingField("vpc_id"));
        }
        if self.requeue.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "requeue.backoff_multiplier",
                message: format!("must be >= 1.0, got {}", self.requeue.backoff_multiplier),
            });
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Global config directory (`~/.config/latticeflow`)
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("latticeflow"))
}

/// Find the controller config file
///
/// Search order:
/// 1. `LATTICEFLOW_CONFIG_PATH`
/// 2. current directory: latticeflow.local.yaml, latticeflow.yaml
/// 3. `./.latticeflow/` with the same names
/// 4. `~/.config/latticeflow/latticeflow.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for dir in [current_dir.clone(), current_dir.join(".latticeflow")] {
        for filename in &CANDIDATES {
            let path = dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("latticeflow").join("latticeflow.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
