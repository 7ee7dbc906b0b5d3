//! Service configuration from the environment

use north_core::NorthError;
use north_policy::PolicyConfig;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_AUDIT_DIR: &str = "north-audit";
pub const DEFAULT_AUDIT_QUEUE: usize = 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Listen address
    pub addr: String,
    /// Root of the filesystem audit store
    pub audit_dir: PathBuf,
    /// Capacity of the audit dispatch queue
    pub audit_queue: usize,
    /// Fallback filter when RUST_LOG is unset
    pub log_level: String,
    /// YAML policy; the built-in policy when absent
    pub policy_file: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            audit_dir: PathBuf::from(DEFAULT_AUDIT_DIR),
            audit_queue: DEFAULT_AUDIT_QUEUE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            policy_file: None,
        }
    }
}

impl ServiceConfig {
    /// Read `NORTH_*` variables from the process environment
    pub fn from_env() -> Result<Self, NorthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NorthError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let audit_queue = match non_empty("NORTH_AUDIT_QUEUE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    NorthError::ConfigError(format!(
                        "NORTH_AUDIT_QUEUE must be a positive integer, got '{}'",
                        raw
                    ))
                })?,
            None => defaults.audit_queue,
        };

        Ok(Self {
            addr: non_empty("NORTH_ADDR").unwrap_or(defaults.addr),
            audit_dir: non_empty("NORTH_AUDIT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_dir),
            audit_queue,
            log_level: non_empty("NORTH_LOG_LEVEL").unwrap_or(defaults.log_level),
            policy_file: non_empty("NORTH_POLICY_FILE").map(PathBuf::from),
        })
    }

    /// The effective policy: the configured file, or the built-in one
    pub fn load_policy(&self) -> Result<PolicyConfig, NorthError> {
        match &self.policy_file {
            Some(path) => PolicyConfig::load(path),
            None => Ok(PolicyConfig::weighted_v1()),
        }
    }
}
