// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NcmError};

const DEFAULT_NETWORK_DIR: &str = "/etc/systemd/network";
const DEFAULT_NETWORKD_CONF: &str = "/etc/systemd/networkd.conf";
const DEFAULT_RESOLVED_CONF: &str = "/etc/systemd/resolved.conf";
const DEFAULT_TIMESYNCD_CONF: &str = "/etc/systemd/timesyncd.conf";
const DEFAULT_PROXY_CONF: &str = "/etc/sysconfig/proxy";
const DEFAULT_STATE_DIR: &str = "/var/lib/ncm";
const DEFAULT_FILE_PREFIX: &str = "10-";
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

/// Retry policy for transient kernel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
#[non_exhaustive]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Sleep `backoff-ms * attempt` milliseconds between attempts
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
#[non_exhaustive]
pub struct NcmConfig {
    /// Folder holding the per interface `.network` and `.netdev` files
    pub network_dir: PathBuf,
    pub networkd_conf: PathBuf,
    pub resolved_conf: PathBuf,
    pub timesyncd_conf: PathBuf,
    pub proxy_conf: PathBuf,
    /// Folder recording what was merged into shared files
    pub state_dir: PathBuf,
    /// Prefix of generated file names
    pub file_prefix: String,
    pub retry: RetryConfig,
}

impl Default for NcmConfig {
    fn default() -> Self {
        Self {
            network_dir: PathBuf::from(DEFAULT_NETWORK_DIR),
            networkd_conf: PathBuf::from(DEFAULT_NETWORKD_CONF),
            resolved_conf: PathBuf::from(DEFAULT_RESOLVED_CONF),
            timesyncd_conf: PathBuf::from(DEFAULT_TIMESYNCD_CONF),
            proxy_conf: PathBuf::from(DEFAULT_PROXY_CONF),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl NcmConfig {
    pub const DEFAULT_PATH: &'static str = "/etc/ncm/ncm.yml";

    /// Load configuration from `path`, or from [Self::DEFAULT_PATH] when it
    /// exists. An explicitly requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, NcmError> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(Self::DEFAULT_PATH), false),
        };
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "Config file {} does not exist, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(NcmError::new(
                    ErrorKind::InvalidInput,
                    format!("Failed to read {}: {e}", path.display()),
                ));
            }
        };
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            NcmError::invalid(format!("Invalid {}: {e}", path.display()))
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Every file lives under `root`, used for staging and tests.
    pub fn with_root(root: &Path) -> Self {
        let under = |p: &str| root.join(p.trim_start_matches('/'));
        Self {
            network_dir: under(DEFAULT_NETWORK_DIR),
            networkd_conf: under(DEFAULT_NETWORKD_CONF),
            resolved_conf: under(DEFAULT_RESOLVED_CONF),
            timesyncd_conf: under(DEFAULT_TIMESYNCD_CONF),
            proxy_conf: under(DEFAULT_PROXY_CONF),
            state_dir: under(DEFAULT_STATE_DIR),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), NcmError> {
        if self.retry.attempts == 0 {
            return Err(NcmError::invalid(
                "retry.attempts should be at least 1".to_string(),
            ));
        }
        if self.file_prefix.contains('/') {
            return Err(NcmError::invalid(format!(
                "file-prefix '{}' should not contain '/'",
                self.file_prefix
            )));
        }
        Ok(())
    }
}
