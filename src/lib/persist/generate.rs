// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigPersister;
use crate::{cmdline, yaml, ErrorKind, NcmError, Network};

const KERNEL_CMDLINE_PATH: &str = "/proc/cmdline";

/// Result of generating the files of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct InterfaceOutcome {
    pub iface: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NcmError>,
}

/// Per interface outcome of a generation pass, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct GenerateReport {
    pub outcomes: Vec<InterfaceOutcome>,
}

impl GenerateReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none())
    }

    pub fn errors(&self) -> impl Iterator<Item = &NcmError> {
        self.outcomes.iter().filter_map(|o| o.error.as_ref())
    }

    pub fn outcome(&self, iface: &str) -> Option<&InterfaceOutcome> {
        self.outcomes.iter().find(|o| o.iface == iface)
    }

    /// First failure, for callers wanting one overall result
    pub fn first_error(&self) -> Option<&NcmError> {
        self.errors().next()
    }
}

impl ConfigPersister {
    /// Write the files of every network in declaration order. A failing
    /// interface does not stop the others. No live change is made.
    pub fn generate_from_declarative_source(
        &self,
        networks: &[Network],
    ) -> GenerateReport {
        let mut report = GenerateReport::default();
        for network in networks {
            let outcome = match self.write_network(network) {
                Ok(path) => {
                    log::debug!(
                        "Generated {} for {}",
                        path.display(),
                        network.name
                    );
                    InterfaceOutcome {
                        iface: network.name.clone(),
                        path: Some(path),
                        error: None,
                    }
                }
                Err(e) => {
                    log::debug!("Failed to generate {}: {e}", network.name);
                    InterfaceOutcome {
                        iface: network.name.clone(),
                        path: None,
                        error: Some(e.with_iface(&network.name)),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    /// Parse the YAML document at `path` and generate its networks. Parse
    /// errors are returned before any file is written.
    pub fn generate_from_yaml(
        &self,
        path: &Path,
    ) -> Result<GenerateReport, NcmError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NcmError::new(
                if e.kind() == std::io::ErrorKind::NotFound {
                    ErrorKind::NotFound
                } else {
                    ErrorKind::InvalidInput
                },
                format!("Failed to read {}: {e}", path.display()),
            )
        })?;
        let networks = yaml::parse_networks(&content)?;
        Ok(self.generate_from_declarative_source(&networks))
    }

    /// Generate networks from a kernel command line, `line` when given,
    /// otherwise the content of `file` (default `/proc/cmdline`).
    pub fn generate_from_command_line(
        &self,
        file: Option<&Path>,
        line: Option<&str>,
    ) -> Result<GenerateReport, NcmError> {
        let content = match line {
            Some(l) => l.to_string(),
            None => {
                let path = file.unwrap_or(Path::new(KERNEL_CMDLINE_PATH));
                std::fs::read_to_string(path).map_err(|e| {
                    NcmError::invalid(format!(
                        "Failed to read {}: {e}",
                        path.display()
                    ))
                })?
            }
        };
        let networks = cmdline::parse_networks(&content)?;
        Ok(self.generate_from_declarative_source(&networks))
    }
}
