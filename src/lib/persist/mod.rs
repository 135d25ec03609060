// SPDX-License-Identifier: Apache-2.0

mod address;
mod dns;
mod encode;
mod generate;
mod link;
mod netdev;
mod proxy;
mod route;
mod service;

use std::path::{Path, PathBuf};

use crate::{
    config_file, model::ANY_IFACE, ErrorKind, InterfaceHandle, NcmConfig,
    NcmError, Network, SectionBuilder,
};

pub use self::generate::{GenerateReport, InterfaceOutcome};
pub(crate) use self::encode::render_network;

const NETWORK_FILE_SUFFIX: &str = "network";
const NETDEV_FILE_SUFFIX: &str = "netdev";
// Sorted after the per interface files
const ANY_IFACE_FILE_STEM: &str = "99-default";

/// Translate model types into the managed daemon's configuration files.
///
/// Every operation validates its input before touching any file and
/// modifies one file at a time through [crate::config_file].
#[derive(Debug, Clone)]
pub struct ConfigPersister {
    config: NcmConfig,
}

impl ConfigPersister {
    pub fn new(config: NcmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NcmConfig {
        &self.config
    }

    /// Path of the `.network` file of the interface: an existing file whose
    /// `[Match] Name=` holds the interface name, or the generated file
    /// name otherwise.
    pub fn network_file_path(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<PathBuf, NcmError> {
        if let Some(path) = self.find_matching_file(iface.name())? {
            return Ok(path);
        }
        Ok(self.generated_path(iface.name(), NETWORK_FILE_SUFFIX))
    }

    pub(crate) fn netdev_file_path(&self, name: &str) -> PathBuf {
        self.generated_path(name, NETDEV_FILE_SUFFIX)
    }

    fn generated_path(&self, name: &str, suffix: &str) -> PathBuf {
        if name == ANY_IFACE {
            return self
                .config
                .network_dir
                .join(format!("{ANY_IFACE_FILE_STEM}.{suffix}"));
        }
        self.config.network_dir.join(format!(
            "{}{name}.{suffix}",
            self.config.file_prefix
        ))
    }

    fn find_matching_file(
        &self,
        name: &str,
    ) -> Result<Option<PathBuf>, NcmError> {
        let generated = self.generated_path(name, NETWORK_FILE_SUFFIX);
        if generated.exists() {
            return Ok(Some(generated));
        }
        let dir = match std::fs::read_dir(&self.config.network_dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(e) => {
                return Err(NcmError::new(
                    ErrorKind::PersistFailure,
                    format!(
                        "Failed to list {}: {e}",
                        self.config.network_dir.display()
                    ),
                ));
            }
        };
        let mut candidates: Vec<PathBuf> = dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().and_then(|s| s.to_str())
                    == Some(NETWORK_FILE_SUFFIX)
            })
            .collect();
        candidates.sort_unstable();
        for path in candidates {
            // Unparsable files belong to somebody else
            let Ok(sections) = config_file::read(&path) else {
                continue;
            };
            if sections
                .get("Match", "Name")
                .map(|v| v.split_whitespace().any(|n| n == name))
                .unwrap_or_default()
            {
                log::trace!("Found {} matching {name}", path.display());
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Lock, load and edit the `.network` file of `iface`. Configure
    /// operations create the file holding `[Match] Name=`, removal
    /// operations fail with `NotFound` when it is missing.
    pub(crate) fn modify_network<F, T>(
        &self,
        iface: &InterfaceHandle,
        create: bool,
        func: F,
    ) -> Result<T, NcmError>
    where
        F: FnOnce(&mut SectionBuilder) -> Result<T, NcmError>,
    {
        let path = self.network_file_path(iface)?;
        log::debug!(
            "{} {} for {}",
            if create { "Configuring" } else { "Updating" },
            path.display(),
            iface.name()
        );
        config_file::modify(&path, !create, |sb| {
            if sb.section("Match").is_none() {
                encode::insert_match_section(sb, iface.name());
            }
            func(sb)
        })
        .map_err(|e| e.with_iface(iface.name()))
    }

    pub(crate) fn read_network(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<SectionBuilder, NcmError> {
        let path = self.network_file_path(iface)?;
        config_file::read(&path).map_err(|e| e.with_iface(iface.name()))
    }

    /// Regenerate the whole `.network` file of `network`, plus the
    /// `.netdev` and `.network` files of its VLANs and the proxy file.
    /// Return the path of the interface file.
    pub fn write_network(
        &self,
        network: &Network,
    ) -> Result<PathBuf, NcmError> {
        network.validate()?;
        let iface = network.handle()?;
        let path = self.network_file_path(&iface)?;
        log::debug!("Generating {} for {}", path.display(), network.name);
        let sections = render_network(network);
        config_file::write_full(&path, sections.to_string().as_str())
            .map_err(|e| e.with_iface(&network.name))?;

        for vlan in &network.vlans {
            self.write_vlan_files(vlan)
                .map_err(|e| e.with_iface(&network.name))?;
        }
        for family in [crate::DhcpFamily::V4, crate::DhcpFamily::V6] {
            if let Some(duid) = network
                .dhcp_client(family)
                .and_then(|c| c.duid.as_ref())
                .filter(|d| d.persist_across_systems)
            {
                self.write_system_duid(family, duid)
                    .map_err(|e| e.with_iface(&network.name))?;
            }
        }
        if let Some(proxy) = network.proxy.as_ref() {
            self.configure_proxy(proxy)
                .map_err(|e| e.with_iface(&network.name))?;
        }
        Ok(path)
    }

    /// Delete the `.network` file of `iface`.
    pub fn remove_network_file(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        let path = self.network_file_path(iface)?;
        if config_file::remove_file(&path)? {
            Ok(())
        } else {
            Err(not_found(iface.name(), &path))
        }
    }

    /// Content of the `.network` file of `iface`.
    pub fn show_network_config(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<String, NcmError> {
        let path = self.network_file_path(iface)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(not_found(iface.name(), &path))
            }
            Err(e) => Err(NcmError::new(
                ErrorKind::PersistFailure,
                format!("Failed to read {}: {e}", path.display()),
            )
            .with_iface(iface.name())),
        }
    }
}

fn not_found(iface: &str, path: &Path) -> NcmError {
    NcmError::new(
        ErrorKind::NotFound,
        format!("Config file {} does not exist", path.display()),
    )
    .with_iface(iface)
}
