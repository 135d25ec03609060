// SPDX-License-Identifier: Apache-2.0

use super::encode::{vlan_netdev, SECTION_NETWORK};
use super::ConfigPersister;
use crate::{config_file, ErrorKind, InterfaceHandle, NcmError, VlanDescriptor};

impl ConfigPersister {
    /// Write the `.netdev` and `.network` files of the VLAN and list it in
    /// `[Network] VLAN=` of its parent.
    pub fn create_vlan(&self, vlan: &VlanDescriptor) -> Result<(), NcmError> {
        vlan.validate().map_err(|e| e.with_iface(&vlan.name))?;
        self.write_vlan_files(vlan)?;
        self.modify_network(&vlan.parent, true, |sb| {
            sb.section_or_insert(SECTION_NETWORK)
                .append("VLAN", vlan.name.as_str());
            Ok(())
        })
    }

    pub(crate) fn write_vlan_files(
        &self,
        vlan: &VlanDescriptor,
    ) -> Result<(), NcmError> {
        let netdev_path = self.netdev_file_path(&vlan.name);
        log::debug!(
            "Generating {} for VLAN {}",
            netdev_path.display(),
            vlan.name
        );
        config_file::write_full(
            &netdev_path,
            vlan_netdev(vlan).to_string().as_str(),
        )
        .map_err(|e| e.with_iface(&vlan.name))?;
        let handle = InterfaceHandle::new(&vlan.name)?;
        self.modify_network(&handle, true, |_| Ok(()))
    }

    /// Remove the `.netdev` file of `name` after checking its `Kind=`, the
    /// `.network` file of it, and its `VLAN=` entries of every other
    /// interface file.
    pub fn remove_netdev(
        &self,
        name: &str,
        kind: &str,
    ) -> Result<(), NcmError> {
        let handle = InterfaceHandle::new(name)?;
        let netdev_path = self.netdev_file_path(name);
        let netdev = config_file::read(&netdev_path)
            .map_err(|e| e.with_iface(name))?;
        match netdev.get("NetDev", "Kind") {
            Some(k) if k == kind => (),
            k => {
                return Err(NcmError::new(
                    ErrorKind::InvalidInput,
                    format!(
                        "{} is of kind {}, not {kind}",
                        netdev_path.display(),
                        k.unwrap_or("unknown")
                    ),
                )
                .with_iface(name));
            }
        }
        config_file::remove_file(&netdev_path)?;

        let network_path = self.network_file_path(&handle)?;
        config_file::remove_file(&network_path)?;

        if kind == "vlan" {
            self.remove_vlan_references(name)?;
        }
        Ok(())
    }

    fn remove_vlan_references(&self, name: &str) -> Result<(), NcmError> {
        let dir = match std::fs::read_dir(&self.config.network_dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let mut paths: Vec<_> = dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().and_then(|s| s.to_str()) == Some("network")
            })
            .collect();
        paths.sort_unstable();
        for path in paths {
            let Ok(sections) = config_file::read(&path) else {
                continue;
            };
            if sections
                .sections_named(SECTION_NETWORK)
                .any(|s| s.get_all("VLAN").contains(&name))
            {
                config_file::modify(&path, true, |sb| {
                    sb.unset_value(SECTION_NETWORK, "VLAN", name);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}
