// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use super::encode::{SECTION_LINK, SECTION_NETWORK};
use super::ConfigPersister;
use crate::{
    config_file, ActivationPolicy, AddressFamilyOnline, DhcpClientDuid,
    DhcpClientIdentifier, DhcpClientMode, DhcpFamily, InterfaceHandle,
    LinkFlag, LinkLocalAddressing, MacAddress, NcmError,
};

impl ConfigPersister {
    pub fn set_link_mtu(
        &self,
        iface: &InterfaceHandle,
        mtu: u32,
    ) -> Result<(), NcmError> {
        if mtu == 0 {
            return Err(NcmError::invalid("MTU should not be 0".to_string())
                .with_iface(iface.name()));
        }
        self.set_link_key(iface, "MTUBytes", mtu.to_string().as_str())
    }

    pub fn set_link_mac(
        &self,
        iface: &InterfaceHandle,
        mac: &MacAddress,
    ) -> Result<(), NcmError> {
        self.set_link_key(iface, "MACAddress", mac.to_string().as_str())
    }

    pub fn set_link_group(
        &self,
        iface: &InterfaceHandle,
        group: u32,
    ) -> Result<(), NcmError> {
        self.set_link_key(iface, "Group", group.to_string().as_str())
    }

    pub fn set_link_flag(
        &self,
        iface: &InterfaceHandle,
        flag: LinkFlag,
        value: bool,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, true, |sb| {
            sb.section_or_insert(SECTION_LINK).set_bool(flag.key(), value);
            Ok(())
        })
    }

    pub fn set_link_required_family_for_online(
        &self,
        iface: &InterfaceHandle,
        family: AddressFamilyOnline,
    ) -> Result<(), NcmError> {
        self.set_link_key(iface, "RequiredFamilyForOnline", family.as_str())
    }

    pub fn set_link_activation_policy(
        &self,
        iface: &InterfaceHandle,
        policy: ActivationPolicy,
    ) -> Result<(), NcmError> {
        self.set_link_key(iface, "ActivationPolicy", policy.as_str())
    }

    fn set_link_key(
        &self,
        iface: &InterfaceHandle,
        key: &str,
        value: &str,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, true, |sb| {
            sb.set(SECTION_LINK, key, value);
            Ok(())
        })
    }

    pub fn set_dhcp_client(
        &self,
        iface: &InterfaceHandle,
        mode: DhcpClientMode,
    ) -> Result<(), NcmError> {
        self.set_network_key(iface, "DHCP", mode.as_str())
    }

    /// DHCP client mode of the interface, `no` when not configured.
    pub fn get_dhcp_client(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<DhcpClientMode, NcmError> {
        let sections = self.read_network(iface)?;
        match sections.get(SECTION_NETWORK, "DHCP") {
            Some(v) => DhcpClientMode::from_str(v)
                .map_err(|e| e.with_iface(iface.name())),
            None => Ok(DhcpClientMode::No),
        }
    }

    /// Enabling IPv6 turns on IPv6 link-local addressing and router
    /// advertisement acceptance, disabling turns both off.
    pub fn enable_ipv6(
        &self,
        iface: &InterfaceHandle,
        enable: bool,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, true, |sb| {
            let section = sb.section_or_insert(SECTION_NETWORK);
            section.set(
                "LinkLocalAddressing",
                if enable {
                    LinkLocalAddressing::Ipv6.as_str()
                } else {
                    LinkLocalAddressing::No.as_str()
                },
            );
            section.set_bool("IPv6AcceptRA", enable);
            Ok(())
        })
    }

    pub fn set_link_local_addressing(
        &self,
        iface: &InterfaceHandle,
        mode: LinkLocalAddressing,
    ) -> Result<(), NcmError> {
        self.set_network_key(iface, "LinkLocalAddressing", mode.as_str())
    }

    pub fn set_ipv6_mtu(
        &self,
        iface: &InterfaceHandle,
        mtu: u32,
    ) -> Result<(), NcmError> {
        if mtu == 0 {
            return Err(NcmError::invalid(
                "IPv6 MTU should not be 0".to_string(),
            )
            .with_iface(iface.name()));
        }
        self.set_network_key(iface, "IPv6MTUBytes", mtu.to_string().as_str())
    }

    /// Set arbitrary `[Network]` key, for keys without dedicated operation.
    pub fn set_network_key(
        &self,
        iface: &InterfaceHandle,
        key: &str,
        value: &str,
    ) -> Result<(), NcmError> {
        validate_key_value(key, value)?;
        self.modify_network(iface, true, |sb| {
            sb.set(SECTION_NETWORK, key, value);
            Ok(())
        })
    }

    pub fn set_network_key_bool(
        &self,
        iface: &InterfaceHandle,
        key: &str,
        value: bool,
    ) -> Result<(), NcmError> {
        self.set_network_key(iface, key, if value { "yes" } else { "no" })
    }

    pub fn unset_network_key(
        &self,
        iface: &InterfaceHandle,
        key: &str,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            sb.unset(SECTION_NETWORK, key);
            Ok(())
        })
    }

    pub fn set_dhcp4_client_identifier(
        &self,
        iface: &InterfaceHandle,
        identifier: DhcpClientIdentifier,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, true, |sb| {
            sb.set(
                DhcpFamily::V4.section_name(),
                "ClientIdentifier",
                identifier.as_str(),
            );
            Ok(())
        })
    }

    pub fn get_dhcp4_client_identifier(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<Option<DhcpClientIdentifier>, NcmError> {
        let sections = self.read_network(iface)?;
        sections
            .get(DhcpFamily::V4.section_name(), "ClientIdentifier")
            .map(DhcpClientIdentifier::from_str)
            .transpose()
            .map_err(|e| e.with_iface(iface.name()))
    }

    pub fn set_dhcp_client_iaid(
        &self,
        iface: &InterfaceHandle,
        family: DhcpFamily,
        iaid: u32,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, true, |sb| {
            sb.set(family.section_name(), "IAID", iaid.to_string().as_str());
            Ok(())
        })
    }

    pub fn get_dhcp_client_iaid(
        &self,
        iface: &InterfaceHandle,
        family: DhcpFamily,
    ) -> Result<Option<u32>, NcmError> {
        let sections = self.read_network(iface)?;
        sections
            .get(family.section_name(), "IAID")
            .map(|v| {
                v.parse::<u32>().map_err(|e| {
                    NcmError::invalid(format!("Invalid IAID '{v}': {e}"))
                        .with_iface(iface.name())
                })
            })
            .transpose()
    }

    /// DUID persisted across systems goes to the daemon wide configuration
    /// instead of the interface file.
    pub fn set_dhcp_client_duid(
        &self,
        iface: &InterfaceHandle,
        family: DhcpFamily,
        duid: &DhcpClientDuid,
    ) -> Result<(), NcmError> {
        duid.validate().map_err(|e| e.with_iface(iface.name()))?;
        if duid.persist_across_systems {
            return self
                .write_system_duid(family, duid)
                .map_err(|e| e.with_iface(iface.name()));
        }
        self.modify_network(iface, true, |sb| {
            let section = sb.section_or_insert(family.section_name());
            section.set("DUIDType", duid.duid_type.as_str());
            match duid.raw_data.as_deref() {
                Some(raw) => {
                    section.set("DUIDRawData", raw);
                }
                None => {
                    section.unset("DUIDRawData");
                }
            }
            Ok(())
        })
    }

    pub(crate) fn write_system_duid(
        &self,
        family: DhcpFamily,
        duid: &DhcpClientDuid,
    ) -> Result<(), NcmError> {
        config_file::modify(&self.config.networkd_conf, false, |sb| {
            let section = sb.section_or_insert(family.section_name());
            section.set("DUIDType", duid.duid_type.as_str());
            if let Some(raw) = duid.raw_data.as_deref() {
                section.set("DUIDRawData", raw);
            }
            Ok(())
        })
    }

    /// Set boolean `key` of the `[DHCPv4]` or `[DHCPv6]` section.
    pub fn set_dhcp_section_bool(
        &self,
        iface: &InterfaceHandle,
        family: DhcpFamily,
        key: &str,
        value: bool,
    ) -> Result<(), NcmError> {
        validate_key_value(key, "")?;
        self.modify_network(iface, true, |sb| {
            sb.section_or_insert(family.section_name()).set_bool(key, value);
            Ok(())
        })
    }
}

fn validate_key_value(key: &str, value: &str) -> Result<(), NcmError> {
    if key.is_empty()
        || !key.chars().all(|c| c.is_ascii_alphanumeric())
        || value.contains(['\n', '\r'])
    {
        Err(NcmError::invalid(format!(
            "Invalid key '{key}' or value '{value}'"
        )))
    } else {
        Ok(())
    }
}
