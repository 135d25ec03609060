// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{
    validate_iface_name, AddressConfig, DhcpClientConfig, DhcpClientMode,
    DhcpFamily, Dhcpv4ServerConfig, InterfaceHandle, IpAddress, LinkConfig,
    LinkLocalAddressing, LinkState, ProxyConfig, Route,
    RouterAdvertisementConfig, RoutingPolicyRule, VlanDescriptor,
};
use crate::NcmError;

/// Where DNS servers and search domains are written to.
///
/// The interface file is always written. `global` additionally merges the
/// values into the system resolver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DnsScope {
    pub system: bool,
    pub global: bool,
}

impl DnsScope {
    pub fn system() -> Self {
        Self {
            system: true,
            global: false,
        }
    }

    pub fn global() -> Self {
        Self {
            system: false,
            global: true,
        }
    }
}

/// Desired configuration of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct Network {
    pub name: String,
    #[serde(default, skip_serializing_if = "LinkConfig::is_empty")]
    pub link: LinkConfig,
    /// Administrative state, persisted as activation policy when no
    /// explicit policy is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<LinkState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<DhcpClientMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcpv4: Option<DhcpClientConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcpv6: Option<DhcpClientConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_local_addressing: Option<LinkLocalAddressing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_accept_ra: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<AddressConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_policy_rules: Vec<RoutingPolicyRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<IpAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntp: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcpv4_server: Option<Dhcpv4ServerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_advertisement: Option<RouterAdvertisementConfig>,
    /// VLANs stacked on this interface
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vlans: Vec<VlanDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl Network {
    pub fn new(name: &str) -> Result<Self, NcmError> {
        validate_iface_name(name)?;
        Ok(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn handle(&self) -> Result<InterfaceHandle, NcmError> {
        InterfaceHandle::new(&self.name)
    }

    pub fn dhcp_client(&self, family: DhcpFamily) -> Option<&DhcpClientConfig> {
        match family {
            DhcpFamily::V4 => self.dhcpv4.as_ref(),
            DhcpFamily::V6 => self.dhcpv6.as_ref(),
        }
    }

    pub fn dhcp_client_mut(
        &mut self,
        family: DhcpFamily,
    ) -> &mut DhcpClientConfig {
        match family {
            DhcpFamily::V4 => self.dhcpv4.get_or_insert_with(Default::default),
            DhcpFamily::V6 => self.dhcpv6.get_or_insert_with(Default::default),
        }
    }

    /// Structural validation of every member. The returned error carries the
    /// interface name.
    pub fn validate(&self) -> Result<(), NcmError> {
        self.validate_members().map_err(|e| e.with_iface(&self.name))
    }

    fn validate_members(&self) -> Result<(), NcmError> {
        validate_iface_name(&self.name)?;
        self.link.validate()?;
        if self.ipv6_mtu == Some(0) {
            return Err(NcmError::invalid(
                "IPv6 MTU should not be 0".to_string(),
            ));
        }
        for family in [DhcpFamily::V4, DhcpFamily::V6] {
            if let Some(cfg) = self.dhcp_client(family) {
                cfg.validate(family)?;
            }
        }
        for addr in &self.addresses {
            addr.validate()?;
        }
        for route in &self.routes {
            route.validate()?;
        }
        for rule in &self.routing_policy_rules {
            rule.validate()?;
        }
        for domain in self.domains.iter().chain(self.ntp.iter()) {
            validate_word(domain)?;
        }
        if let Some(server) = self.dhcpv4_server.as_ref() {
            server.validate()?;
        }
        if let Some(ra) = self.router_advertisement.as_ref() {
            ra.validate()?;
        }
        for vlan in &self.vlans {
            vlan.validate()?;
            if vlan.parent.name() != self.name {
                return Err(NcmError::invalid(format!(
                    "VLAN {} has parent {} but is declared under {}",
                    vlan.name,
                    vlan.parent.name(),
                    self.name
                )));
            }
        }
        if let Some(proxy) = self.proxy.as_ref() {
            proxy.validate()?;
        }
        Ok(())
    }
}

/// Domains and NTP servers are stored space separated.
pub(crate) fn validate_word(value: &str) -> Result<(), NcmError> {
    if value.is_empty() || value.contains(char::is_whitespace) {
        Err(NcmError::invalid(format!(
            "Invalid value '{value}', should not be empty or contain \
             whitespace"
        )))
    } else {
        Ok(())
    }
}
