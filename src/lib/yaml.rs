// SPDX-License-Identifier: Apache-2.0

//! Netplan style YAML document:
//!
//! ```yaml
//! network:
//!   ethernets:
//!     eth0:
//!       dhcp4: true
//!   vlans:
//!     vlan10:
//!       id: 10
//!       link: eth0
//!       addresses: [192.0.2.2/24]
//! ```

use serde::Deserialize;

use crate::{
    AddressConfig, DhcpClientMode, DhcpFamily, InterfaceHandle, IpAddress,
    LinkLocalAddressing, MacAddress, NcmError, Network, Route, RouteScope,
    RouteTable, RouteType, RoutingPolicyRule, VlanDescriptor,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlDocument {
    network: YamlNetworks,
}

// Mapping keeps the declaration order of the interfaces.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlNetworks {
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<u8>,
    #[serde(default)]
    #[allow(dead_code)]
    renderer: Option<String>,
    #[serde(default)]
    ethernets: serde_yaml::Mapping,
    #[serde(default)]
    vlans: serde_yaml::Mapping,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct YamlInterface {
    id: Option<u16>,
    link: Option<String>,
    dhcp4: Option<bool>,
    dhcp6: Option<bool>,
    #[serde(default)]
    addresses: Vec<IpAddress>,
    gateway4: Option<IpAddress>,
    gateway6: Option<IpAddress>,
    mtu: Option<u32>,
    macaddress: Option<MacAddress>,
    optional: Option<bool>,
    nameservers: Option<YamlNameservers>,
    #[serde(default)]
    ntp: Vec<String>,
    #[serde(default)]
    routes: Vec<YamlRoute>,
    #[serde(default)]
    routing_policy: Vec<YamlRule>,
    link_local: Option<Vec<String>>,
    accept_ra: Option<bool>,
    ipv6_mtu: Option<u32>,
    dhcp4_overrides: Option<YamlDhcpOverrides>,
    dhcp6_overrides: Option<YamlDhcpOverrides>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlNameservers {
    #[serde(default)]
    addresses: Vec<IpAddress>,
    #[serde(default)]
    search: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct YamlRoute {
    to: Option<String>,
    via: Option<IpAddress>,
    from: Option<IpAddress>,
    metric: Option<u32>,
    table: Option<RouteTable>,
    mtu: Option<u32>,
    scope: Option<RouteScope>,
    #[serde(rename = "type")]
    route_type: Option<RouteType>,
    #[serde(default)]
    on_link: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct YamlRule {
    from: Option<IpAddress>,
    to: Option<IpAddress>,
    table: u32,
    priority: Option<u32>,
    type_of_service: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct YamlDhcpOverrides {
    use_dns: Option<bool>,
    use_ntp: Option<bool>,
}

/// Parse a YAML document into one [Network] per declared interface:
/// ethernets first, then VLANs, each in declaration order. Nothing is
/// returned when any interface is malformed.
pub fn parse_networks(content: &str) -> Result<Vec<Network>, NcmError> {
    let doc: YamlDocument = serde_yaml::from_str(content)?;
    let mut networks = Vec::new();
    for (name, value) in doc.network.ethernets {
        let (name, iface) = interface_entry(name, value)?;
        if iface.id.is_some() || iface.link.is_some() {
            return Err(NcmError::invalid(
                "id and link are only valid for VLANs".to_string(),
            )
            .with_iface(&name));
        }
        networks.push(iface.into_network(&name)?);
    }
    for (name, value) in doc.network.vlans {
        let (name, iface) = interface_entry(name, value)?;
        let (Some(id), Some(link)) = (iface.id, iface.link.as_deref()) else {
            return Err(NcmError::invalid(
                "VLAN requires both id and link".to_string(),
            )
            .with_iface(&name));
        };
        let vlan = InterfaceHandle::new(link)
            .and_then(|parent| VlanDescriptor::new(&name, id, parent))
            .map_err(|e| e.with_iface(&name))?;
        let Some(parent) = networks.iter_mut().find(|n| n.name == link) else {
            return Err(NcmError::invalid(format!(
                "VLAN link {link} is not a declared ethernet"
            ))
            .with_iface(&name));
        };
        parent.vlans.push(vlan);
        networks.push(iface.into_network(&name)?);
    }
    log::debug!("Parsed {} networks from YAML", networks.len());
    Ok(networks)
}

fn interface_entry(
    name: serde_yaml::Value,
    value: serde_yaml::Value,
) -> Result<(String, YamlInterface), NcmError> {
    let serde_yaml::Value::String(name) = name else {
        return Err(NcmError::invalid(format!(
            "Interface name should be a string, got {name:?}"
        )));
    };
    // `eth0: {}` and `eth0:` are both an interface without settings
    let iface = if value.is_null() {
        YamlInterface::default()
    } else {
        serde_yaml::from_value(value)
            .map_err(|e| NcmError::from(e).with_iface(&name))?
    };
    Ok((name, iface))
}

impl YamlInterface {
    fn into_network(self, name: &str) -> Result<Network, NcmError> {
        self.to_network(name).map_err(|e| e.with_iface(name))
    }

    fn to_network(&self, name: &str) -> Result<Network, NcmError> {
        let mut network = Network::new(name)?;
        network.dhcp = match (self.dhcp4, self.dhcp6) {
            (None, None) => None,
            (Some(true), Some(true)) => Some(DhcpClientMode::Yes),
            (Some(true), _) => Some(DhcpClientMode::Ipv4),
            (_, Some(true)) => Some(DhcpClientMode::Ipv6),
            _ => Some(DhcpClientMode::No),
        };
        network.link.mtu = self.mtu;
        network.link.mac = self.macaddress;
        network.link.required_for_online = self.optional.map(|o| !o);
        network.addresses =
            self.addresses.iter().copied().map(AddressConfig::new).collect();
        for gateway in [self.gateway4, self.gateway6].into_iter().flatten() {
            network.routes.push(Route::default_gateway(gateway));
        }
        if let Some(ns) = self.nameservers.as_ref() {
            network.dns = ns.addresses.clone();
            network.domains = ns.search.clone();
        }
        network.ntp = self.ntp.clone();
        for route in &self.routes {
            network.routes.push(route.to_route()?);
        }
        for rule in &self.routing_policy {
            let mut r = RoutingPolicyRule::new(rule.table);
            r.from = rule.from;
            r.to = rule.to;
            r.priority = rule.priority;
            r.tos = rule.type_of_service;
            network.routing_policy_rules.push(r);
        }
        if let Some(families) = self.link_local.as_ref() {
            network.link_local_addressing =
                Some(link_local_addressing(families)?);
        }
        network.ipv6_accept_ra = self.accept_ra;
        network.ipv6_mtu = self.ipv6_mtu;
        for (family, overrides) in [
            (DhcpFamily::V4, self.dhcp4_overrides.as_ref()),
            (DhcpFamily::V6, self.dhcp6_overrides.as_ref()),
        ] {
            if let Some(o) = overrides {
                let cfg = network.dhcp_client_mut(family);
                cfg.use_dns = o.use_dns;
                cfg.use_ntp = o.use_ntp;
            }
        }
        network.validate()?;
        Ok(network)
    }
}

impl YamlRoute {
    fn to_route(&self) -> Result<Route, NcmError> {
        let destination = match self.to.as_deref() {
            None | Some("default" | "0.0.0.0/0" | "::/0") => None,
            Some(to) => Some(to.parse::<IpAddress>()?),
        };
        Ok(Route {
            gateway: self.via,
            destination,
            preferred_source: self.from,
            metric: self.metric,
            table: self.table,
            mtu: self.mtu,
            scope: self.scope,
            route_type: self.route_type,
            onlink: self.on_link,
            ..Default::default()
        })
    }
}

fn link_local_addressing(
    families: &[String],
) -> Result<LinkLocalAddressing, NcmError> {
    let mut v4 = false;
    let mut v6 = false;
    for family in families {
        match family.as_str() {
            "ipv4" => v4 = true,
            "ipv6" => v6 = true,
            _ => {
                return Err(NcmError::invalid(format!(
                    "Invalid link-local family {family}, valid values are: \
                     ipv4, ipv6"
                )));
            }
        }
    }
    Ok(match (v4, v6) {
        (true, true) => LinkLocalAddressing::Yes,
        (true, false) => LinkLocalAddressing::Ipv4,
        (false, true) => LinkLocalAddressing::Ipv6,
        (false, false) => LinkLocalAddressing::No,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_ethernet() {
        let networks = parse_networks(
            r"
network:
  version: 2
  ethernets:
    eth1:
      dhcp4: true
      dhcp6: false
      mtu: 9000
    eth0:
      addresses: [192.0.2.10/24]
      gateway4: 192.0.2.1
      link-local: []
",
        )
        .unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].name, "eth1");
        assert_eq!(networks[0].dhcp, Some(DhcpClientMode::Ipv4));
        assert_eq!(networks[0].link.mtu, Some(9000));
        assert_eq!(networks[1].name, "eth0");
        assert_eq!(
            networks[1].routes,
            vec![Route::default_gateway("192.0.2.1".parse().unwrap())]
        );
        assert_eq!(
            networks[1].link_local_addressing,
            Some(LinkLocalAddressing::No)
        );
    }

    #[test]
    fn test_parse_vlan_attached_to_parent() {
        let networks = parse_networks(
            r"
network:
  ethernets:
    eth0: {}
  vlans:
    vlan10:
      id: 10
      link: eth0
      addresses: [198.51.100.2/24]
",
        )
        .unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].vlans.len(), 1);
        assert_eq!(networks[0].vlans[0].id, 10);
        assert_eq!(networks[1].name, "vlan10");
        assert_eq!(networks[1].addresses.len(), 1);
    }

    #[test]
    fn test_unknown_key() {
        let e = parse_networks(
            r"
network:
  ethernets:
    eth0:
      dhcp5: true
",
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
        assert_eq!(e.iface(), Some("eth0"));
    }

    #[test]
    fn test_invalid_prefix() {
        let e = parse_networks(
            r"
network:
  ethernets:
    eth0:
      addresses: [192.0.2.10/33]
",
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_vlan_unknown_link() {
        let e = parse_networks(
            r"
network:
  vlans:
    vlan10:
      id: 10
      link: eth9
",
        )
        .unwrap_err();
        assert_eq!(e.iface(), Some("vlan10"));
    }
}
