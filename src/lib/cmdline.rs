// SPDX-License-Identifier: Apache-2.0

//! Dracut style network options of the kernel command line:
//!
//! * `ip=<client-IP>:[<peer>]:<gateway-IP>:<netmask>:<hostname>:<interface>:
//!   <autoconf>[:[<mtu>][:<macaddr>]]` or `...:<autoconf>[:<dns1>][:<dns2>]`
//! * `ip=<interface>:<autoconf>[:[<mtu>][:<macaddr>]]`
//! * `ip=<autoconf>`, applied to every interface but loopback
//! * `nameserver=<IP>`, applied to every interface
//! * `rd.route=<net>/<prefix>:<gateway>[:<interface>]`
//!
//! IPv6 addresses are written in brackets, e.g. `[2001:db8::1]`.

use std::net::{IpAddr, Ipv4Addr};

use crate::{
    model::ANY_IFACE, AddressConfig, DhcpClientMode, IpAddress,
    LinkLocalAddressing, MacAddress, NcmError, Network, Route,
};

const KEY_IP: &str = "ip";
const KEY_NAMESERVER: &str = "nameserver";
const KEY_ROUTE: &str = "rd.route";

const AUTOCONF_METHODS: [&str; 8] =
    ["none", "off", "dhcp", "on", "any", "dhcp6", "auto6", "link6"];

/// Networks declared by the `ip=` options of `line`, in order of first
/// appearance. Options unrelated to networking are ignored.
pub fn parse_networks(line: &str) -> Result<Vec<Network>, NcmError> {
    let mut networks: Vec<Network> = Vec::new();
    let mut nameservers = Vec::new();
    let mut routes = Vec::new();

    for option in line.split_whitespace() {
        let Some((key, value)) = option.split_once('=') else {
            continue;
        };
        match key {
            KEY_IP => {
                let (name, apply) = parse_ip_option(value)?;
                let pos = match networks.iter().position(|n| n.name == name) {
                    Some(pos) => pos,
                    None => {
                        networks.push(Network::new(&name)?);
                        networks.len() - 1
                    }
                };
                apply
                    .apply(&mut networks[pos])
                    .map_err(|e| e.with_iface(&name))?;
            }
            KEY_NAMESERVER => {
                nameservers.push(parse_ip(value)?);
            }
            KEY_ROUTE => {
                routes.push(parse_route_option(value)?);
            }
            _ => {
                log::trace!("Ignoring kernel option {option}");
            }
        }
    }

    for (route, iface) in routes {
        let network = match iface {
            Some(name) => networks.iter_mut().find(|n| n.name == name),
            None if networks.len() == 1 => networks.first_mut(),
            None => None,
        };
        let Some(network) = network else {
            return Err(NcmError::invalid(format!(
                "Cannot determine the interface of {KEY_ROUTE} to {}",
                route
                    .destination
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            )));
        };
        network.routes.push(route);
    }
    for network in networks.iter_mut() {
        for dns in &nameservers {
            if !network.dns.contains(dns) {
                network.dns.push(*dns);
            }
        }
        network.validate()?;
    }
    log::debug!(
        "Parsed {} networks from kernel command line",
        networks.len()
    );
    Ok(networks)
}

#[derive(Debug, Default)]
struct IpOption {
    address: Option<IpAddress>,
    peer: Option<IpAddress>,
    gateway: Option<IpAddress>,
    autoconf: Option<String>,
    mtu: Option<u32>,
    mac: Option<MacAddress>,
    dns: Vec<IpAddress>,
}

impl IpOption {
    fn apply(self, network: &mut Network) -> Result<(), NcmError> {
        if let Some(address) = self.address {
            let mut cfg = AddressConfig::new(address);
            cfg.peer = self.peer;
            network.addresses.push(cfg);
        }
        if let Some(gateway) = self.gateway {
            network.routes.push(Route::default_gateway(gateway));
        }
        if let Some(autoconf) = self.autoconf.as_deref() {
            apply_autoconf(network, autoconf)?;
        }
        if self.mtu.is_some() {
            network.link.mtu = self.mtu;
        }
        if self.mac.is_some() {
            network.link.mac = self.mac;
        }
        network.dns.extend(self.dns);
        Ok(())
    }
}

fn apply_autoconf(
    network: &mut Network,
    autoconf: &str,
) -> Result<(), NcmError> {
    match autoconf {
        "" | "none" | "off" => {
            network.dhcp = Some(DhcpClientMode::No);
        }
        "dhcp" => {
            network.dhcp = Some(DhcpClientMode::Ipv4);
        }
        "on" | "any" => {
            network.dhcp = Some(DhcpClientMode::Yes);
        }
        "dhcp6" => {
            network.dhcp = Some(DhcpClientMode::Ipv6);
        }
        "auto6" => {
            network.ipv6_accept_ra = Some(true);
        }
        "link6" => {
            network.link_local_addressing = Some(LinkLocalAddressing::Ipv6);
        }
        _ => {
            return Err(NcmError::invalid(format!(
                "Unsupported autoconf method {autoconf}, valid values are: \
                 none, off, dhcp, on, any, dhcp6, auto6, link6"
            )));
        }
    }
    Ok(())
}

fn parse_ip_option(value: &str) -> Result<(String, IpOption), NcmError> {
    let fields = split_fields(value)?;
    let mut opt = IpOption::default();
    if fields.len() == 1 && is_autoconf(fields[0]) {
        opt.autoconf = Some(fields[0].to_string());
        return Ok((ANY_IFACE.to_string(), opt));
    }
    if fields.len() >= 2 && is_autoconf(fields[1]) {
        // <interface>:<autoconf>[:[<mtu>][:<macaddr>]]
        opt.autoconf = Some(fields[1].to_string());
        opt.mtu = parse_opt(fields.get(2).copied(), "MTU")?;
        opt.mac = parse_mac(&fields[fields.len().min(3)..])?;
        return Ok((iface_name(fields[0], value)?, opt));
    }
    if fields.len() < 7 {
        return Err(NcmError::invalid(format!(
            "{KEY_IP}={value} does not name an interface"
        )));
    }
    opt.address = non_empty(fields[0]).map(parse_ip).transpose()?;
    opt.peer = non_empty(fields[1]).map(parse_ip).transpose()?;
    opt.gateway = non_empty(fields[2]).map(parse_ip).transpose()?;
    if let (Some(address), Some(mask)) = (opt.address, non_empty(fields[3])) {
        opt.address =
            Some(IpAddress::new(address.addr(), parse_netmask(mask)?)?);
    }
    opt.autoconf = Some(fields[6].to_string());
    let extra = &fields[7..];
    if extra.first().is_some_and(|f| is_ip(f)) {
        // ...:<autoconf>[:<dns1>][:<dns2>]
        for dns in extra.iter().copied().filter_map(non_empty) {
            opt.dns.push(parse_ip(dns)?);
        }
    } else {
        opt.mtu = parse_opt(extra.first().copied(), "MTU")?;
        opt.mac = parse_mac(&extra[extra.len().min(1)..])?;
    }
    Ok((iface_name(fields[5], value)?, opt))
}

fn is_autoconf(field: &str) -> bool {
    AUTOCONF_METHODS.contains(&field)
}

// The MAC address itself contains `:`, so it spans the remaining fields.
fn parse_mac(fields: &[&str]) -> Result<Option<MacAddress>, NcmError> {
    let mac = fields.join(":");
    parse_opt(Some(mac.as_str()), "MAC address")
}

// `<net>/<prefix>:<gateway>[:<interface>]`
fn parse_route_option(
    value: &str,
) -> Result<(Route, Option<String>), NcmError> {
    let fields = split_fields(value)?;
    if !(2..=3).contains(&fields.len()) {
        return Err(NcmError::invalid(format!(
            "Invalid {KEY_ROUTE}={value}, expecting \
             <net>/<prefix>:<gateway>[:<interface>]"
        )));
    }
    let destination: IpAddress = fields[0].parse()?;
    let route = Route {
        destination: Some(destination),
        gateway: non_empty(fields[1]).map(parse_ip).transpose()?,
        ..Default::default()
    };
    Ok((route, fields.get(2).copied().and_then(non_empty).map(String::from)))
}

// Split on `:` outside of `[...]`, dropping the brackets.
fn split_fields(value: &str) -> Result<Vec<&str>, NcmError> {
    let mut fields = Vec::new();
    let mut rest = value;
    loop {
        if let Some(inner) = rest.strip_prefix('[') {
            let Some(end) = inner.find(']') else {
                return Err(NcmError::invalid(format!(
                    "Unbalanced bracket in {value}"
                )));
            };
            fields.push(&inner[..end]);
            rest = &inner[end + 1..];
            match rest.strip_prefix(':') {
                Some(r) => rest = r,
                None if rest.is_empty() => return Ok(fields),
                None => {
                    return Err(NcmError::invalid(format!(
                        "Expecting ':' after ']' in {value}"
                    )));
                }
            }
        } else {
            match rest.split_once(':') {
                Some((field, r)) => {
                    fields.push(field);
                    rest = r;
                }
                None => {
                    fields.push(rest);
                    return Ok(fields);
                }
            }
        }
    }
}

fn non_empty(field: &str) -> Option<&str> {
    if field.is_empty() {
        None
    } else {
        Some(field)
    }
}

fn parse_opt<T: std::str::FromStr>(
    field: Option<&str>,
    what: &str,
) -> Result<Option<T>, NcmError> {
    match field.and_then(non_empty) {
        Some(v) => v.parse::<T>().map(Some).map_err(|_| {
            NcmError::invalid(format!("Invalid {what} '{v}'"))
        }),
        None => Ok(None),
    }
}

fn iface_name(field: &str, value: &str) -> Result<String, NcmError> {
    non_empty(field).map(String::from).ok_or_else(|| {
        NcmError::invalid(format!(
            "{KEY_IP}={value} does not name an interface"
        ))
    })
}

fn is_ip(field: &str) -> bool {
    field.parse::<IpAddr>().is_ok()
}

fn parse_ip(field: &str) -> Result<IpAddress, NcmError> {
    Ok(IpAddress::host(field.parse::<IpAddr>()?))
}

// Dotted quad mask or plain prefix length
fn parse_netmask(mask: &str) -> Result<u8, NcmError> {
    if let Ok(prefix) = mask.parse::<u8>() {
        return Ok(prefix);
    }
    let bits = u32::from(mask.parse::<Ipv4Addr>()?);
    if bits.leading_ones() + bits.trailing_zeros() != 32 {
        return Err(NcmError::invalid(format!(
            "Netmask {mask} is not contiguous"
        )));
    }
    // leading_ones() is at most 32
    Ok(bits.leading_ones() as u8)
}
