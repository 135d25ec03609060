// SPDX-License-Identifier: Apache-2.0

use ncm::{Dhcpv4ServerConfig, Ipv6RaPreference, RouterAdvertisementConfig};

use crate::context::{device, device_arg, option_arg, parse_bool_opt, parse_opt};
use crate::{CliContext, CliError};

const CMD_ADD_DHCP_SERVER: &str = "add-dhcpv4-server";
const CMD_REMOVE_DHCP_SERVER: &str = "remove-dhcpv4-server";
const CMD_ADD_IPV6RA: &str = "add-ipv6ra";
const CMD_REMOVE_IPV6RA: &str = "remove-ipv6ra";

pub(crate) struct CommandService;

impl CommandService {
    pub(crate) const VERBS: &'static [&'static str] = &[
        CMD_ADD_DHCP_SERVER,
        CMD_REMOVE_DHCP_SERVER,
        CMD_ADD_IPV6RA,
        CMD_REMOVE_IPV6RA,
    ];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_ADD_DHCP_SERVER)
                .alias("dhcpv4-server")
                .about("Run DHCPv4 server on interface")
                .arg(device_arg())
                .arg(option_arg("pool-offset", "First offered host"))
                .arg(option_arg("pool-size", "Number of offered addresses"))
                .arg(option_arg("default-lease-time", "Seconds"))
                .arg(option_arg("max-lease-time", "Seconds"))
                .arg(option_arg("emit-dns", "yes or no"))
                .arg(option_arg("dns", "Offered DNS server"))
                .arg(option_arg("emit-ntp", "yes or no"))
                .arg(option_arg("ntp", "Offered NTP server"))
                .arg(option_arg("emit-router", "yes or no")),
            clap::Command::new(CMD_REMOVE_DHCP_SERVER)
                .alias("del-dhcpv4-server")
                .about("Stop DHCPv4 server on interface")
                .arg(device_arg()),
            clap::Command::new(CMD_ADD_IPV6RA)
                .alias("ipv6ra")
                .about("Send IPv6 router advertisements on interface")
                .arg(device_arg())
                .arg(option_arg("prefix", "Announced prefix"))
                .arg(option_arg("route-prefix", "Announced route prefix"))
                .arg(option_arg("dns", "Announced DNS server"))
                .arg(option_arg("domain", "Announced search domain"))
                .arg(option_arg("pref-lifetime", "Seconds"))
                .arg(option_arg("valid-lifetime", "Seconds"))
                .arg(option_arg("dns-lifetime", "Seconds"))
                .arg(option_arg("route-lifetime", "Seconds"))
                .arg(option_arg("preference", "low, medium or high"))
                .arg(option_arg("managed", "yes or no"))
                .arg(option_arg("other", "yes or no"))
                .arg(option_arg("emit-dns", "yes or no"))
                .arg(option_arg("emit-domain", "yes or no"))
                .arg(option_arg("assign", "yes or no")),
            clap::Command::new(CMD_REMOVE_IPV6RA)
                .alias("del-ipv6ra")
                .about("Stop IPv6 router advertisements on interface")
                .arg(device_arg()),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let iface = device(matches)?;
        let mut manager = ctx.manager().await?;
        match verb {
            CMD_ADD_DHCP_SERVER => {
                let cfg = dhcp_server_from_args(matches)?;
                manager.configure_dhcpv4_server(&iface, &cfg).await?;
            }
            CMD_REMOVE_DHCP_SERVER => {
                manager.remove_dhcpv4_server(&iface).await?;
            }
            CMD_ADD_IPV6RA => {
                let cfg = ra_from_args(matches)?;
                manager.configure_router_advertisement(&iface, &cfg).await?;
            }
            CMD_REMOVE_IPV6RA => {
                manager.remove_router_advertisement(&iface).await?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}

fn dhcp_server_from_args(
    matches: &clap::ArgMatches,
) -> Result<Dhcpv4ServerConfig, CliError> {
    let mut cfg = Dhcpv4ServerConfig::default();
    cfg.pool_offset = parse_opt(matches, "pool-offset")?;
    cfg.pool_size = parse_opt(matches, "pool-size")?;
    cfg.default_lease_time = parse_opt(matches, "default-lease-time")?;
    cfg.max_lease_time = parse_opt(matches, "max-lease-time")?;
    cfg.emit_dns = parse_bool_opt(matches, "emit-dns")?;
    cfg.dns = parse_opt(matches, "dns")?;
    cfg.emit_ntp = parse_bool_opt(matches, "emit-ntp")?;
    cfg.ntp = parse_opt(matches, "ntp")?;
    cfg.emit_router = parse_bool_opt(matches, "emit-router")?;
    Ok(cfg)
}

fn ra_from_args(
    matches: &clap::ArgMatches,
) -> Result<RouterAdvertisementConfig, CliError> {
    let mut cfg = RouterAdvertisementConfig::default();
    cfg.prefix = parse_opt(matches, "prefix")?;
    cfg.route_prefix = parse_opt(matches, "route-prefix")?;
    cfg.dns = parse_opt(matches, "dns")?;
    cfg.domain = parse_opt(matches, "domain")?;
    cfg.preferred_lifetime = parse_opt(matches, "pref-lifetime")?;
    cfg.valid_lifetime = parse_opt(matches, "valid-lifetime")?;
    cfg.dns_lifetime = parse_opt(matches, "dns-lifetime")?;
    cfg.route_lifetime = parse_opt(matches, "route-lifetime")?;
    cfg.preference = parse_opt::<Ipv6RaPreference>(matches, "preference")?;
    cfg.managed = parse_bool_opt(matches, "managed")?;
    cfg.other_config = parse_bool_opt(matches, "other")?;
    cfg.emit_dns = parse_bool_opt(matches, "emit-dns")?;
    cfg.emit_domain = parse_bool_opt(matches, "emit-domain")?;
    cfg.assign = parse_bool_opt(matches, "assign")?;
    Ok(cfg)
}
