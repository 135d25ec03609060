// SPDX-License-Identifier: Apache-2.0

use ncm::{
    InterfaceHandle, IpAddress, Ipv6RoutePreference, Route, RouteProtocol,
    RouteScope, RouteTable, RouteType, RoutingPolicyRule,
};

use crate::context::{
    device, device_arg, option_arg, parse, parse_opt, value_arg,
};
use crate::{CliContext, CliError};

const CMD_ADD_GATEWAY: &str = "add-default-gateway";
const CMD_ADD_ROUTE: &str = "add-route";
const CMD_ADD_ADDITIONAL_GATEWAY: &str = "add-additional-gateway";
const CMD_REMOVE_GATEWAY: &str = "remove-gateway";
const CMD_REMOVE_ROUTE: &str = "remove-route";
const CMD_ADD_RULE: &str = "add-rule";
const CMD_REMOVE_RULE: &str = "remove-rule";

pub(crate) struct CommandRoute;

impl CommandRoute {
    pub(crate) const VERBS: &'static [&'static str] = &[
        CMD_ADD_GATEWAY,
        CMD_ADD_ROUTE,
        CMD_ADD_ADDITIONAL_GATEWAY,
        CMD_REMOVE_GATEWAY,
        CMD_REMOVE_ROUTE,
        CMD_ADD_RULE,
        CMD_REMOVE_RULE,
    ];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_ADD_GATEWAY)
                .alias("gw")
                .about("Set the default gateway, persisted and applied")
                .arg(device_arg())
                .arg(value_arg("GATEWAY", "Gateway address"))
                .arg(onlink_arg()),
            clap::Command::new(CMD_ADD_ROUTE)
                .alias("route")
                .about("Add static route, persisted and applied")
                .arg(device_arg())
                .arg(option_arg("gateway", "Gateway address"))
                .arg(option_arg("destination", "Destination prefix"))
                .arg(option_arg("source", "Source prefix"))
                .arg(option_arg("pref-source", "Preferred source address"))
                .arg(option_arg("metric", "Route metric"))
                .arg(option_arg("table", "default, main, local or number"))
                .arg(option_arg("mtu", "Route MTU"))
                .arg(option_arg("scope", "global, site, link or host"))
                .arg(option_arg("type", "unicast, blackhole, unreachable..."))
                .arg(option_arg("protocol", "kernel, boot, static, ra or dhcp"))
                .arg(option_arg("preference", "IPv6 only: low, medium, high"))
                .arg(onlink_arg()),
            clap::Command::new(CMD_ADD_ADDITIONAL_GATEWAY)
                .alias("additional-gw")
                .about(
                    "Add address, gateway and policy rules of a secondary \
                     routing table",
                )
                .arg(device_arg())
                .arg(value_arg("ADDRESS", "Address with prefix length"))
                .arg(value_arg("GATEWAY", "Gateway address"))
                .arg(value_arg("TABLE", "Routing table number")),
            clap::Command::new(CMD_REMOVE_GATEWAY)
                .alias("del-gw")
                .about("Remove persisted gateways")
                .arg(device_arg()),
            clap::Command::new(CMD_REMOVE_ROUTE)
                .alias("del-route")
                .about("Remove persisted static routes")
                .arg(device_arg()),
            clap::Command::new(CMD_ADD_RULE)
                .alias("rule")
                .about("Add routing policy rule, persisted and applied")
                .arg(device_arg())
                .arg(
                    option_arg("table", "Routing table number")
                        .required(true),
                )
                .arg(option_arg("from", "Source prefix"))
                .arg(option_arg("to", "Destination prefix"))
                .arg(option_arg("priority", "Rule priority"))
                .arg(option_arg("tos", "Type of service"))
                .arg(option_arg("iif", "Incoming interface"))
                .arg(option_arg("oif", "Outgoing interface")),
            clap::Command::new(CMD_REMOVE_RULE)
                .alias("del-rule")
                .about("Remove routing policy rules, persisted and applied")
                .arg(device_arg()),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let iface = device(matches)?;
        match verb {
            CMD_ADD_GATEWAY => {
                let mut route =
                    Route::default_gateway(parse(matches, "GATEWAY")?);
                route.onlink = matches.get_flag("onlink");
                ctx.manager().await?.configure_route(&iface, &route).await?;
            }
            CMD_ADD_ROUTE => {
                let route = route_from_args(matches)?;
                ctx.manager().await?.configure_route(&iface, &route).await?;
            }
            CMD_ADD_ADDITIONAL_GATEWAY => {
                let address: IpAddress = parse(matches, "ADDRESS")?;
                let mut route =
                    Route::default_gateway(parse(matches, "GATEWAY")?);
                route.table = Some(parse::<RouteTable>(matches, "TABLE")?);
                ctx.manager()
                    .await?
                    .configure_additional_gateway(&iface, &address, &route)
                    .await?;
            }
            CMD_REMOVE_GATEWAY => {
                ctx.persister().remove_gateway_or_route(&iface, true)?;
            }
            CMD_REMOVE_ROUTE => {
                ctx.persister().remove_gateway_or_route(&iface, false)?;
            }
            CMD_ADD_RULE => {
                let rule = rule_from_args(matches)?;
                ctx.manager()
                    .await?
                    .configure_routing_policy_rule(&iface, &rule)
                    .await?;
            }
            CMD_REMOVE_RULE => {
                ctx.manager()
                    .await?
                    .remove_routing_policy_rules(&iface)
                    .await?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}

fn onlink_arg() -> clap::Arg {
    clap::Arg::new("onlink")
        .long("onlink")
        .action(clap::ArgAction::SetTrue)
        .help("Gateway is directly reachable even without matching prefix")
}

fn route_from_args(matches: &clap::ArgMatches) -> Result<Route, CliError> {
    let mut route = Route::default();
    route.gateway = parse_opt(matches, "gateway")?;
    route.destination = parse_opt(matches, "destination")?;
    route.source = parse_opt(matches, "source")?;
    route.preferred_source = parse_opt(matches, "pref-source")?;
    route.metric = parse_opt(matches, "metric")?;
    route.table = parse_opt::<RouteTable>(matches, "table")?;
    route.mtu = parse_opt(matches, "mtu")?;
    route.scope = parse_opt::<RouteScope>(matches, "scope")?;
    route.route_type = parse_opt::<RouteType>(matches, "type")?;
    route.protocol = parse_opt::<RouteProtocol>(matches, "protocol")?;
    route.preference =
        parse_opt::<Ipv6RoutePreference>(matches, "preference")?;
    route.onlink = matches.get_flag("onlink");
    if route.gateway.is_none() && route.destination.is_none() {
        return Err(CliError::from("Route requires --gateway or --destination"));
    }
    Ok(route)
}

fn rule_from_args(
    matches: &clap::ArgMatches,
) -> Result<RoutingPolicyRule, CliError> {
    let mut rule = RoutingPolicyRule::new(parse(matches, "table")?);
    rule.from = parse_opt(matches, "from")?;
    rule.to = parse_opt(matches, "to")?;
    rule.priority = parse_opt(matches, "priority")?;
    rule.tos = parse_opt(matches, "tos")?;
    rule.input_interface = parse_opt::<String>(matches, "iif")?
        .map(|n| InterfaceHandle::new(&n))
        .transpose()?;
    rule.output_interface = parse_opt::<String>(matches, "oif")?
        .map(|n| InterfaceHandle::new(&n))
        .transpose()?;
    Ok(rule)
}
