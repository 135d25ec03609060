// SPDX-License-Identifier: Apache-2.0

use super::encode::{
    address_section, gateway_section, is_address_section_of,
    is_route_section_of, route_section, rule_section, SECTION_ROUTE,
    SECTION_RULE,
};
use super::ConfigPersister;
use crate::{
    AddressConfig, InterfaceHandle, IpAddress, NcmError, Route,
    RoutingPolicyRule, Section,
};

impl ConfigPersister {
    /// Write the minimal `[Route]` holding only `Gateway=` (and
    /// `GatewayOnLink=yes` for on-link gateways). Replaces the previous
    /// default gateway of the same family.
    pub fn configure_default_gateway(
        &self,
        iface: &InterfaceHandle,
        route: &Route,
    ) -> Result<(), NcmError> {
        route.validate().map_err(|e| e.with_iface(iface.name()))?;
        if !route.is_default() {
            return Err(NcmError::invalid(
                "Default gateway should have gateway but no destination"
                    .to_string(),
            )
            .with_iface(iface.name()));
        }
        let family = route.family();
        self.modify_network(iface, true, |sb| {
            sb.replace_or_push(gateway_section(route), |s| {
                is_minimal_gateway_section(s)
                    && gateway_family(s) == family.map(|f| f.to_string())
            });
            Ok(())
        })
    }

    /// Write one `[Route]`. A route which is nothing but a default gateway
    /// is written as the minimal gateway section.
    pub fn configure_route(
        &self,
        iface: &InterfaceHandle,
        route: &Route,
    ) -> Result<(), NcmError> {
        if route.is_plain_default() {
            return self.configure_default_gateway(iface, route);
        }
        route.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.modify_network(iface, true, |sb| {
            sb.replace_or_push(route_section(route), |s| {
                is_route_section_of(s, route)
            });
            Ok(())
        })
    }

    /// Source routing through an additional gateway: `address` on the
    /// interface, a default route through `route.gateway` in `table`, and
    /// rules steering traffic from and to `address` into that table.
    pub fn configure_additional_gateway(
        &self,
        iface: &InterfaceHandle,
        address: &IpAddress,
        route: &Route,
    ) -> Result<(), NcmError> {
        let table = route.table.ok_or_else(|| {
            NcmError::invalid(
                "Additional gateway requires a route table".to_string(),
            )
            .with_iface(iface.name())
        })?;
        let addr_cfg = AddressConfig::new(*address);
        let host = IpAddress::host(address.addr());
        let mut from_rule = RoutingPolicyRule::new(table.id());
        from_rule.from = Some(host);
        let mut to_rule = RoutingPolicyRule::new(table.id());
        to_rule.to = Some(host);

        addr_cfg.validate().map_err(|e| e.with_iface(iface.name()))?;
        route.validate().map_err(|e| e.with_iface(iface.name()))?;
        if route.family() != Some(address.family()) {
            return Err(NcmError::invalid(format!(
                "Gateway of additional route is not in the same family as \
                 {address}"
            ))
            .with_iface(iface.name()));
        }

        self.modify_network(iface, true, |sb| {
            sb.replace_or_push(address_section(&addr_cfg), |s| {
                is_address_section_of(s, &addr_cfg)
            });
            let mut section = route_section(route);
            if route.is_plain_default() {
                section.set("Table", table.to_string().as_str());
            }
            sb.replace_or_push(section, |s| {
                is_route_section_of(s, route)
                    && s.get("Table") == Some(table.to_string().as_str())
            });
            for rule in [&from_rule, &to_rule] {
                let section = rule_section(rule);
                sb.replace_or_push(section.clone(), |s| s == &section);
            }
            Ok(())
        })
    }

    /// Remove the default gateway sections (`gateway == true`) or every
    /// other `[Route]` (`gateway == false`).
    pub fn remove_gateway_or_route(
        &self,
        iface: &InterfaceHandle,
        gateway: bool,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            let removed = sb.remove_sections_if(SECTION_ROUTE, |s| {
                is_gateway_section(s) == gateway
            });
            log::debug!(
                "Removed {removed} {} section(s)",
                if gateway { "gateway" } else { "route" }
            );
            Ok(())
        })
    }

    pub fn configure_routing_policy_rule(
        &self,
        iface: &InterfaceHandle,
        rule: &RoutingPolicyRule,
    ) -> Result<(), NcmError> {
        rule.validate().map_err(|e| e.with_iface(iface.name()))?;
        let section = rule_section(rule);
        self.modify_network(iface, true, |sb| {
            sb.replace_or_push(section.clone(), |s| s == &section);
            Ok(())
        })
    }

    /// Routing policy rules persisted for the interface.
    pub fn read_routing_policy_rules(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<Vec<RoutingPolicyRule>, NcmError> {
        let sections = self.read_network(iface)?;
        sections
            .sections_named(SECTION_RULE)
            .map(parse_rule_section)
            .collect::<Result<Vec<_>, NcmError>>()
            .map_err(|e| e.with_iface(iface.name()))
    }

    /// Remove every `[RoutingPolicyRule]` of the interface.
    pub fn remove_routing_policy_rules(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            sb.remove_sections(SECTION_RULE);
            Ok(())
        })
    }
}

// Gateway without destination, whatever else the section holds
fn is_gateway_section(section: &Section) -> bool {
    section.get("Gateway").is_some() && section.get("Destination").is_none()
}

fn is_minimal_gateway_section(section: &Section) -> bool {
    is_gateway_section(section)
        && section
            .entries()
            .all(|(k, _)| k == "Gateway" || k == "GatewayOnLink")
}

fn gateway_family(section: &Section) -> Option<String> {
    section
        .get("Gateway")
        .and_then(|g| g.parse::<IpAddress>().ok())
        .map(|g| g.family().to_string())
}

fn parse_rule_section(
    section: &Section,
) -> Result<RoutingPolicyRule, NcmError> {
    fn parse<T: std::str::FromStr>(
        section: &Section,
        key: &str,
    ) -> Result<Option<T>, NcmError> {
        section
            .get(key)
            .map(|v| {
                v.parse::<T>().map_err(|_| {
                    NcmError::invalid(format!(
                        "Invalid {key}={v} in [{}]",
                        section.name()
                    ))
                })
            })
            .transpose()
    }
    let table: Option<u32> = parse(section, "Table")?;
    let mut rule = RoutingPolicyRule::new(table.unwrap_or_default());
    rule.from = parse(section, "From")?;
    rule.to = parse(section, "To")?;
    rule.priority = parse(section, "Priority")?;
    rule.tos = parse(section, "TypeOfService")?;
    rule.input_interface = parse(section, "IncomingInterface")?;
    rule.output_interface = parse(section, "OutgoingInterface")?;
    Ok(rule)
}
