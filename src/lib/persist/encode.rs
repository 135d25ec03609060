// SPDX-License-Identifier: Apache-2.0

// Section encoders shared by the targeted operations and the whole file
// generation, so both always produce the same keys.

use crate::{
    model::ANY_IFACE, AddressConfig, DhcpClientConfig, DhcpFamily,
    Dhcpv4ServerConfig, LinkConfig, LinkState, Network, Route,
    RouterAdvertisementConfig, RoutingPolicyRule, Section, SectionBuilder,
    VlanDescriptor,
};

pub(crate) const SECTION_MATCH: &str = "Match";
pub(crate) const SECTION_LINK: &str = "Link";
pub(crate) const SECTION_NETWORK: &str = "Network";
pub(crate) const SECTION_ADDRESS: &str = "Address";
pub(crate) const SECTION_ROUTE: &str = "Route";
pub(crate) const SECTION_RULE: &str = "RoutingPolicyRule";
pub(crate) const SECTION_DHCP_SERVER: &str = "DHCPServer";
pub(crate) const SECTION_RA: &str = "IPv6SendRA";
pub(crate) const SECTION_RA_PREFIX: &str = "IPv6Prefix";
pub(crate) const SECTION_RA_ROUTE_PREFIX: &str = "IPv6RoutePrefix";

pub(crate) fn insert_match_section(sb: &mut SectionBuilder, name: &str) {
    let section = sb.new_section(SECTION_MATCH);
    section.set("Name", name);
    if name == ANY_IFACE {
        section.set("Type", "!loopback");
    }
}

pub(crate) fn link_section(
    link: &LinkConfig,
    state: Option<LinkState>,
) -> Section {
    let mut section = Section::new(SECTION_LINK);
    section
        .set_opt("MTUBytes", link.mtu)
        .set_opt("MACAddress", link.mac)
        .set_opt("Group", link.group)
        .set_opt_bool("ARP", link.arp)
        .set_opt_bool("Multicast", link.multicast)
        .set_opt_bool("AllMulticast", link.all_multicast)
        .set_opt_bool("Promiscuous", link.promiscuous)
        .set_opt_bool("RequiredForOnline", link.required_for_online)
        .set_opt("RequiredFamilyForOnline", link.required_family_for_online);
    match (link.activation_policy, state) {
        (Some(policy), _) => {
            section.set("ActivationPolicy", policy.as_str());
        }
        (None, Some(state)) => {
            section.set("ActivationPolicy", state.as_str());
        }
        (None, None) => (),
    }
    section.set_opt_bool("Unmanaged", link.unmanaged);
    section
}

fn join<T: std::fmt::Display>(values: &[T]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<String>>()
                .join(" "),
        )
    }
}

pub(crate) fn network_section(network: &Network) -> Section {
    let mut section = Section::new(SECTION_NETWORK);
    section
        .set_opt("DHCP", network.dhcp)
        .set_opt("LinkLocalAddressing", network.link_local_addressing)
        .set_opt_bool("IPv6AcceptRA", network.ipv6_accept_ra)
        .set_opt("IPv6MTUBytes", network.ipv6_mtu)
        .set_opt("DNS", join(&network.dns))
        .set_opt("Domains", join(&network.domains))
        .set_opt("NTP", join(&network.ntp));
    if network.dhcpv4_server.is_some() {
        section.set_bool("DHCPServer", true);
    }
    if network.router_advertisement.is_some() {
        section.set_bool("IPv6SendRA", true);
    }
    for vlan in &network.vlans {
        section.append("VLAN", vlan.name.as_str());
    }
    section
}

pub(crate) fn dhcp_client_section(
    family: DhcpFamily,
    cfg: &DhcpClientConfig,
) -> Section {
    let mut section = Section::new(family.section_name());
    section
        .set_opt("ClientIdentifier", cfg.client_identifier)
        .set_opt("IAID", cfg.iaid);
    if let Some(duid) = cfg.duid.as_ref().filter(|d| !d.persist_across_systems)
    {
        section
            .set("DUIDType", duid.duid_type.as_str())
            .set_opt("DUIDRawData", duid.raw_data.as_deref());
    }
    section
        .set_opt_bool("UseDNS", cfg.use_dns)
        .set_opt_bool("UseNTP", cfg.use_ntp);
    section
}

pub(crate) fn address_section(addr: &AddressConfig) -> Section {
    let mut section = Section::new(SECTION_ADDRESS);
    section
        .set("Address", addr.address.to_string().as_str())
        .set_opt("Peer", addr.peer)
        .set_opt("Scope", addr.scope)
        .set_opt("PreferredLifetime", addr.preferred_lifetime.as_deref())
        .set_opt(
            "DuplicateAddressDetection",
            addr.duplicate_address_detection,
        )
        .set_opt_bool("AddPrefixRoute", addr.prefix_route)
        .set_opt("Label", addr.label.as_deref());
    section
}

pub(crate) fn is_address_section_of(
    section: &Section,
    addr: &AddressConfig,
) -> bool {
    section.get("Address") == Some(addr.address.to_string().as_str())
}

/// Minimal `[Route]` of a default gateway.
pub(crate) fn gateway_section(route: &Route) -> Section {
    let mut section = Section::new(SECTION_ROUTE);
    section.set_opt("Gateway", route.gateway);
    if route.onlink {
        section.set_bool("GatewayOnLink", true);
    }
    section
}

/// `[Route]` of `route`, the minimal gateway section for plain default
/// routes.
pub(crate) fn route_section(route: &Route) -> Section {
    if route.is_plain_default() {
        return gateway_section(route);
    }
    let mut section = Section::new(SECTION_ROUTE);
    section.set_opt("Gateway", route.gateway);
    if route.onlink {
        section.set_bool("GatewayOnLink", true);
    }
    section
        .set_opt("Destination", route.destination)
        .set_opt("Source", route.source)
        .set_opt("PreferredSource", route.preferred_source)
        .set_opt("IPv6Preference", route.preference)
        .set_opt("Protocol", route.protocol)
        .set_opt("Scope", route.scope)
        .set_opt("Type", route.route_type)
        .set_opt("Table", route.table)
        .set_opt("MTUBytes", route.mtu)
        .set_opt("Metric", route.metric);
    section
}

/// Routes are identified by gateway plus destination.
pub(crate) fn is_route_section_of(section: &Section, route: &Route) -> bool {
    section.get("Gateway").map(|s| s.to_string())
        == route.gateway.map(|g| g.to_string())
        && section.get("Destination").map(|s| s.to_string())
            == route.destination.map(|d| d.to_string())
}

pub(crate) fn rule_section(rule: &RoutingPolicyRule) -> Section {
    let mut section = Section::new(SECTION_RULE);
    section
        .set_opt("TypeOfService", rule.tos)
        .set_opt("From", rule.from)
        .set_opt("To", rule.to)
        .set("Table", rule.table.to_string().as_str())
        .set_opt("Priority", rule.priority)
        .set_opt(
            "IncomingInterface",
            rule.input_interface.as_ref().map(|i| i.name()),
        )
        .set_opt(
            "OutgoingInterface",
            rule.output_interface.as_ref().map(|i| i.name()),
        );
    section
}

pub(crate) fn dhcp_server_section(cfg: &Dhcpv4ServerConfig) -> Section {
    let mut section = Section::new(SECTION_DHCP_SERVER);
    section
        .set_opt("PoolOffset", cfg.pool_offset)
        .set_opt("PoolSize", cfg.pool_size)
        .set_opt("DefaultLeaseTimeSec", cfg.default_lease_time)
        .set_opt("MaxLeaseTimeSec", cfg.max_lease_time)
        .set_opt_bool("EmitDNS", cfg.emit_dns)
        .set_opt("DNS", cfg.dns)
        .set_opt_bool("EmitNTP", cfg.emit_ntp)
        .set_opt("NTP", cfg.ntp)
        .set_opt_bool("EmitRouter", cfg.emit_router);
    section
}

/// `[IPv6SendRA]` followed by the optional `[IPv6Prefix]` and
/// `[IPv6RoutePrefix]`.
pub(crate) fn ra_sections(cfg: &RouterAdvertisementConfig) -> Vec<Section> {
    let mut ret = Vec::new();
    let mut ra = Section::new(SECTION_RA);
    ra.set_opt("RouterPreference", cfg.preference)
        .set_opt_bool("EmitDNS", cfg.emit_dns)
        .set_opt("DNS", cfg.dns)
        .set_opt_bool("EmitDomains", cfg.emit_domain)
        .set_opt("Domains", cfg.domain.as_deref())
        .set_opt("DNSLifetimeSec", cfg.dns_lifetime)
        .set_opt_bool("Managed", cfg.managed)
        .set_opt_bool("OtherInformation", cfg.other_config);
    ret.push(ra);

    if let Some(prefix) = cfg.prefix {
        let mut section = Section::new(SECTION_RA_PREFIX);
        section
            .set("Prefix", prefix.to_string().as_str())
            .set_opt("PreferredLifetimeSec", cfg.preferred_lifetime)
            .set_opt("ValidLifetimeSec", cfg.valid_lifetime)
            .set_opt_bool("Assign", cfg.assign);
        ret.push(section);
    }
    if let Some(route_prefix) = cfg.route_prefix {
        let mut section = Section::new(SECTION_RA_ROUTE_PREFIX);
        section
            .set("Route", route_prefix.to_string().as_str())
            .set_opt("LifetimeSec", cfg.route_lifetime);
        ret.push(section);
    }
    ret
}

pub(crate) fn vlan_netdev(vlan: &VlanDescriptor) -> SectionBuilder {
    let mut sb = SectionBuilder::new();
    sb.new_section("NetDev")
        .set("Name", vlan.name.as_str())
        .set("Kind", "vlan");
    sb.new_section("VLAN").set("Id", vlan.id.to_string().as_str());
    sb
}

/// Canonical content of the `.network` file of `network`.
pub(crate) fn render_network(network: &Network) -> SectionBuilder {
    let mut sb = SectionBuilder::new();
    insert_match_section(&mut sb, network.name.as_str());
    let mut sections = vec![
        link_section(&network.link, network.state),
        network_section(network),
    ];
    for family in [DhcpFamily::V4, DhcpFamily::V6] {
        if let Some(cfg) = network.dhcp_client(family) {
            sections.push(dhcp_client_section(family, cfg));
        }
    }
    sections.extend(network.addresses.iter().map(address_section));
    sections.extend(network.routes.iter().map(route_section));
    sections.extend(network.routing_policy_rules.iter().map(rule_section));
    if let Some(server) = network.dhcpv4_server.as_ref() {
        sections.push(dhcp_server_section(server));
    }
    if let Some(ra) = network.router_advertisement.as_ref() {
        sections.extend(ra_sections(ra));
    }
    for section in sections {
        // `[IPv6SendRA]` and `[DHCPServer]` carry meaning even when empty
        if !section.is_empty()
            || section.name() == SECTION_RA
            || section.name() == SECTION_DHCP_SERVER
        {
            sb.push(section);
        }
    }
    sb
}
