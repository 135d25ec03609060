// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use futures::stream::TryStreamExt;
use netlink_packet_route::{
    address::{AddressAttribute, AddressMessage, AddressScope as NlAddrScope},
    link::LinkAttribute,
    route::{
        RouteAttribute, RouteMetric, RouteProtocol as NlRouteProtocol,
        RouteScope as NlRouteScope, RouteType as NlRouteType,
    },
    rule::{RuleAction, RuleAttribute, RuleMessage},
};
use nix::errno::Errno;
use rtnetlink::{Handle, IpVersion};

use super::{NetlinkChannel, NetlinkFailure, NetlinkRequest};
use crate::{
    AddressConfig, ErrorKind, IpAddress, IpFamily, LinkFlag, LinkState,
    NcmError, Route, RouteScope, RoutingPolicyRule,
};

const RT_TABLE_MAIN: u32 = 254;

// Family specific part of a route add request, `$conv` picks the addresses
// of that family.
macro_rules! build_route {
    ($req:expr, $route:expr, $conv:ident) => {{
        let mut req = $req;
        if let Some((a, len)) = $route.destination.as_ref().and_then($conv) {
            req = req.destination_prefix(a, len);
        }
        if let Some((a, _)) = $route.gateway.as_ref().and_then($conv) {
            req = req.gateway(a);
        }
        if let Some((a, len)) = $route.source.as_ref().and_then($conv) {
            req = req.source_prefix(a, len);
        }
        if let Some((a, _)) = $route.preferred_source.as_ref().and_then($conv)
        {
            req = req.pref_source(a);
        }
        req
    }};
}

/// [NetlinkChannel] backed by a rtnetlink socket.
#[derive(Clone)]
pub struct RtnlChannel {
    handle: Handle,
}

impl RtnlChannel {
    /// Open the netlink socket. Must be called within a tokio runtime.
    pub fn new() -> Result<Self, NcmError> {
        let (conn, handle, _) = rtnetlink::new_connection().map_err(|e| {
            NcmError::new(
                ErrorKind::ApplyFailure,
                format!("Failed to create rtnetlink socket: {e}"),
            )
        })?;
        tokio::spawn(conn);
        Ok(Self { handle })
    }

    async fn add_address(
        &self,
        index: u32,
        cfg: &AddressConfig,
    ) -> Result<(), rtnetlink::Error> {
        let mut req = self.handle.address().add(
            index,
            cfg.address.addr(),
            cfg.address.prefix_length(),
        );
        let msg = req.message_mut();
        if let Some(scope) = cfg.scope {
            msg.header.scope = NlAddrScope::from(scope.kernel_value());
        }
        if let Some(peer) = cfg.peer {
            // IFA_LOCAL holds our address, IFA_ADDRESS the peer
            msg.attributes
                .retain(|a| !matches!(a, AddressAttribute::Address(_)));
            if !msg
                .attributes
                .iter()
                .any(|a| matches!(a, AddressAttribute::Local(_)))
            {
                msg.attributes
                    .push(AddressAttribute::Local(cfg.address.addr()));
            }
            msg.attributes.push(AddressAttribute::Address(peer.addr()));
        }
        if let Some(label) = cfg.label.as_ref().filter(|_| cfg.address.is_ipv4())
        {
            msg.attributes.push(AddressAttribute::Label(label.clone()));
        }
        req.execute().await
    }

    async fn del_address(
        &self,
        index: u32,
        address: &IpAddress,
    ) -> Result<(), NetlinkFailure> {
        let mut req = self
            .handle
            .address()
            .get()
            .set_link_index_filter(index)
            .set_address_filter(address.addr());
        if address.has_prefix() {
            req = req.set_prefix_length_filter(address.prefix_length());
        }
        let msgs: Vec<AddressMessage> =
            req.execute().try_collect().await.map_err(nl_failure)?;
        if msgs.is_empty() {
            return Err(NetlinkFailure::Errno(Errno::EADDRNOTAVAIL as i32));
        }
        for msg in msgs {
            self.handle
                .address()
                .del(msg)
                .execute()
                .await
                .map_err(nl_failure)?;
        }
        Ok(())
    }

    async fn add_route(
        &self,
        index: u32,
        route: &Route,
    ) -> Result<(), rtnetlink::Error> {
        let table = route.table.map(|t| t.id()).unwrap_or(RT_TABLE_MAIN);
        let scope = match (route.scope, route.gateway) {
            (Some(s), _) => Some(s),
            // Directly reachable destination
            (None, None) => Some(RouteScope::Link),
            (None, Some(_)) => None,
        };
        let req = self
            .handle
            .route()
            .add()
            .output_interface(index)
            .table_id(table);
        let req = match route.protocol {
            Some(p) => req.protocol(NlRouteProtocol::from(p.kernel_value())),
            None => req,
        };
        let req = match route.route_type {
            Some(t) => req.kind(NlRouteType::from(t.kernel_value())),
            None => req,
        };
        if route.family() == Some(IpFamily::Ipv6) {
            let mut req = build_route!(req.v6(), route, as_v6);
            if let Some(scope) = route.scope {
                req = req.scope(NlRouteScope::from(scope.kernel_value()));
            }
            append_route_attributes(req.message_mut(), route);
            req.execute().await
        } else {
            let mut req = build_route!(req.v4(), route, as_v4);
            if let Some(scope) = scope {
                req = req.scope(NlRouteScope::from(scope.kernel_value()));
            }
            append_route_attributes(req.message_mut(), route);
            req.execute().await
        }
    }

    async fn add_rule(
        &self,
        rule: &RoutingPolicyRule,
    ) -> Result<(), rtnetlink::Error> {
        let req = self
            .handle
            .rule()
            .add()
            .table_id(rule.table)
            .action(RuleAction::ToTable);
        let req = match rule.priority {
            Some(p) => req.priority(p),
            None => req,
        };
        let req = match rule.input_interface.as_ref() {
            Some(i) => req.input_interface(i.name().to_string()),
            None => req,
        };
        let req = match rule.output_interface.as_ref() {
            Some(i) => req.output_interface(i.name().to_string()),
            None => req,
        };
        if rule.family() == IpFamily::Ipv6 {
            let mut req = req.v6();
            if let Some((a, len)) = rule.from.as_ref().and_then(as_v6) {
                req = req.source_prefix(a, len);
            }
            if let Some((a, len)) = rule.to.as_ref().and_then(as_v6) {
                req = req.destination_prefix(a, len);
            }
            if let Some(tos) = rule.tos {
                req.message_mut().header.tos = tos;
            }
            req.execute().await
        } else {
            let mut req = req.v4();
            if let Some((a, len)) = rule.from.as_ref().and_then(as_v4) {
                req = req.source_prefix(a, len);
            }
            if let Some((a, len)) = rule.to.as_ref().and_then(as_v4) {
                req = req.destination_prefix(a, len);
            }
            if let Some(tos) = rule.tos {
                req.message_mut().header.tos = tos;
            }
            req.execute().await
        }
    }

    async fn del_rule(
        &self,
        rule: &RoutingPolicyRule,
    ) -> Result<(), NetlinkFailure> {
        let ip_version = match rule.family() {
            IpFamily::Ipv4 => IpVersion::V4,
            IpFamily::Ipv6 => IpVersion::V6,
        };
        let msgs: Vec<RuleMessage> = self
            .handle
            .rule()
            .get(ip_version)
            .execute()
            .try_collect()
            .await
            .map_err(nl_failure)?;
        let mut found = false;
        for msg in msgs.into_iter().filter(|m| is_rule_of(m, rule)) {
            found = true;
            self.handle
                .rule()
                .del(msg)
                .execute()
                .await
                .map_err(nl_failure)?;
        }
        if found {
            Ok(())
        } else {
            Err(NetlinkFailure::Errno(Errno::ENOENT as i32))
        }
    }
}

fn as_v4(addr: &IpAddress) -> Option<(Ipv4Addr, u8)> {
    match addr.addr() {
        IpAddr::V4(a) => Some((a, addr.prefix_length())),
        IpAddr::V6(_) => None,
    }
}

fn as_v6(addr: &IpAddress) -> Option<(Ipv6Addr, u8)> {
    match addr.addr() {
        IpAddr::V6(a) => Some((a, addr.prefix_length())),
        IpAddr::V4(_) => None,
    }
}

fn append_route_attributes(
    msg: &mut netlink_packet_route::route::RouteMessage,
    route: &Route,
) {
    if let Some(metric) = route.metric {
        msg.attributes.push(RouteAttribute::Priority(metric));
    }
    if let Some(mtu) = route.mtu {
        msg.attributes
            .push(RouteAttribute::Metrics(vec![RouteMetric::Mtu(mtu)]));
    }
}

fn is_rule_of(msg: &RuleMessage, rule: &RoutingPolicyRule) -> bool {
    let mut table = u32::from(msg.header.table);
    let mut priority = None;
    let mut from = None;
    let mut to = None;
    let mut iif = None;
    let mut oif = None;
    for attr in &msg.attributes {
        match attr {
            RuleAttribute::Table(t) => table = *t,
            RuleAttribute::Priority(p) => priority = Some(*p),
            RuleAttribute::Source(a) => from = Some(*a),
            RuleAttribute::Destination(a) => to = Some(*a),
            RuleAttribute::Iifname(i) => iif = Some(i.as_str()),
            RuleAttribute::Oifname(i) => oif = Some(i.as_str()),
            _ => (),
        }
    }
    table == rule.table
        && (rule.priority.is_none() || priority == rule.priority)
        && msg.header.src_len
            == rule.from.map(|a| a.prefix_length()).unwrap_or_default()
        && msg.header.dst_len
            == rule.to.map(|a| a.prefix_length()).unwrap_or_default()
        && from == rule.from.map(|a| a.addr())
        && to == rule.to.map(|a| a.addr())
        && iif == rule.input_interface.as_ref().map(|i| i.name())
        && oif == rule.output_interface.as_ref().map(|i| i.name())
        && msg.header.tos == rule.tos.unwrap_or_default()
}

fn nl_failure(e: rtnetlink::Error) -> NetlinkFailure {
    if let rtnetlink::Error::NetlinkError(msg) = &e {
        if let Some(errno) = kernel_errno(msg) {
            return NetlinkFailure::Errno(errno);
        }
    }
    NetlinkFailure::Other(e.to_string())
}

// Negative errno, none for an acknowledgement
fn kernel_errno(msg: &netlink_packet_core::ErrorMessage) -> Option<i32> {
    msg.code.map(|code| -code.get())
}

impl NetlinkChannel for RtnlChannel {
    async fn link_index(&mut self, name: &str) -> Result<u32, NetlinkFailure> {
        let mut links = self
            .handle
            .link()
            .get()
            .match_name(name.to_string())
            .execute();
        match links.try_next().await.map_err(nl_failure)? {
            Some(msg) => Ok(msg.header.index),
            None => Err(NetlinkFailure::Errno(Errno::ENODEV as i32)),
        }
    }

    async fn request(
        &mut self,
        req: &NetlinkRequest,
    ) -> Result<(), NetlinkFailure> {
        log::trace!("Netlink request: {req:?}");
        let mut link = self.handle.link();
        let result = match req {
            NetlinkRequest::SetLinkMtu { index, mtu } => {
                link.set(*index).mtu(*mtu).execute().await
            }
            NetlinkRequest::SetLinkAddress { index, mac } => {
                link.set(*index).address(mac.octets().to_vec()).execute().await
            }
            NetlinkRequest::SetLinkState { index, state } => match state {
                LinkState::Up => link.set(*index).up().execute().await,
                LinkState::Down => link.set(*index).down().execute().await,
            },
            NetlinkRequest::SetLinkGroup { index, group } => {
                let mut set = link.set(*index);
                set.message_mut()
                    .attributes
                    .push(LinkAttribute::Group(*group));
                set.execute().await
            }
            NetlinkRequest::SetLinkFlag { index, flag, value } => match flag {
                LinkFlag::Arp => link.set(*index).arp(*value).execute().await,
                LinkFlag::Promiscuous => {
                    link.set(*index).promiscuous(*value).execute().await
                }
                _ => {
                    return Err(NetlinkFailure::Other(format!(
                        "Link flag {flag} cannot be changed on a live link"
                    )));
                }
            },
            NetlinkRequest::AddAddress { index, address } => {
                self.add_address(*index, address).await
            }
            NetlinkRequest::DelAddress { index, address } => {
                return self.del_address(*index, address).await;
            }
            NetlinkRequest::AddRoute { index, route } => {
                self.add_route(*index, route).await
            }
            NetlinkRequest::AddRule { rule } => self.add_rule(rule).await,
            NetlinkRequest::DelRule { rule } => {
                return self.del_rule(rule).await;
            }
            NetlinkRequest::AddVlan {
                name,
                parent_index,
                id,
            } => {
                link.add()
                    .vlan(name.clone(), *parent_index, *id)
                    .execute()
                    .await
            }
            NetlinkRequest::DelLink { index } => {
                link.del(*index).execute().await
            }
        };
        result.map_err(nl_failure)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::InterfaceHandle;

    fn kernel_rule(src: &str, src_len: u8, table: u32) -> RuleMessage {
        let mut msg = RuleMessage::default();
        msg.header.src_len = src_len;
        msg.attributes.push(RuleAttribute::Table(table));
        msg.attributes
            .push(RuleAttribute::Source(src.parse::<IpAddr>().unwrap()));
        msg
    }

    #[test]
    fn test_rule_match_compares_addresses() {
        let mut rule = RoutingPolicyRule::new(100);
        rule.from = Some("10.0.0.1/32".parse().unwrap());

        assert!(is_rule_of(&kernel_rule("10.0.0.1", 32, 100), &rule));
        assert!(!is_rule_of(&kernel_rule("10.0.0.2", 32, 100), &rule));
        assert!(!is_rule_of(&kernel_rule("10.0.0.1", 32, 200), &rule));
    }

    #[test]
    fn test_rule_match_compares_interfaces() {
        let mut rule = RoutingPolicyRule::new(100);
        rule.input_interface = Some(InterfaceHandle::new("eth0").unwrap());

        let mut msg = RuleMessage::default();
        msg.attributes.push(RuleAttribute::Table(100));
        assert!(!is_rule_of(&msg, &rule));

        msg.attributes.push(RuleAttribute::Iifname("eth1".to_string()));
        assert!(!is_rule_of(&msg, &rule));

        msg.attributes.pop();
        msg.attributes.push(RuleAttribute::Iifname("eth0".to_string()));
        assert!(is_rule_of(&msg, &rule));

        msg.attributes.push(RuleAttribute::Oifname("eth2".to_string()));
        assert!(!is_rule_of(&msg, &rule));
    }
}
