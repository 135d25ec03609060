// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use crate::{
    AddressConfig, IpAddress, LinkFlag, LinkState, MacAddress, Route,
    RoutingPolicyRule,
};

/// One kernel request, interface already resolved to its index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NetlinkRequest {
    SetLinkMtu { index: u32, mtu: u32 },
    SetLinkAddress { index: u32, mac: MacAddress },
    SetLinkState { index: u32, state: LinkState },
    SetLinkGroup { index: u32, group: u32 },
    SetLinkFlag { index: u32, flag: LinkFlag, value: bool },
    AddAddress { index: u32, address: AddressConfig },
    DelAddress { index: u32, address: IpAddress },
    AddRoute { index: u32, route: Route },
    AddRule { rule: RoutingPolicyRule },
    DelRule { rule: RoutingPolicyRule },
    AddVlan { name: String, parent_index: u32, id: u16 },
    DelLink { index: u32 },
}

impl NetlinkRequest {
    pub fn is_add(&self) -> bool {
        matches!(
            self,
            Self::AddAddress { .. }
                | Self::AddRoute { .. }
                | Self::AddRule { .. }
                | Self::AddVlan { .. }
        )
    }

    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Self::DelAddress { .. } | Self::DelRule { .. } | Self::DelLink { .. }
        )
    }
}

impl std::fmt::Display for NetlinkRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetLinkMtu { index, mtu } => {
                write!(f, "set MTU {mtu} on link {index}")
            }
            Self::SetLinkAddress { index, mac } => {
                write!(f, "set MAC {mac} on link {index}")
            }
            Self::SetLinkState { index, state } => {
                write!(f, "set link {index} {state}")
            }
            Self::SetLinkGroup { index, group } => {
                write!(f, "set group {group} on link {index}")
            }
            Self::SetLinkFlag { index, flag, value } => {
                write!(f, "set {flag} {value} on link {index}")
            }
            Self::AddAddress { index, address } => {
                write!(f, "add address {} to link {index}", address.address)
            }
            Self::DelAddress { index, address } => {
                write!(f, "delete address {address} from link {index}")
            }
            Self::AddRoute { index, route } => write!(
                f,
                "add route to {} via {} on link {index}",
                route
                    .destination
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "default".to_string()),
                route
                    .gateway
                    .map(|g| g.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ),
            Self::AddRule { rule } => {
                write!(f, "add routing policy rule to table {}", rule.table)
            }
            Self::DelRule { rule } => {
                write!(f, "delete routing policy rule of table {}", rule.table)
            }
            Self::AddVlan {
                name,
                parent_index,
                id,
            } => write!(f, "add VLAN {name} id {id} on link {parent_index}"),
            Self::DelLink { index } => write!(f, "delete link {index}"),
        }
    }
}

/// Failure reported by a [NetlinkChannel].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetlinkFailure {
    /// Positive errno reported by the kernel
    Errno(i32),
    /// Failure without kernel errno, e.g. socket creation
    Other(String),
}

impl std::fmt::Display for NetlinkFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Errno(errno) => write!(
                f,
                "{}",
                nix::errno::Errno::from_i32(*errno).desc()
            ),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Request/response channel to the kernel's routing subsystem.
///
/// Each request is awaited before the next one is issued.
pub trait NetlinkChannel {
    /// Index of the link named `name`
    fn link_index(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<u32, NetlinkFailure>>;

    fn request(
        &mut self,
        req: &NetlinkRequest,
    ) -> impl Future<Output = Result<(), NetlinkFailure>>;
}
