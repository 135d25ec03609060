// SPDX-License-Identifier: Apache-2.0

mod apply;
mod cmdline;
mod config;
pub mod config_file;
mod daemon;
mod error;
mod manager;
mod model;
mod persist;
mod section;
mod yaml;

#[cfg(test)]
mod unit_tests;

pub use self::apply::{
    LiveApplier, NetlinkChannel, NetlinkFailure, NetlinkRequest, RtnlChannel,
};
pub use self::cmdline::parse_networks as parse_kernel_cmdline;
pub use self::config::{NcmConfig, RetryConfig};
pub use self::daemon::{NetworkDaemon, NetworkdDbus};
pub use self::error::{ErrorKind, NcmError};
pub use self::manager::NetworkManager;
pub use self::model::{
    ActivationPolicy, AddressConfig, AddressFamilyOnline, AddressScope,
    DhcpClientConfig, DhcpClientDuid, DhcpClientIdentifier, DhcpClientMode,
    DhcpFamily, Dhcpv4ServerConfig, DnsScope, DuidType,
    DuplicateAddressDetection, InterfaceHandle, IpAddress, IpFamily,
    Ipv6RaPreference, Ipv6RoutePreference, LinkConfig, LinkFlag,
    LinkLocalAddressing, LinkState, MacAddress, Network, ProxyConfig, Route,
    RouteProtocol, RouteScope, RouteTable, RouteType,
    RouterAdvertisementConfig, RoutingPolicyRule, VlanDescriptor,
};
pub use self::persist::{ConfigPersister, GenerateReport, InterfaceOutcome};
pub use self::section::{Section, SectionBuilder};
pub use self::yaml::parse_networks as parse_yaml;
