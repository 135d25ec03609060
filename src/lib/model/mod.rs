// SPDX-License-Identifier: Apache-2.0

// Enum exchanged as the word used in the managed daemon's config grammar.
// The first text of each variant is canonical, the rest are aliases accepted
// when parsing.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
            ) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::NcmError;

            fn from_str(s: &str) -> Result<Self, crate::NcmError> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(crate::NcmError::invalid(format!(
                        "Invalid {} '{s}', valid values are: {}",
                        stringify!($name),
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = crate::NcmError;

            fn try_from(s: String) -> Result<Self, crate::NcmError> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }
    };
}

mod address;
mod dhcp;
mod iface;
mod ip;
mod link;
mod network;
mod proxy;
mod ra;
mod route;
mod rule;
mod vlan;

pub use self::address::{AddressConfig, AddressScope, DuplicateAddressDetection};
pub use self::dhcp::{
    DhcpClientConfig, DhcpClientDuid, DhcpClientIdentifier, DhcpClientMode,
    DhcpFamily, Dhcpv4ServerConfig, DuidType,
};
pub use self::iface::InterfaceHandle;
pub use self::ip::{IpAddress, IpFamily};
pub use self::link::{
    ActivationPolicy, AddressFamilyOnline, LinkConfig, LinkFlag,
    LinkLocalAddressing, LinkState, MacAddress,
};
pub use self::network::{DnsScope, Network};
pub(crate) use self::network::validate_word;
pub use self::proxy::ProxyConfig;
pub use self::ra::{Ipv6RaPreference, RouterAdvertisementConfig};
pub use self::route::{
    Ipv6RoutePreference, Route, RouteProtocol, RouteScope, RouteTable,
    RouteType,
};
pub use self::rule::RoutingPolicyRule;
pub use self::vlan::VlanDescriptor;

pub(crate) use self::iface::{validate_iface_name, ANY_IFACE};
pub(crate) use self::ip::common_family;
