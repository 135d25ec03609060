// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{common_family, IpAddress, IpFamily};
use crate::NcmError;

const RT_TABLE_DEFAULT: u32 = 253;
const RT_TABLE_MAIN: u32 = 254;
const RT_TABLE_LOCAL: u32 = 255;

string_enum! {
    Ipv6RoutePreference {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl Ipv6RoutePreference {
    /// Value of `RTA_PREF`
    pub fn kernel_value(&self) -> u8 {
        match self {
            Self::Low => 3,
            Self::Medium => 0,
            Self::High => 1,
        }
    }
}

string_enum! {
    RouteScope {
        Global => "global",
        Site => "site",
        Link => "link",
        Host => "host",
        Nowhere => "nowhere",
    }
}

impl RouteScope {
    pub fn kernel_value(&self) -> u8 {
        match self {
            Self::Global => 0,
            Self::Site => 200,
            Self::Link => 253,
            Self::Host => 254,
            Self::Nowhere => 255,
        }
    }
}

string_enum! {
    RouteType {
        Unicast => "unicast",
        Local => "local",
        Broadcast => "broadcast",
        Anycast => "anycast",
        Multicast => "multicast",
        Blackhole => "blackhole",
        Unreachable => "unreachable",
        Prohibit => "prohibit",
        Throw => "throw",
        Nat => "nat",
        Xresolve => "xresolve",
    }
}

impl RouteType {
    pub fn kernel_value(&self) -> u8 {
        match self {
            Self::Unicast => 1,
            Self::Local => 2,
            Self::Broadcast => 3,
            Self::Anycast => 4,
            Self::Multicast => 5,
            Self::Blackhole => 6,
            Self::Unreachable => 7,
            Self::Prohibit => 8,
            Self::Throw => 9,
            Self::Nat => 10,
            Self::Xresolve => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RouteProtocol {
    Kernel,
    Boot,
    Static,
    Ra,
    Dhcp,
    Other(u8),
}

impl RouteProtocol {
    pub fn kernel_value(&self) -> u8 {
        match self {
            Self::Kernel => 2,
            Self::Boot => 3,
            Self::Static => 4,
            Self::Ra => 9,
            Self::Dhcp => 16,
            Self::Other(v) => *v,
        }
    }
}

impl FromStr for RouteProtocol {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        match s.trim() {
            "kernel" => Ok(Self::Kernel),
            "boot" => Ok(Self::Boot),
            "static" => Ok(Self::Static),
            "ra" => Ok(Self::Ra),
            "dhcp" => Ok(Self::Dhcp),
            v => v.parse::<u8>().map(Self::Other).map_err(|_| {
                NcmError::invalid(format!(
                    "Invalid route protocol '{s}', should be kernel, boot, \
                     static, ra, dhcp or a number between 0 and 255"
                ))
            }),
        }
    }
}

impl std::fmt::Display for RouteProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kernel => write!(f, "kernel"),
            Self::Boot => write!(f, "boot"),
            Self::Static => write!(f, "static"),
            Self::Ra => write!(f, "ra"),
            Self::Dhcp => write!(f, "dhcp"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

impl TryFrom<String> for RouteProtocol {
    type Error = NcmError;

    fn try_from(s: String) -> Result<Self, NcmError> {
        s.parse()
    }
}

impl From<RouteProtocol> for String {
    fn from(v: RouteProtocol) -> Self {
        v.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RouteTable {
    Default,
    Main,
    Local,
    Id(u32),
}

impl RouteTable {
    pub fn id(&self) -> u32 {
        match self {
            Self::Default => RT_TABLE_DEFAULT,
            Self::Main => RT_TABLE_MAIN,
            Self::Local => RT_TABLE_LOCAL,
            Self::Id(v) => *v,
        }
    }
}

impl FromStr for RouteTable {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        match s.trim() {
            "default" => Ok(Self::Default),
            "main" => Ok(Self::Main),
            "local" => Ok(Self::Local),
            v => match v.parse::<u32>() {
                Ok(0) | Err(_) => Err(NcmError::invalid(format!(
                    "Invalid route table '{s}', should be default, main, \
                     local or a positive number"
                ))),
                Ok(RT_TABLE_DEFAULT) => Ok(Self::Default),
                Ok(RT_TABLE_MAIN) => Ok(Self::Main),
                Ok(RT_TABLE_LOCAL) => Ok(Self::Local),
                Ok(i) => Ok(Self::Id(i)),
            },
        }
    }
}

impl std::fmt::Display for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Main => write!(f, "main"),
            Self::Local => write!(f, "local"),
            Self::Id(v) => write!(f, "{v}"),
        }
    }
}

impl TryFrom<String> for RouteTable {
    type Error = NcmError;

    fn try_from(s: String) -> Result<Self, NcmError> {
        s.parse()
    }
}

impl From<RouteTable> for String {
    fn from(v: RouteTable) -> Self {
        v.to_string()
    }
}

/// Static route. Without destination but with gateway it is the default
/// route of the gateway's family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_source: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<Ipv6RoutePreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<RouteProtocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<RouteScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_type: Option<RouteType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<RouteTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub onlink: bool,
}

impl Route {
    pub fn default_gateway(gateway: IpAddress) -> Self {
        Self {
            gateway: Some(gateway),
            ..Default::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self.destination.is_none() && self.gateway.is_some()
    }

    /// Route carrying nothing more than the gateway and on-link flag, which
    /// is persisted as the minimal gateway section.
    pub(crate) fn is_plain_default(&self) -> bool {
        self.is_default()
            && self
                == &Self {
                    gateway: self.gateway,
                    onlink: self.onlink,
                    ..Default::default()
                }
    }

    pub fn family(&self) -> Option<IpFamily> {
        [
            self.gateway.as_ref(),
            self.destination.as_ref(),
            self.source.as_ref(),
            self.preferred_source.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(|a| a.family())
        .next()
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        if self.gateway.is_none() && self.destination.is_none() {
            return Err(NcmError::invalid(
                "Route should have gateway or destination defined".to_string(),
            ));
        }
        let family = common_family(&[
            ("Gateway", self.gateway.as_ref()),
            ("Destination", self.destination.as_ref()),
            ("Source", self.source.as_ref()),
            ("PreferredSource", self.preferred_source.as_ref()),
        ])?;
        if self.preference.is_some() && family == Some(IpFamily::Ipv4) {
            return Err(NcmError::invalid(
                "IPv6 route preference is only valid for IPv6 routes"
                    .to_string(),
            ));
        }
        if self.mtu == Some(0) {
            return Err(NcmError::invalid(
                "Route MTU should not be 0".to_string(),
            ));
        }
        Ok(())
    }
}
