// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::NcmError;

const MAC_ADDR_LEN: usize = 6;

/// Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; MAC_ADDR_LEN]);

impl MacAddress {
    pub fn octets(&self) -> [u8; MAC_ADDR_LEN] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        let invalid =
            || NcmError::invalid(format!("Invalid MAC address '{s}'"));
        let mut octets = [0u8; MAC_ADDR_LEN];
        let mut parts = s.trim().split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl TryFrom<String> for MacAddress {
    type Error = NcmError;

    fn try_from(s: String) -> Result<Self, NcmError> {
        Self::from_str(s.as_str())
    }
}

impl From<MacAddress> for String {
    fn from(v: MacAddress) -> Self {
        v.to_string()
    }
}

string_enum! {
    /// Administrative state of a link
    LinkState {
        Up => "up",
        Down => "down",
    }
}

string_enum! {
    /// Boolean settings of the `[Link]` section
    LinkFlag {
        Arp => "arp",
        Multicast => "multicast",
        AllMulticast => "allmulticast" | "all-multicast",
        Promiscuous => "promiscuous",
        RequiredForOnline => "requiredforonline" | "required-for-online",
        Unmanaged => "unmanaged",
    }
}

impl LinkFlag {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Arp => "ARP",
            Self::Multicast => "Multicast",
            Self::AllMulticast => "AllMulticast",
            Self::Promiscuous => "Promiscuous",
            Self::RequiredForOnline => "RequiredForOnline",
            Self::Unmanaged => "Unmanaged",
        }
    }

    /// Whether the kernel exposes this flag to be changed on a live link.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Arp | Self::Promiscuous)
    }
}

string_enum! {
    ActivationPolicy {
        Up => "up",
        AlwaysUp => "always-up",
        Manual => "manual",
        AlwaysDown => "always-down",
        Down => "down",
        Bound => "bound",
    }
}

string_enum! {
    /// Address family required before the link is considered online
    AddressFamilyOnline {
        Ipv4 => "ipv4",
        Ipv6 => "ipv6",
        Both => "both",
        Any => "any",
    }
}

string_enum! {
    LinkLocalAddressing {
        Yes => "yes" | "true" | "both",
        No => "no" | "false" | "off",
        Ipv4 => "ipv4",
        Ipv6 => "ipv6",
    }
}

/// Link level settings, persisted in the `[Link]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct LinkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multicast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_multicast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promiscuous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_for_online: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_family_for_online: Option<AddressFamilyOnline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_policy: Option<ActivationPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmanaged: Option<bool>,
}

impl LinkConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn flag(&self, flag: LinkFlag) -> Option<bool> {
        match flag {
            LinkFlag::Arp => self.arp,
            LinkFlag::Multicast => self.multicast,
            LinkFlag::AllMulticast => self.all_multicast,
            LinkFlag::Promiscuous => self.promiscuous,
            LinkFlag::RequiredForOnline => self.required_for_online,
            LinkFlag::Unmanaged => self.unmanaged,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        if self.mtu == Some(0) {
            return Err(NcmError::invalid("MTU should not be 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_mac_parse() {
        let mac = MacAddress::from_str("00:1A:2b:3c:4D:5e").unwrap();
        assert_eq!(mac.to_string(), "00:1a:2b:3c:4d:5e");
    }

    #[test]
    fn test_mac_malformed() {
        for s in [
            "00:1a:2b:3c:4d",
            "00:1a:2b:3c:4d:5e:6f",
            "0:1a:2b:3c:4d:5e",
            "zz:1a:2b:3c:4d:5e",
            "",
        ] {
            assert_eq!(
                MacAddress::from_str(s).unwrap_err().kind(),
                ErrorKind::InvalidInput,
                "{s}"
            );
        }
    }

    #[test]
    fn test_string_enum_alias() {
        assert_eq!(
            LinkFlag::from_str("all-multicast").unwrap(),
            LinkFlag::AllMulticast
        );
        assert_eq!(LinkFlag::AllMulticast.to_string(), "allmulticast");
        assert!(ActivationPolicy::from_str("sometimes").is_err());
    }
}
