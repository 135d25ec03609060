// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{common_family, IpAddress};
use crate::NcmError;

const ADDRESS_LABEL_MAX_LEN: usize = 15;

/// Scope of an address, either one of the well known names or the raw
/// number understood by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AddressScope {
    Global,
    Link,
    Host,
    Other(u8),
}

impl AddressScope {
    /// Value of `ifa_scope` in the kernel address message
    pub fn kernel_value(&self) -> u8 {
        match self {
            Self::Global => 0,
            Self::Link => 253,
            Self::Host => 254,
            Self::Other(v) => *v,
        }
    }
}

impl FromStr for AddressScope {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        match s.trim() {
            "global" => Ok(Self::Global),
            "link" => Ok(Self::Link),
            "host" => Ok(Self::Host),
            v => v.parse::<u8>().map(Self::Other).map_err(|_| {
                NcmError::invalid(format!(
                    "Invalid address scope '{s}', should be global, link, \
                     host or a number between 0 and 255"
                ))
            }),
        }
    }
}

impl std::fmt::Display for AddressScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Link => write!(f, "link"),
            Self::Host => write!(f, "host"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

impl TryFrom<String> for AddressScope {
    type Error = NcmError;

    fn try_from(s: String) -> Result<Self, NcmError> {
        s.parse()
    }
}

impl From<AddressScope> for String {
    fn from(v: AddressScope) -> Self {
        v.to_string()
    }
}

string_enum! {
    DuplicateAddressDetection {
        Ipv4 => "ipv4",
        Ipv6 => "ipv6",
        Both => "both",
        None => "none",
    }
}

/// One static address of an interface, persisted as an `[Address]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct AddressConfig {
    pub address: IpAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<AddressScope>,
    /// Only `forever`, `infinity` or `0` are meaningful to the daemon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_lifetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_address_detection: Option<DuplicateAddressDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_route: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AddressConfig {
    pub fn new(address: IpAddress) -> Self {
        Self {
            address,
            peer: None,
            scope: None,
            preferred_lifetime: None,
            duplicate_address_detection: None,
            prefix_route: None,
            label: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        common_family(&[
            ("Address", Some(&self.address)),
            ("Peer", self.peer.as_ref()),
        ])?;
        if let Some(lifetime) = self.preferred_lifetime.as_deref() {
            if !["forever", "infinity", "0"].contains(&lifetime) {
                return Err(NcmError::invalid(format!(
                    "Invalid preferred lifetime '{lifetime}' of address {}, \
                     should be forever, infinity or 0",
                    self.address
                )));
            }
        }
        if let Some(label) = self.label.as_deref() {
            if label.is_empty()
                || label.len() > ADDRESS_LABEL_MAX_LEN
                || !label.is_ascii()
            {
                return Err(NcmError::invalid(format!(
                    "Invalid label '{label}' of address {}, should be ASCII \
                     of 1 to {ADDRESS_LABEL_MAX_LEN} characters",
                    self.address
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_peer_family_mismatch() {
        let mut addr =
            AddressConfig::new(IpAddress::from_str("192.0.2.1/24").unwrap());
        addr.peer = Some(IpAddress::from_str("2001:db8::1").unwrap());
        assert_eq!(addr.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_scope_number() {
        assert_eq!(
            AddressScope::from_str("200").unwrap(),
            AddressScope::Other(200)
        );
        assert_eq!(AddressScope::Link.kernel_value(), 253);
        assert!(AddressScope::from_str("planet").is_err());
    }

    #[test]
    fn test_preferred_lifetime() {
        let mut addr =
            AddressConfig::new(IpAddress::from_str("192.0.2.1/24").unwrap());
        addr.preferred_lifetime = Some("0".into());
        addr.validate().unwrap();
        addr.preferred_lifetime = Some("30s".into());
        assert!(addr.validate().is_err());
    }
}
