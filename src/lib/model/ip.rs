// SPDX-License-Identifier: Apache-2.0

use std::{net::IpAddr, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::NcmError;

const IPV4_ADDR_LEN: u8 = 32;
const IPV6_ADDR_LEN: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

impl IpFamily {
    pub fn max_prefix_length(&self) -> u8 {
        match self {
            Self::Ipv4 => IPV4_ADDR_LEN,
            Self::Ipv6 => IPV6_ADDR_LEN,
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// IP address with prefix length.
///
/// Accepted text forms: `192.0.2.1`, `192.0.2.1/24`, `2001:db8::1`,
/// `2001:db8::1/64`. When no prefix is given, the prefix length is the full
/// address length and [std::fmt::Display] omits it, so gateways and DNS
/// servers round trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpAddress {
    addr: IpAddr,
    prefix_length: u8,
    explicit_prefix: bool,
}

impl IpAddress {
    pub fn new(addr: IpAddr, prefix_length: u8) -> Result<Self, NcmError> {
        let family = family_of(&addr);
        if prefix_length > family.max_prefix_length() {
            return Err(NcmError::invalid(format!(
                "Invalid {family} prefix length {prefix_length} of {addr}, \
                 should be in the range of 0 to {}",
                family.max_prefix_length()
            )));
        }
        Ok(Self {
            addr,
            prefix_length,
            explicit_prefix: true,
        })
    }

    /// Host address without explicit prefix.
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix_length: family_of(&addr).max_prefix_length(),
            explicit_prefix: false,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    pub fn family(&self) -> IpFamily {
        family_of(&self.addr)
    }

    /// Whether the prefix length was given explicitly
    pub fn has_prefix(&self) -> bool {
        self.explicit_prefix
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.addr.is_ipv6()
    }

    pub(crate) fn ensure_family(
        &self,
        family: IpFamily,
        what: &str,
    ) -> Result<(), NcmError> {
        if self.family() != family {
            Err(NcmError::invalid(format!(
                "{what} {self} is not an {family} address"
            )))
        } else {
            Ok(())
        }
    }
}

fn family_of(addr: &IpAddr) -> IpFamily {
    if addr.is_ipv4() {
        IpFamily::Ipv4
    } else {
        IpFamily::Ipv6
    }
}

impl FromStr for IpAddress {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NcmError::invalid("Empty IP address".to_string()));
        }
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr = IpAddr::from_str(addr)?;
                let prefix_length = prefix.parse::<u8>().map_err(|e| {
                    NcmError::invalid(format!(
                        "Invalid prefix length '{prefix}' of {s}: {e}"
                    ))
                })?;
                Self::new(addr, prefix_length)
            }
            None => Ok(Self::host(IpAddr::from_str(s)?)),
        }
    }
}

impl std::fmt::Display for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.explicit_prefix {
            write!(f, "{}/{}", self.addr, self.prefix_length)
        } else {
            write!(f, "{}", self.addr)
        }
    }
}

impl TryFrom<String> for IpAddress {
    type Error = NcmError;

    fn try_from(s: String) -> Result<Self, NcmError> {
        Self::from_str(s.as_str())
    }
}

impl From<IpAddress> for String {
    fn from(v: IpAddress) -> Self {
        v.to_string()
    }
}

/// Ensure all `Some` addresses belong to the same family, return it.
pub(crate) fn common_family(
    addrs: &[(&str, Option<&IpAddress>)],
) -> Result<Option<IpFamily>, NcmError> {
    let mut family: Option<(IpFamily, &str)> = None;
    for (what, addr) in addrs {
        if let Some(addr) = addr {
            match family {
                None => family = Some((addr.family(), what)),
                Some((f, first)) if f != addr.family() => {
                    return Err(NcmError::invalid(format!(
                        "{what} {addr} is not in the same IP family as \
                         {first} ({f})"
                    )));
                }
                _ => (),
            }
        }
    }
    Ok(family.map(|(f, _)| f))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_ipv4_prefix_33_rejected() {
        let e = IpAddress::from_str("192.0.2.1/33").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_ipv6_prefix_129_rejected() {
        let e = IpAddress::from_str("2001:db8::1/129").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_ipv6_prefix_128_accepted() {
        let a = IpAddress::from_str("2001:db8::1/128").unwrap();
        assert_eq!(a.prefix_length(), 128);
        assert_eq!(a.to_string(), "2001:db8::1/128");
    }

    #[test]
    fn test_host_address_display_without_prefix() {
        let a = IpAddress::from_str("192.0.2.254").unwrap();
        assert_eq!(a.prefix_length(), 32);
        assert_eq!(a.to_string(), "192.0.2.254");
    }

    #[test]
    fn test_garbage_rejected() {
        for s in ["", "192.0.2.1/", "192.0.2/24", "192.0.2.1/24/1", "eth0"] {
            assert_eq!(
                IpAddress::from_str(s).unwrap_err().kind(),
                ErrorKind::InvalidInput,
                "{s}"
            );
        }
    }

    #[test]
    fn test_common_family_mismatch() {
        let gw = IpAddress::from_str("192.0.2.1").unwrap();
        let dst = IpAddress::from_str("2001:db8::/64").unwrap();
        assert!(
            common_family(&[("gateway", Some(&gw)), ("destination", Some(&dst))])
                .is_err()
        );
        assert_eq!(
            common_family(&[("gateway", Some(&gw)), ("source", None)]).unwrap(),
            Some(IpFamily::Ipv4)
        );
    }
}
