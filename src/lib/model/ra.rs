// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{IpAddress, IpFamily};
use crate::NcmError;

string_enum! {
    /// Router preference announced in IPv6 router advertisements
    Ipv6RaPreference {
        Low => "low",
        Medium => "medium" | "normal" | "default",
        High => "high",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct RouterAdvertisementConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_lifetime: Option<u32>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_lifetime: Option<u32>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_lifetime: Option<u32>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_lifetime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<Ipv6RaPreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_config: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_dns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_domain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign: Option<bool>,
}

impl RouterAdvertisementConfig {
    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        for (what, addr) in [
            ("RA prefix", self.prefix.as_ref()),
            ("RA route prefix", self.route_prefix.as_ref()),
            ("RA DNS", self.dns.as_ref()),
        ] {
            if let Some(addr) = addr {
                addr.ensure_family(IpFamily::Ipv6, what)?;
            }
        }
        if let Some(domain) = self.domain.as_deref() {
            if domain.is_empty() || domain.contains(char::is_whitespace) {
                return Err(NcmError::invalid(format!(
                    "Invalid RA domain '{domain}'"
                )));
            }
        }
        if let (Some(preferred), Some(valid)) =
            (self.preferred_lifetime, self.valid_lifetime)
        {
            if preferred > valid {
                return Err(NcmError::invalid(format!(
                    "RA preferred lifetime {preferred} is larger than \
                     valid lifetime {valid}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_ra_ipv4_prefix() {
        let cfg = RouterAdvertisementConfig {
            prefix: Some(IpAddress::from_str("192.0.2.0/24").unwrap()),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_ra_lifetime() {
        let cfg = RouterAdvertisementConfig {
            prefix: Some(IpAddress::from_str("2001:db8:1::/64").unwrap()),
            preferred_lifetime: Some(600),
            valid_lifetime: Some(300),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
