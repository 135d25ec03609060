// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{IpAddress, IpFamily};
use crate::NcmError;

const DUID_RAW_DATA_MAX_LEN: usize = 128;

string_enum! {
    /// Which address families the DHCP client runs for
    DhcpClientMode {
        No => "no" | "off" | "false" | "none",
        Yes => "yes" | "both" | "true",
        Ipv4 => "ipv4" | "v4",
        Ipv6 => "ipv6" | "v6",
    }
}

impl DhcpClientMode {
    pub fn includes(&self, family: DhcpFamily) -> bool {
        match self {
            Self::No => false,
            Self::Yes => true,
            Self::Ipv4 => family == DhcpFamily::V4,
            Self::Ipv6 => family == DhcpFamily::V6,
        }
    }
}

impl Default for DhcpClientMode {
    fn default() -> Self {
        Self::No
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhcpFamily {
    V4,
    V6,
}

impl DhcpFamily {
    pub fn section_name(&self) -> &'static str {
        match self {
            Self::V4 => "DHCPv4",
            Self::V6 => "DHCPv6",
        }
    }

    pub fn ip_family(&self) -> IpFamily {
        match self {
            Self::V4 => IpFamily::Ipv4,
            Self::V6 => IpFamily::Ipv6,
        }
    }
}

impl std::fmt::Display for DhcpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.section_name())
    }
}

impl FromStr for DhcpFamily {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4" | "v4" | "ipv4" | "dhcpv4" => Ok(Self::V4),
            "6" | "v6" | "ipv6" | "dhcpv6" => Ok(Self::V6),
            _ => Err(NcmError::invalid(format!(
                "Invalid DHCP family '{s}', should be ipv4 or ipv6"
            ))),
        }
    }
}

string_enum! {
    DhcpClientIdentifier {
        Mac => "mac",
        Duid => "duid",
        DuidOnly => "duid-only",
    }
}

string_enum! {
    DuidType {
        LinkLayerTime => "link-layer-time",
        Vendor => "vendor",
        LinkLayer => "link-layer",
        Uuid => "uuid",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct DhcpClientDuid {
    pub duid_type: DuidType,
    /// Colon separated hex bytes, for example `00:00:ab:11`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
    /// Store the DUID in the daemon wide configuration instead of the
    /// interface file
    #[serde(default)]
    pub persist_across_systems: bool,
}

impl DhcpClientDuid {
    pub fn new(duid_type: DuidType) -> Self {
        Self {
            duid_type,
            raw_data: None,
            persist_across_systems: false,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        if let Some(raw) = self.raw_data.as_deref() {
            let invalid = || {
                NcmError::invalid(format!(
                    "Invalid DUID raw data '{raw}', should be at most \
                     {DUID_RAW_DATA_MAX_LEN} colon separated hex bytes"
                ))
            };
            let bytes: Vec<&str> = raw.split(':').collect();
            if bytes.len() > DUID_RAW_DATA_MAX_LEN {
                return Err(invalid());
            }
            for byte in bytes {
                if byte.is_empty()
                    || byte.len() > 2
                    || u8::from_str_radix(byte, 16).is_err()
                {
                    return Err(invalid());
                }
            }
        }
        Ok(())
    }
}

/// Per address family DHCP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct DhcpClientConfig {
    /// DHCPv4 only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_identifier: Option<DhcpClientIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iaid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duid: Option<DhcpClientDuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_dns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_ntp: Option<bool>,
}

impl DhcpClientConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn validate(&self, family: DhcpFamily) -> Result<(), NcmError> {
        if family == DhcpFamily::V6 && self.client_identifier.is_some() {
            return Err(NcmError::invalid(
                "ClientIdentifier is only supported by DHCPv4".to_string(),
            ));
        }
        if let Some(duid) = self.duid.as_ref() {
            duid.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct Dhcpv4ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u32>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lease_time: Option<u32>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lease_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_dns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_ntp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntp: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_router: Option<bool>,
}

impl Dhcpv4ServerConfig {
    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        if let Some(dns) = self.dns.as_ref() {
            dns.ensure_family(IpFamily::Ipv4, "DHCP server DNS")?;
        }
        if let Some(ntp) = self.ntp.as_ref() {
            ntp.ensure_family(IpFamily::Ipv4, "DHCP server NTP")?;
        }
        if let (Some(default), Some(max)) =
            (self.default_lease_time, self.max_lease_time)
        {
            if default > max {
                return Err(NcmError::invalid(format!(
                    "DHCP server default lease time {default} is larger \
                     than max lease time {max}"
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
    fn test_dhcp_mode_aliases() {
        assert_eq!(DhcpClientMode::from_str("both").unwrap(), DhcpClientMode::Yes);
        assert_eq!(DhcpClientMode::from_str("off").unwrap(), DhcpClientMode::No);
        assert_eq!(DhcpClientMode::from_str("v6").unwrap(), DhcpClientMode::Ipv6);
        assert_eq!(DhcpClientMode::Ipv4.to_string(), "ipv4");
    }

    #[test]
    fn test_dhcp_mode_unknown() {
        assert_eq!(
            DhcpClientMode::from_str("sometimes").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_duid_raw_data() {
        let mut duid = DhcpClientDuid::new(DuidType::Vendor);
        duid.raw_data = Some("00:00:ab:11:f9:2a".into());
        duid.validate().unwrap();
        duid.raw_data = Some("00:zz".into());
        assert!(duid.validate().is_err());
        duid.raw_data = Some("00::11".into());
        assert!(duid.validate().is_err());
    }

    #[test]
    fn test_client_identifier_v6() {
        let cfg = DhcpClientConfig {
            client_identifier: Some(DhcpClientIdentifier::Mac),
            ..Default::default()
        };
        cfg.validate(DhcpFamily::V4).unwrap();
        assert!(cfg.validate(DhcpFamily::V6).is_err());
    }

    #[test]
    fn test_server_lease_time() {
        let cfg = Dhcpv4ServerConfig {
            default_lease_time: Some(7200),
            max_lease_time: Some(3600),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
