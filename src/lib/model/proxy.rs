// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::NcmError;

/// System wide proxy settings exported to the environment of login shells.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ftp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gopher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socks5: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub no_proxy: BTreeSet<String>,
}

impl ProxyConfig {
    pub(crate) fn urls(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("HTTP_PROXY", self.http.as_deref()),
            ("HTTPS_PROXY", self.https.as_deref()),
            ("FTP_PROXY", self.ftp.as_deref()),
            ("GOPHER_PROXY", self.gopher.as_deref()),
            ("SOCKS_PROXY", self.socks.as_deref()),
            ("SOCKS5_SERVER", self.socks5.as_deref()),
        ]
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        let values = self
            .urls()
            .into_iter()
            .filter_map(|(key, v)| v.map(|v| (key, v)))
            .chain(self.no_proxy.iter().map(|v| ("NO_PROXY", v.as_str())));
        for (key, value) in values {
            if value.is_empty()
                || value
                    .chars()
                    .any(|c| c.is_whitespace() || c == '"' || c == '\\')
            {
                return Err(NcmError::invalid(format!(
                    "Invalid {key} value '{value}', should not be empty or \
                     contain whitespace, quote or backslash"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proxy_value_with_space() {
        let mut cfg = ProxyConfig {
            enabled: true,
            http: Some("http://proxy.example.org:3128/".into()),
            ..Default::default()
        };
        cfg.validate().unwrap();
        cfg.no_proxy.insert("local host".into());
        assert!(cfg.validate().is_err());
    }
}
