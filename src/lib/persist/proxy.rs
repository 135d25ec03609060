// SPDX-License-Identifier: Apache-2.0

use super::ConfigPersister;
use crate::{config_file, NcmError, ProxyConfig, Section};

const KEY_ENABLED: &str = "PROXY_ENABLED";
const KEY_NO_PROXY: &str = "NO_PROXY";

// The proxy file is sourced by shells, hence every entry lives in the
// nameless section and values are double quoted.
impl ConfigPersister {
    /// Write every proxy key of `cfg`, dropping the ones it leaves unset.
    /// Other variables of the file are kept.
    pub fn configure_proxy(&self, cfg: &ProxyConfig) -> Result<(), NcmError> {
        cfg.validate()?;
        config_file::modify(&self.config.proxy_conf, false, |sb| {
            let section = sb.section_or_insert("");
            let enabled = if cfg.enabled { "yes" } else { "no" };
            section.set(KEY_ENABLED, quote(enabled).as_str());
            for (key, value) in cfg.urls() {
                match value {
                    Some(v) => {
                        section.set(key, quote(v).as_str());
                    }
                    None => {
                        section.unset(key);
                    }
                }
            }
            if cfg.no_proxy.is_empty() {
                section.unset(KEY_NO_PROXY);
            } else {
                let no_proxy: Vec<&str> =
                    cfg.no_proxy.iter().map(|s| s.as_str()).collect();
                section.set(KEY_NO_PROXY, quote(&no_proxy.join(", ")).as_str());
            }
            Ok(())
        })
    }

    /// Remove every proxy key from the proxy file.
    pub fn remove_proxy(&self) -> Result<(), NcmError> {
        config_file::modify(&self.config.proxy_conf, true, |sb| {
            if let Some(section) = sb.section_mut("") {
                remove_proxy_keys(section);
            }
            Ok(())
        })
    }

    /// Proxy settings of the proxy file, the default (disabled) settings
    /// when the file does not exist.
    pub fn read_proxy(&self) -> Result<ProxyConfig, NcmError> {
        let sections = config_file::read_or_default(&self.config.proxy_conf)?;
        let mut cfg = ProxyConfig::default();
        let Some(section) = sections.section("") else {
            return Ok(cfg);
        };
        let get = |key: &str| -> Option<String> {
            section
                .get(key)
                .map(unquote)
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };
        cfg.enabled = get(KEY_ENABLED).as_deref() == Some("yes");
        cfg.http = get("HTTP_PROXY");
        cfg.https = get("HTTPS_PROXY");
        cfg.ftp = get("FTP_PROXY");
        cfg.gopher = get("GOPHER_PROXY");
        cfg.socks = get("SOCKS_PROXY");
        cfg.socks5 = get("SOCKS5_SERVER");
        if let Some(no_proxy) = get(KEY_NO_PROXY) {
            cfg.no_proxy = no_proxy
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }
        Ok(cfg)
    }
}

fn remove_proxy_keys(section: &mut Section) {
    section.unset(KEY_ENABLED);
    for (key, _) in ProxyConfig::default().urls() {
        section.unset(key);
    }
    section.unset(KEY_NO_PROXY);
}

fn quote(value: &str) -> String {
    format!("\"{value}\"")
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
