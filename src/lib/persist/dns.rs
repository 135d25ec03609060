// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::encode::SECTION_NETWORK;
use super::ConfigPersister;
use crate::{
    config_file, model::validate_word, DnsScope, InterfaceHandle, IpAddress,
    NcmError,
};

const SECTION_RESOLVE: &str = "Resolve";
const SECTION_TIME: &str = "Time";

impl ConfigPersister {
    /// Append DNS servers to `[Network] DNS=` of the interface file. With
    /// `scope.global` they are also merged into the resolver configuration.
    pub fn add_dns_servers(
        &self,
        iface: &InterfaceHandle,
        servers: &[IpAddress],
        scope: DnsScope,
    ) -> Result<(), NcmError> {
        let servers: Vec<String> =
            servers.iter().map(|s| s.to_string()).collect();
        self.add_network_words(iface, "DNS", &servers)?;
        if scope.global {
            let (added, _) = config_file::write_resolver_config(
                &self.config.resolved_conf,
                &servers,
                &[],
            )
            .map_err(|e| e.with_iface(iface.name()))?;
            self.record_resolver_values(iface, &added, &[])?;
        }
        Ok(())
    }

    /// Like [Self::add_dns_servers] but for search domains.
    pub fn add_dns_domains(
        &self,
        iface: &InterfaceHandle,
        domains: &[String],
        scope: DnsScope,
    ) -> Result<(), NcmError> {
        for domain in domains {
            validate_word(domain).map_err(|e| e.with_iface(iface.name()))?;
        }
        self.add_network_words(iface, "Domains", domains)?;
        if scope.global {
            let (_, added) = config_file::write_resolver_config(
                &self.config.resolved_conf,
                &[],
                domains,
            )
            .map_err(|e| e.with_iface(iface.name()))?;
            self.record_resolver_values(iface, &[], &added)?;
        }
        Ok(())
    }

    /// Drop `DNS=` and `Domains=` of the interface, and from the resolver
    /// configuration exactly the values this interface inserted there.
    pub fn revert_dns_and_domains(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            sb.unset(SECTION_NETWORK, "DNS");
            sb.unset(SECTION_NETWORK, "Domains");
            Ok(())
        })?;
        let record_path = self.resolver_record_path(iface);
        let record = config_file::read_or_default(&record_path)
            .map_err(|e| e.with_iface(iface.name()))?;
        let (dns, domains) = match record.section(SECTION_RESOLVE) {
            Some(section) => {
                (section.get_words("DNS"), section.get_words("Domains"))
            }
            None => (Vec::new(), Vec::new()),
        };
        if (!dns.is_empty() || !domains.is_empty())
            && self.config.resolved_conf.exists()
        {
            config_file::modify(&self.config.resolved_conf, true, |sb| {
                if let Some(section) = sb.section_mut(SECTION_RESOLVE) {
                    config_file::remove_words(section, "DNS", &dns);
                    config_file::remove_words(section, "Domains", &domains);
                }
                sb.remove_sections_if(SECTION_RESOLVE, |s| s.is_bare());
                Ok(())
            })
            .map_err(|e| e.with_iface(iface.name()))?;
        }
        config_file::remove_file(&record_path)?;
        Ok(())
    }

    // Values this interface inserted into the resolver configuration
    fn resolver_record_path(&self, iface: &InterfaceHandle) -> PathBuf {
        self.config
            .state_dir
            .join(format!("resolved-{}.conf", iface.name()))
    }

    fn record_resolver_values(
        &self,
        iface: &InterfaceHandle,
        dns: &[String],
        domains: &[String],
    ) -> Result<(), NcmError> {
        if dns.is_empty() && domains.is_empty() {
            return Ok(());
        }
        config_file::modify(&self.resolver_record_path(iface), false, |sb| {
            let section = sb.section_or_insert(SECTION_RESOLVE);
            config_file::merge_words(section, "DNS", dns);
            config_file::merge_words(section, "Domains", domains);
            Ok(())
        })
        .map_err(|e| e.with_iface(iface.name()))
    }

    /// Search domains of the resolver configuration.
    pub fn read_system_domains(&self) -> Result<Vec<String>, NcmError> {
        let sections =
            config_file::read_or_default(&self.config.resolved_conf)?;
        Ok(sections
            .section(SECTION_RESOLVE)
            .map(|s| s.get_words("Domains"))
            .unwrap_or_default())
    }

    /// Add NTP servers to `[Network] NTP=` of the interface, replacing the
    /// existing list unless `append` is set.
    pub fn add_ntp(
        &self,
        iface: &InterfaceHandle,
        servers: &[String],
        append: bool,
    ) -> Result<(), NcmError> {
        for server in servers {
            validate_word(server).map_err(|e| e.with_iface(iface.name()))?;
        }
        if append {
            self.add_network_words(iface, "NTP", servers)
        } else if servers.is_empty() {
            Err(NcmError::invalid("No NTP server defined".to_string())
                .with_iface(iface.name()))
        } else {
            self.modify_network(iface, true, |sb| {
                sb.set(SECTION_NETWORK, "NTP", servers.join(" ").as_str());
                Ok(())
            })
        }
    }

    pub fn remove_ntp(&self, iface: &InterfaceHandle) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            sb.unset(SECTION_NETWORK, "NTP");
            Ok(())
        })
    }

    /// Merge NTP servers into the time synchronization daemon config.
    pub fn add_system_ntp(&self, servers: &[String]) -> Result<(), NcmError> {
        for server in servers {
            validate_word(server)?;
        }
        config_file::modify(&self.config.timesyncd_conf, false, |sb| {
            config_file::merge_words(
                sb.section_or_insert(SECTION_TIME),
                "NTP",
                servers,
            );
            sb.remove_sections_if(SECTION_TIME, |s| s.is_bare());
            Ok(())
        })
    }

    /// Remove exactly `servers` from the time synchronization daemon config.
    pub fn remove_system_ntp(
        &self,
        servers: &[String],
    ) -> Result<(), NcmError> {
        config_file::modify(&self.config.timesyncd_conf, true, |sb| {
            if let Some(section) = sb.section_mut(SECTION_TIME) {
                config_file::remove_words(section, "NTP", servers);
            }
            sb.remove_sections_if(SECTION_TIME, |s| s.is_bare());
            Ok(())
        })
    }

    fn add_network_words(
        &self,
        iface: &InterfaceHandle,
        key: &str,
        values: &[String],
    ) -> Result<(), NcmError> {
        if values.is_empty() {
            return Err(NcmError::invalid(format!("No {key} value defined"))
                .with_iface(iface.name()));
        }
        self.modify_network(iface, true, |sb| {
            config_file::merge_words(
                sb.section_or_insert(SECTION_NETWORK),
                key,
                values,
            );
            Ok(())
        })
    }
}
