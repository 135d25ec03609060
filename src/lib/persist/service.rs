// SPDX-License-Identifier: Apache-2.0

use super::encode::{
    dhcp_server_section, ra_sections, SECTION_DHCP_SERVER, SECTION_NETWORK,
    SECTION_RA, SECTION_RA_PREFIX, SECTION_RA_ROUTE_PREFIX,
};
use super::ConfigPersister;
use crate::{
    Dhcpv4ServerConfig, InterfaceHandle, NcmError, RouterAdvertisementConfig,
};

impl ConfigPersister {
    /// `[Network] DHCPServer=yes` plus a `[DHCPServer]` replacing the
    /// previous one.
    pub fn configure_dhcpv4_server(
        &self,
        iface: &InterfaceHandle,
        cfg: &Dhcpv4ServerConfig,
    ) -> Result<(), NcmError> {
        cfg.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.modify_network(iface, true, |sb| {
            sb.section_or_insert(SECTION_NETWORK)
                .set_bool("DHCPServer", true);
            sb.replace_or_push(dhcp_server_section(cfg), |_| true);
            Ok(())
        })
    }

    pub fn remove_dhcpv4_server(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            sb.unset(SECTION_NETWORK, "DHCPServer");
            sb.remove_sections(SECTION_DHCP_SERVER);
            Ok(())
        })
    }

    /// `[Network] IPv6SendRA=yes` plus `[IPv6SendRA]`, `[IPv6Prefix]` and
    /// `[IPv6RoutePrefix]`, replacing what was there.
    pub fn configure_router_advertisement(
        &self,
        iface: &InterfaceHandle,
        cfg: &RouterAdvertisementConfig,
    ) -> Result<(), NcmError> {
        cfg.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.modify_network(iface, true, |sb| {
            sb.section_or_insert(SECTION_NETWORK)
                .set_bool("IPv6SendRA", true);
            remove_ra_sections(sb);
            for section in ra_sections(cfg) {
                sb.push(section);
            }
            Ok(())
        })
    }

    pub fn remove_router_advertisement(
        &self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            sb.unset(SECTION_NETWORK, "IPv6SendRA");
            remove_ra_sections(sb);
            Ok(())
        })
    }
}

fn remove_ra_sections(sb: &mut crate::SectionBuilder) {
    for name in [SECTION_RA, SECTION_RA_PREFIX, SECTION_RA_ROUTE_PREFIX] {
        sb.remove_sections(name);
    }
}
