// SPDX-License-Identifier: Apache-2.0

use super::encode::{address_section, is_address_section_of, SECTION_ADDRESS};
use super::ConfigPersister;
use crate::{AddressConfig, InterfaceHandle, IpAddress, NcmError};

impl ConfigPersister {
    /// One `[Address]` per address, an existing section with the same
    /// `Address=` is replaced in place.
    pub fn configure_address(
        &self,
        iface: &InterfaceHandle,
        addr: &AddressConfig,
    ) -> Result<(), NcmError> {
        addr.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.modify_network(iface, true, |sb| {
            sb.replace_or_push(address_section(addr), |s| {
                is_address_section_of(s, addr)
            });
            Ok(())
        })
    }

    /// Remove the `[Address]` section holding `addr`. Without explicit
    /// prefix length any prefix of that address matches. Removing an
    /// address which is not configured is not an error.
    pub fn delete_address(
        &self,
        iface: &InterfaceHandle,
        addr: &IpAddress,
    ) -> Result<(), NcmError> {
        self.modify_network(iface, false, |sb| {
            let removed = sb.remove_sections_if(SECTION_ADDRESS, |s| {
                s.get("Address")
                    .and_then(|v| v.parse::<IpAddress>().ok())
                    .is_some_and(|a| {
                        a.addr() == addr.addr()
                            && (!addr.has_prefix()
                                || a.prefix_length() == addr.prefix_length())
                    })
            });
            if removed == 0 {
                log::debug!("Address {addr} not found in config");
            }
            Ok(())
        })
    }
}
