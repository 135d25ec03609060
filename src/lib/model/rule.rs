// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{common_family, InterfaceHandle, IpAddress, IpFamily};
use crate::NcmError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct RoutingPolicyRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_interface: Option<InterfaceHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_interface: Option<InterfaceHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<IpAddress>,
    pub table: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tos: Option<u8>,
}

impl RoutingPolicyRule {
    pub fn new(table: u32) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    /// IPv4 unless an address says otherwise.
    pub fn family(&self) -> IpFamily {
        self.from
            .as_ref()
            .or(self.to.as_ref())
            .map(|a| a.family())
            .unwrap_or(IpFamily::Ipv4)
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        if self.table == 0 {
            return Err(NcmError::invalid(
                "Routing policy rule table should not be 0".to_string(),
            ));
        }
        if self.input_interface.is_none()
            && self.output_interface.is_none()
            && self.to.is_none()
            && self.from.is_none()
            && self.tos.is_none()
        {
            return Err(NcmError::invalid(
                "Routing policy rule should have at least one of \
                 from, to, tos, incoming or outgoing interface defined"
                    .to_string(),
            ));
        }
        common_family(&[("From", self.from.as_ref()), ("To", self.to.as_ref())])?;
        Ok(())
    }
}
