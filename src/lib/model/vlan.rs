// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{validate_iface_name, InterfaceHandle};
use crate::NcmError;

const VLAN_ID_MAX: u16 = 4094;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct VlanDescriptor {
    pub name: String,
    pub id: u16,
    pub parent: InterfaceHandle,
}

impl VlanDescriptor {
    pub fn new(
        name: &str,
        id: u16,
        parent: InterfaceHandle,
    ) -> Result<Self, NcmError> {
        let vlan = Self {
            name: name.to_string(),
            id,
            parent,
        };
        vlan.validate()?;
        Ok(vlan)
    }

    pub(crate) fn validate(&self) -> Result<(), NcmError> {
        validate_iface_name(&self.name)?;
        if self.id == 0 || self.id > VLAN_ID_MAX {
            return Err(NcmError::invalid(format!(
                "Invalid VLAN id {} of {}, should be in the range of 1 to \
                 {VLAN_ID_MAX}",
                self.id, self.name
            )));
        }
        if self.name == self.parent.name() {
            return Err(NcmError::invalid(format!(
                "VLAN {} cannot be its own parent",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vlan_id_range() {
        let parent = InterfaceHandle::new("eth0").unwrap();
        assert!(VlanDescriptor::new("eth0.0", 0, parent.clone()).is_err());
        assert!(VlanDescriptor::new("eth0.4095", 4095, parent.clone()).is_err());
        assert!(VlanDescriptor::new("eth0.10", 10, parent).is_ok());
    }
}
