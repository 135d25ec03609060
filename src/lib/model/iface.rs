// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::NcmError;

// IFNAMSIZ minus the trailing NUL
const IFACE_NAME_MAX_LEN: usize = 15;

/// Interface identified by name, with the kernel index once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceHandle {
    name: String,
    index: Option<u32>,
}

impl InterfaceHandle {
    pub fn new(name: &str) -> Result<Self, NcmError> {
        validate_iface_name(name)?;
        Ok(Self {
            name: name.to_string(),
            index: None,
        })
    }

    pub fn with_index(name: &str, index: u32) -> Result<Self, NcmError> {
        let mut ret = Self::new(name)?;
        ret.index = Some(index);
        Ok(ret)
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }
}

/// `[Match] Name=` glob matching every interface, used for options which
/// do not name one.
pub(crate) const ANY_IFACE: &str = "*";

pub(crate) fn validate_iface_name(name: &str) -> Result<(), NcmError> {
    if name.is_empty() {
        return Err(NcmError::invalid(
            "Interface name should not be empty".to_string(),
        ));
    }
    if name.len() > IFACE_NAME_MAX_LEN {
        return Err(NcmError::invalid(format!(
            "Interface name {name} is longer than {IFACE_NAME_MAX_LEN} \
             characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(NcmError::invalid(format!(
            "Invalid interface name {name}"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| *c == '/' || *c == ':' || c.is_whitespace())
    {
        return Err(NcmError::invalid(format!(
            "Interface name {name} contains invalid character '{c}'"
        )));
    }
    Ok(())
}

impl FromStr for InterfaceHandle {
    type Err = NcmError;

    fn from_str(s: &str) -> Result<Self, NcmError> {
        Self::new(s)
    }
}

impl TryFrom<String> for InterfaceHandle {
    type Error = NcmError;

    fn try_from(s: String) -> Result<Self, NcmError> {
        Self::new(s.as_str())
    }
}

impl From<InterfaceHandle> for String {
    fn from(v: InterfaceHandle) -> Self {
        v.name
    }
}

impl std::fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            InterfaceHandle::new("").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_long_name_rejected() {
        assert!(InterfaceHandle::new("abcdefghijklmnop").is_err());
        assert!(InterfaceHandle::new("abcdefghijklmno").is_ok());
    }

    #[test]
    fn test_name_with_slash_rejected() {
        assert!(InterfaceHandle::new("../eth0").is_err());
        assert!(InterfaceHandle::new("eth 0").is_err());
    }
}
