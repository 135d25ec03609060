// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Please report this as bug to upstream
    Bug,
    /// Structurally invalid value: bad prefix length, empty interface name,
    /// unknown enum value, malformed MAC or DUID
    InvalidInput,
    /// Configuration file of the interface does not exist
    NotFound,
    /// Interface cannot be resolved or disappeared
    NoSuchDevice,
    /// Failed to write or rename configuration file
    PersistFailure,
    /// Kernel rejected the request for a reason other than existence
    ApplyFailure,
    /// Allocation failure
    OutOfMemory,
    /// Managed daemon did not acknowledge the reload request
    ReloadFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::InvalidInput => "invalid-input",
            Self::NotFound => "not-found",
            Self::NoSuchDevice => "no-such-device",
            Self::PersistFailure => "persist-failure",
            Self::ApplyFailure => "apply-failure",
            Self::OutOfMemory => "out-of-memory",
            Self::ReloadFailure => "reload-failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Try not implement From for NcmError here unless you are sure this
// error should always convert to certain type of ErrorKind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NcmError {
    pub kind: ErrorKind,
    pub msg: String,
    /// Interface this error is about, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub iface: Option<String>,
}

impl std::fmt::Display for NcmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(iface) = self.iface.as_deref() {
            write!(f, "{}: {iface}: {}", self.kind, self.msg)
        } else {
            write!(f, "{}: {}", self.kind, self.msg)
        }
    }
}

impl NcmError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self {
            kind,
            msg,
            iface: None,
        }
    }

    pub(crate) fn invalid(msg: String) -> Self {
        Self::new(ErrorKind::InvalidInput, msg)
    }

    /// Attach the interface name unless one is already set.
    pub fn with_iface(mut self, iface: &str) -> Self {
        if self.iface.is_none() {
            self.iface = Some(iface.to_string());
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }

    pub fn iface(&self) -> Option<&str> {
        self.iface.as_deref()
    }
}

impl std::error::Error for NcmError {}

impl From<std::io::Error> for NcmError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::OutOfMemory {
            Self::new(ErrorKind::OutOfMemory, format!("std::io::Error: {e}"))
        } else {
            Self::new(ErrorKind::PersistFailure, format!("std::io::Error: {e}"))
        }
    }
}

impl From<std::net::AddrParseError> for NcmError {
    fn from(e: std::net::AddrParseError) -> Self {
        Self::invalid(format!("Invalid IP address: {e}"))
    }
}

impl From<serde_yaml::Error> for NcmError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::invalid(format!("serde_yaml::Error: {e}"))
    }
}

impl From<serde_json::Error> for NcmError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Bug, format!("serde_json::Error: {e}"))
    }
}

impl From<std::collections::TryReserveError> for NcmError {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::new(ErrorKind::OutOfMemory, format!("{e}"))
    }
}
