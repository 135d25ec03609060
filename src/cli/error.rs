// SPDX-License-Identifier: Apache-2.0

use ncm::{ErrorKind, NcmError};
use nix::errno::Errno;

#[derive(Clone, Debug)]
pub(crate) struct CliError {
    msg: String,
    kind: Option<ErrorKind>,
}

impl CliError {
    /// Process exit code, the errno matching the error kind.
    pub(crate) fn exit_code(&self) -> i32 {
        let errno = match self.kind {
            None | Some(ErrorKind::InvalidInput) => Errno::EINVAL,
            Some(ErrorKind::NotFound) => Errno::ENOENT,
            Some(ErrorKind::NoSuchDevice) => Errno::ENODEV,
            Some(ErrorKind::PersistFailure) => Errno::EIO,
            Some(ErrorKind::ApplyFailure) => Errno::EREMOTEIO,
            Some(ErrorKind::OutOfMemory) => Errno::ENOMEM,
            Some(ErrorKind::ReloadFailure) => Errno::ECOMM,
            Some(_) => Errno::ENOTRECOVERABLE,
        };
        errno as i32
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CliError {}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        Self {
            msg: format!("serde_yaml::Error: {}", e),
            kind: Some(ErrorKind::Bug),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            msg: format!("serde_json::Error: {}", e),
            kind: Some(ErrorKind::Bug),
        }
    }
}

impl From<NcmError> for CliError {
    fn from(e: NcmError) -> Self {
        Self {
            msg: e.to_string(),
            kind: Some(e.kind()),
        }
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
            kind: None,
        }
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self { msg, kind: None }
    }
}
