// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use crate::{ErrorKind, NcmError};

/// Control of the daemon consuming the generated files.
pub trait NetworkDaemon {
    /// Ask the daemon to re-read every configuration file.
    fn reload(&mut self) -> impl Future<Output = Result<(), NcmError>>;

    /// Ask the daemon to re-apply the configuration of one link.
    fn reconfigure_link(
        &mut self,
        index: u32,
    ) -> impl Future<Output = Result<(), NcmError>>;
}

// Generated `NetworkdProxy` is private to this module
#[zbus::proxy(
    interface = "org.freedesktop.network1.Manager",
    default_service = "org.freedesktop.network1",
    default_path = "/org/freedesktop/network1"
)]
trait Networkd {
    fn reload(&self) -> zbus::Result<()>;

    fn reconfigure_link(&self, ifindex: i32) -> zbus::Result<()>;
}

/// [NetworkDaemon] talking to systemd-networkd over the system bus.
pub struct NetworkdDbus<'a> {
    proxy: NetworkdProxy<'a>,
}

impl NetworkdDbus<'_> {
    pub async fn new() -> Result<Self, NcmError> {
        let connection = zbus::Connection::system().await.map_err(|e| {
            NcmError::new(
                ErrorKind::ReloadFailure,
                format!("Failed to create system DBUS connection: {e}"),
            )
        })?;
        let proxy = NetworkdProxy::new(&connection).await.map_err(|e| {
            NcmError::new(
                ErrorKind::ReloadFailure,
                format!("Failed to create DBUS proxy to networkd: {e}"),
            )
        })?;
        Ok(Self { proxy })
    }
}

impl NetworkDaemon for NetworkdDbus<'_> {
    async fn reload(&mut self) -> Result<(), NcmError> {
        log::debug!("Requesting networkd to reload");
        self.proxy.reload().await.map_err(|e| {
            NcmError::new(
                ErrorKind::ReloadFailure,
                format!("Failed to reload networkd: {e}"),
            )
        })
    }

    async fn reconfigure_link(&mut self, index: u32) -> Result<(), NcmError> {
        log::debug!("Requesting networkd to reconfigure link {index}");
        let ifindex = i32::try_from(index).map_err(|_| {
            NcmError::invalid(format!("Invalid interface index {index}"))
        })?;
        self.proxy.reconfigure_link(ifindex).await.map_err(|e| {
            NcmError::new(
                ErrorKind::ReloadFailure,
                format!("Failed to reconfigure link {index}: {e}"),
            )
        })
    }
}
