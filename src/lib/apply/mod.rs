// SPDX-License-Identifier: Apache-2.0

mod channel;
mod rtnl;

use std::collections::HashMap;
use std::time::Duration;

use nix::errno::Errno;

pub use self::channel::{NetlinkChannel, NetlinkFailure, NetlinkRequest};
pub use self::rtnl::RtnlChannel;

use crate::{
    AddressConfig, Dhcpv4ServerConfig, ErrorKind, InterfaceHandle, IpAddress,
    LinkFlag, LinkState, MacAddress, NcmError, NetworkDaemon, RetryConfig,
    Route, RouterAdvertisementConfig, RoutingPolicyRule, VlanDescriptor,
};

/// Apply model types to the running kernel.
///
/// Nothing is persisted, callers needing the change to survive a reload
/// pair each call with the matching [crate::ConfigPersister] operation.
pub struct LiveApplier<C, D> {
    channel: C,
    daemon: D,
    retry: RetryConfig,
    index_cache: HashMap<String, u32>,
}

impl<C, D> LiveApplier<C, D>
where
    C: NetlinkChannel,
    D: NetworkDaemon,
{
    pub fn new(channel: C, daemon: D, retry: RetryConfig) -> Self {
        Self {
            channel,
            daemon,
            retry,
            index_cache: HashMap::new(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn daemon_mut(&mut self) -> &mut D {
        &mut self.daemon
    }

    /// Kernel index of `iface`, cached until the kernel reports the device
    /// gone.
    pub async fn resolve(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<u32, NcmError> {
        if let Some(index) = self.index_cache.get(iface.name()) {
            return Ok(*index);
        }
        let index = match self.channel.link_index(iface.name()).await {
            Ok(i) => i,
            Err(NetlinkFailure::Errno(e)) if e == Errno::ENODEV as i32 => {
                return Err(no_such_device(iface.name()));
            }
            Err(e) => {
                return Err(NcmError::new(
                    ErrorKind::ApplyFailure,
                    format!("Failed to resolve interface index: {e}"),
                )
                .with_iface(iface.name()));
            }
        };
        log::trace!("Interface {} has index {index}", iface.name());
        self.index_cache.insert(iface.name().to_string(), index);
        Ok(index)
    }

    pub fn invalidate(&mut self, iface: &InterfaceHandle) {
        self.index_cache.remove(iface.name());
    }

    pub async fn set_link_mtu(
        &mut self,
        iface: &InterfaceHandle,
        mtu: u32,
    ) -> Result<(), NcmError> {
        if mtu == 0 {
            return Err(NcmError::invalid("MTU should not be 0".to_string())
                .with_iface(iface.name()));
        }
        self.send_to(iface, |index| NetlinkRequest::SetLinkMtu { index, mtu })
            .await
    }

    pub async fn set_link_mac(
        &mut self,
        iface: &InterfaceHandle,
        mac: &MacAddress,
    ) -> Result<(), NcmError> {
        let mac = *mac;
        self.send_to(iface, |index| NetlinkRequest::SetLinkAddress {
            index,
            mac,
        })
        .await
    }

    pub async fn set_link_state(
        &mut self,
        iface: &InterfaceHandle,
        state: LinkState,
    ) -> Result<(), NcmError> {
        self.send_to(iface, |index| NetlinkRequest::SetLinkState {
            index,
            state,
        })
        .await
    }

    pub async fn set_link_group(
        &mut self,
        iface: &InterfaceHandle,
        group: u32,
    ) -> Result<(), NcmError> {
        self.send_to(iface, |index| NetlinkRequest::SetLinkGroup {
            index,
            group,
        })
        .await
    }

    /// Only flags with [LinkFlag::is_live] can be applied.
    pub async fn set_link_flag(
        &mut self,
        iface: &InterfaceHandle,
        flag: LinkFlag,
        value: bool,
    ) -> Result<(), NcmError> {
        if !flag.is_live() {
            return Err(NcmError::invalid(format!(
                "Link flag {flag} cannot be changed on a live link"
            ))
            .with_iface(iface.name()));
        }
        self.send_to(iface, |index| NetlinkRequest::SetLinkFlag {
            index,
            flag,
            value,
        })
        .await
    }

    pub async fn configure_address(
        &mut self,
        iface: &InterfaceHandle,
        address: &AddressConfig,
    ) -> Result<(), NcmError> {
        address.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.send_to(iface, |index| NetlinkRequest::AddAddress {
            index,
            address: address.clone(),
        })
        .await
    }

    pub async fn delete_address(
        &mut self,
        iface: &InterfaceHandle,
        address: &IpAddress,
    ) -> Result<(), NcmError> {
        let address = *address;
        self.send_to(iface, |index| NetlinkRequest::DelAddress {
            index,
            address,
        })
        .await
    }

    pub async fn configure_route(
        &mut self,
        iface: &InterfaceHandle,
        route: &Route,
    ) -> Result<(), NcmError> {
        route.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.send_to(iface, |index| NetlinkRequest::AddRoute {
            index,
            route: route.clone(),
        })
        .await
    }

    pub async fn configure_policy_rule(
        &mut self,
        rule: &RoutingPolicyRule,
    ) -> Result<(), NcmError> {
        rule.validate()?;
        self.resolve_rule_interfaces(rule).await?;
        self.send(&NetlinkRequest::AddRule { rule: rule.clone() })
            .await
    }

    pub async fn remove_policy_rule(
        &mut self,
        rule: &RoutingPolicyRule,
    ) -> Result<(), NcmError> {
        rule.validate()?;
        self.send(&NetlinkRequest::DelRule { rule: rule.clone() })
            .await
    }

    /// The DHCPv4 server runs inside the managed daemon, which is asked to
    /// reconfigure the link after its file gained the server settings.
    pub async fn start_dhcpv4_server(
        &mut self,
        iface: &InterfaceHandle,
        cfg: &Dhcpv4ServerConfig,
    ) -> Result<(), NcmError> {
        cfg.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.reconfigure_link(iface).await
    }

    pub async fn stop_dhcpv4_server(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.reconfigure_link(iface).await
    }

    /// Router advertisement is sent by the managed daemon, see
    /// [Self::start_dhcpv4_server].
    pub async fn enable_router_advertisement(
        &mut self,
        iface: &InterfaceHandle,
        cfg: &RouterAdvertisementConfig,
    ) -> Result<(), NcmError> {
        cfg.validate().map_err(|e| e.with_iface(iface.name()))?;
        self.reconfigure_link(iface).await
    }

    pub async fn disable_router_advertisement(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.reconfigure_link(iface).await
    }

    pub async fn create_vlan(
        &mut self,
        vlan: &VlanDescriptor,
    ) -> Result<(), NcmError> {
        vlan.validate().map_err(|e| e.with_iface(&vlan.name))?;
        let name = vlan.name.clone();
        let id = vlan.id;
        self.send_to(&vlan.parent, |parent_index| NetlinkRequest::AddVlan {
            name: name.clone(),
            parent_index,
            id,
        })
        .await
        .map_err(|e| e.with_iface(&vlan.name))
    }

    /// Delete the netdevice. An interface already gone is not an error.
    pub async fn remove_netdev(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        let result = self
            .send_to(iface, |index| NetlinkRequest::DelLink { index })
            .await;
        self.invalidate(iface);
        match result {
            Err(e) if e.kind() == ErrorKind::NoSuchDevice => Ok(()),
            r => r,
        }
    }

    /// Ask the managed daemon to re-apply the files of `iface`.
    pub async fn reconfigure_link(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        let index = self.resolve(iface).await?;
        self.daemon
            .reconfigure_link(index)
            .await
            .map_err(|e| e.with_iface(iface.name()))
    }

    pub async fn reload(&mut self) -> Result<(), NcmError> {
        self.daemon.reload().await
    }

    async fn resolve_rule_interfaces(
        &mut self,
        rule: &RoutingPolicyRule,
    ) -> Result<(), NcmError> {
        for iface in [&rule.input_interface, &rule.output_interface]
            .into_iter()
            .flatten()
        {
            self.resolve(iface).await?;
        }
        Ok(())
    }

    // Resolve `iface`, send the request built for its index. When the
    // kernel reports the device gone, the cached index is dropped and the
    // request resent once with the index resolved again.
    async fn send_to<F>(
        &mut self,
        iface: &InterfaceHandle,
        build: F,
    ) -> Result<(), NcmError>
    where
        F: Fn(u32) -> NetlinkRequest,
    {
        let index = self.resolve(iface).await?;
        let result = match self.send(&build(index)).await {
            Err(e) if e.kind() == ErrorKind::NoSuchDevice => {
                log::debug!(
                    "Interface {} index {index} is stale, resolving again",
                    iface.name()
                );
                self.invalidate(iface);
                let index = self.resolve(iface).await?;
                self.send(&build(index)).await
            }
            r => r,
        };
        result.map_err(|e| e.with_iface(iface.name()))
    }

    async fn send(&mut self, req: &NetlinkRequest) -> Result<(), NcmError> {
        let mut attempt = 1;
        loop {
            log::debug!("Kernel request: {req}");
            let errno = match self.channel.request(req).await {
                Ok(()) => return Ok(()),
                Err(NetlinkFailure::Errno(errno)) => errno,
                Err(NetlinkFailure::Other(msg)) => {
                    return Err(NcmError::new(
                        ErrorKind::ApplyFailure,
                        format!("Failed to {req}: {msg}"),
                    ));
                }
            };
            match Errno::from_i32(errno) {
                Errno::EEXIST if req.is_add() => {
                    log::debug!("Already exists, ignoring: {req}");
                    return Ok(());
                }
                Errno::ENOENT | Errno::EADDRNOTAVAIL | Errno::ESRCH
                    if req.is_delete() =>
                {
                    log::debug!("Not present, ignoring: {req}");
                    return Ok(());
                }
                Errno::ENODEV => {
                    return Err(NcmError::new(
                        ErrorKind::NoSuchDevice,
                        format!("Failed to {req}: {}", Errno::ENODEV.desc()),
                    ));
                }
                Errno::EBUSY | Errno::EINTR | Errno::EAGAIN
                    if attempt < self.retry.attempts =>
                {
                    let delay = Duration::from_millis(
                        self.retry.backoff_ms.saturating_mul(attempt.into()),
                    );
                    log::debug!(
                        "Attempt {attempt} to {req} failed with {}, retry in \
                         {delay:?}",
                        Errno::from_i32(errno).desc()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                e => {
                    return Err(NcmError::new(
                        ErrorKind::ApplyFailure,
                        format!("Failed to {req}: {}", e.desc()),
                    ));
                }
            }
        }
    }
}

fn no_such_device(iface: &str) -> NcmError {
    NcmError::new(
        ErrorKind::NoSuchDevice,
        "Interface does not exist".to_string(),
    )
    .with_iface(iface)
}
