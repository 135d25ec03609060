// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use crate::{
    config_file, AddressConfig, ConfigPersister, Dhcpv4ServerConfig,
    GenerateReport, InterfaceHandle, IpAddress, LinkFlag, LinkState,
    LiveApplier, MacAddress, NcmConfig, NcmError, NetlinkChannel, Network,
    NetworkDaemon, Route, RouterAdvertisementConfig, RoutingPolicyRule,
    VlanDescriptor,
};

/// Entry point pairing the [ConfigPersister] with the [LiveApplier].
///
/// Declarative generation only writes files. The single purpose operations
/// persist first and then apply the same change to the running kernel.
pub struct NetworkManager<C, D> {
    persister: ConfigPersister,
    applier: LiveApplier<C, D>,
}

impl<C, D> NetworkManager<C, D>
where
    C: NetlinkChannel,
    D: NetworkDaemon,
{
    pub fn new(config: NcmConfig, channel: C, daemon: D) -> Self {
        let retry = config.retry;
        Self {
            persister: ConfigPersister::new(config),
            applier: LiveApplier::new(channel, daemon, retry),
        }
    }

    pub fn persister(&self) -> &ConfigPersister {
        &self.persister
    }

    pub fn applier_mut(&mut self) -> &mut LiveApplier<C, D> {
        &mut self.applier
    }

    /// Write the files of every network in declaration order. A failing
    /// interface does not stop the others. No live change is made.
    pub fn generate_from_declarative_source(
        &self,
        networks: &[Network],
    ) -> GenerateReport {
        self.persister.generate_from_declarative_source(networks)
    }

    pub fn generate_from_yaml(
        &self,
        path: &Path,
    ) -> Result<GenerateReport, NcmError> {
        self.persister.generate_from_yaml(path)
    }

    pub fn generate_from_command_line(
        &self,
        file: Option<&Path>,
        line: Option<&str>,
    ) -> Result<GenerateReport, NcmError> {
        self.persister.generate_from_command_line(file, line)
    }

    pub async fn reload_network(&mut self) -> Result<(), NcmError> {
        self.applier.reload().await
    }

    /// Rewrite the file of `iface` in canonical form, then ask the managed
    /// daemon to re-apply it.
    pub async fn reconfigure_link(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        let path = self.persister.network_file_path(iface)?;
        let sections = config_file::read(&path)
            .map_err(|e| e.with_iface(iface.name()))?;
        config_file::write_full(&path, sections.to_string().as_str())
            .map_err(|e| e.with_iface(iface.name()))?;
        self.applier.reconfigure_link(iface).await
    }

    /// Replace the file of the interface with the one generated from
    /// `network` and ask the managed daemon to re-apply it.
    pub async fn reapply_network(
        &mut self,
        network: &Network,
    ) -> Result<PathBuf, NcmError> {
        network.validate()?;
        let iface = network.handle()?;
        let old_path = self.persister.network_file_path(&iface)?;
        let path = self.persister.write_network(network)?;
        if old_path != path {
            config_file::remove_file(&old_path)
                .map_err(|e| e.with_iface(iface.name()))?;
        }
        self.applier.reconfigure_link(&iface).await?;
        Ok(path)
    }

    pub async fn set_link_mtu(
        &mut self,
        iface: &InterfaceHandle,
        mtu: u32,
    ) -> Result<(), NcmError> {
        self.persister.set_link_mtu(iface, mtu)?;
        self.applier.set_link_mtu(iface, mtu).await
    }

    pub async fn set_link_mac(
        &mut self,
        iface: &InterfaceHandle,
        mac: &MacAddress,
    ) -> Result<(), NcmError> {
        self.persister.set_link_mac(iface, mac)?;
        self.applier.set_link_mac(iface, mac).await
    }

    pub async fn set_link_group(
        &mut self,
        iface: &InterfaceHandle,
        group: u32,
    ) -> Result<(), NcmError> {
        self.persister.set_link_group(iface, group)?;
        self.applier.set_link_group(iface, group).await
    }

    /// Flags the kernel cannot change on a live link are only persisted.
    pub async fn set_link_flag(
        &mut self,
        iface: &InterfaceHandle,
        flag: LinkFlag,
        value: bool,
    ) -> Result<(), NcmError> {
        self.persister.set_link_flag(iface, flag, value)?;
        if flag.is_live() {
            self.applier.set_link_flag(iface, flag, value).await
        } else {
            Ok(())
        }
    }

    /// Live only, the persisted equivalent is the activation policy.
    pub async fn set_link_state(
        &mut self,
        iface: &InterfaceHandle,
        state: LinkState,
    ) -> Result<(), NcmError> {
        self.applier.set_link_state(iface, state).await
    }

    pub async fn configure_address(
        &mut self,
        iface: &InterfaceHandle,
        address: &AddressConfig,
    ) -> Result<(), NcmError> {
        self.persister.configure_address(iface, address)?;
        self.applier.configure_address(iface, address).await
    }

    pub async fn delete_address(
        &mut self,
        iface: &InterfaceHandle,
        address: &IpAddress,
    ) -> Result<(), NcmError> {
        self.persister.delete_address(iface, address)?;
        self.applier.delete_address(iface, address).await
    }

    /// Persist the route (default gateways as the minimal section) and add
    /// it to the kernel.
    pub async fn configure_route(
        &mut self,
        iface: &InterfaceHandle,
        route: &Route,
    ) -> Result<(), NcmError> {
        self.persister.configure_route(iface, route)?;
        self.applier.configure_route(iface, route).await
    }

    pub async fn configure_additional_gateway(
        &mut self,
        iface: &InterfaceHandle,
        address: &IpAddress,
        route: &Route,
    ) -> Result<(), NcmError> {
        self.persister
            .configure_additional_gateway(iface, address, route)?;
        let table = route.table.map(|t| t.id()).unwrap_or_default();
        let host = IpAddress::host(address.addr());
        self.applier
            .configure_address(iface, &AddressConfig::new(*address))
            .await?;
        self.applier.configure_route(iface, route).await?;
        let mut from_rule = RoutingPolicyRule::new(table);
        from_rule.from = Some(host);
        let mut to_rule = RoutingPolicyRule::new(table);
        to_rule.to = Some(host);
        self.applier.configure_policy_rule(&from_rule).await?;
        self.applier.configure_policy_rule(&to_rule).await
    }

    pub async fn configure_routing_policy_rule(
        &mut self,
        iface: &InterfaceHandle,
        rule: &RoutingPolicyRule,
    ) -> Result<(), NcmError> {
        self.persister.configure_routing_policy_rule(iface, rule)?;
        self.applier
            .configure_policy_rule(rule)
            .await
            .map_err(|e| e.with_iface(iface.name()))
    }

    /// Remove every rule persisted for `iface` from its file and from the
    /// kernel.
    pub async fn remove_routing_policy_rules(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        let rules = self.persister.read_routing_policy_rules(iface)?;
        self.persister.remove_routing_policy_rules(iface)?;
        for rule in rules.iter().filter(|r| r.validate().is_ok()) {
            self.applier
                .remove_policy_rule(rule)
                .await
                .map_err(|e| e.with_iface(iface.name()))?;
        }
        Ok(())
    }

    pub async fn configure_dhcpv4_server(
        &mut self,
        iface: &InterfaceHandle,
        cfg: &Dhcpv4ServerConfig,
    ) -> Result<(), NcmError> {
        self.persister.configure_dhcpv4_server(iface, cfg)?;
        self.applier.start_dhcpv4_server(iface, cfg).await
    }

    pub async fn remove_dhcpv4_server(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.persister.remove_dhcpv4_server(iface)?;
        self.applier.stop_dhcpv4_server(iface).await
    }

    pub async fn configure_router_advertisement(
        &mut self,
        iface: &InterfaceHandle,
        cfg: &RouterAdvertisementConfig,
    ) -> Result<(), NcmError> {
        self.persister.configure_router_advertisement(iface, cfg)?;
        self.applier.enable_router_advertisement(iface, cfg).await
    }

    pub async fn remove_router_advertisement(
        &mut self,
        iface: &InterfaceHandle,
    ) -> Result<(), NcmError> {
        self.persister.remove_router_advertisement(iface)?;
        self.applier.disable_router_advertisement(iface).await
    }

    pub async fn create_vlan(
        &mut self,
        vlan: &VlanDescriptor,
    ) -> Result<(), NcmError> {
        self.persister.create_vlan(vlan)?;
        self.applier.create_vlan(vlan).await
    }

    pub async fn remove_netdev(
        &mut self,
        name: &str,
        kind: &str,
    ) -> Result<(), NcmError> {
        self.persister.remove_netdev(name, kind)?;
        let iface = InterfaceHandle::new(name)?;
        self.applier.remove_netdev(&iface).await
    }
}
