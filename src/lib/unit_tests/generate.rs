// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use super::{MockChannel, MockDaemon};
use crate::{
    AddressConfig, Dhcpv4ServerConfig, ErrorKind, GenerateReport,
    InterfaceHandle, LinkFlag, LinkState, NcmConfig, NetlinkRequest, Network,
    NetworkManager, Route, RouteTable, RouterAdvertisementConfig,
    RoutingPolicyRule, VlanDescriptor,
};

fn manager(root: &Path) -> NetworkManager<MockChannel, MockDaemon> {
    let mut config = NcmConfig::with_root(root);
    config.retry.backoff_ms = 0;
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.links.insert("eth1".to_string(), [3].into());
    NetworkManager::new(config, channel, MockDaemon::default())
}

fn network(name: &str, address: &str) -> Network {
    let mut network = Network::new(name).unwrap();
    network
        .addresses
        .push(AddressConfig::new(address.parse().unwrap()));
    network
}

#[test]
fn test_batch_isolates_invalid_interface() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let mut broken = network("eth1", "192.0.2.11/24");
    broken.link.mtu = Some(0);
    let networks = vec![
        network("eth0", "192.0.2.10/24"),
        broken,
        network("eth2", "192.0.2.12/24"),
    ];

    let report = manager.generate_from_declarative_source(&networks);

    assert!(!report.is_success());
    assert_eq!(report.outcomes.len(), 3);
    let e = report.first_error().unwrap();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    assert_eq!(e.iface(), Some("eth1"));
    for name in ["eth0", "eth2"] {
        let path = report.outcome(name).unwrap().path.clone().unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            format!(
                "[Match]\nName={name}\n\n[Address]\nAddress=192.0.2.1{}/24\n",
                &name[3..]
            )
        );
    }
    let eth1 = InterfaceHandle::new("eth1").unwrap();
    assert!(!manager
        .persister()
        .network_file_path(&eth1)
        .unwrap()
        .exists());
    assert!(manager.applier_mut().channel().requests.is_empty());
}

fn full_network() -> Network {
    let mut network = network("eth0", "192.0.2.10/24");
    network.link.mtu = Some(9000);
    network
        .addresses
        .push(AddressConfig::new("2001:db8:1::10/64".parse().unwrap()));
    network
        .routes
        .push(Route::default_gateway("192.0.2.1".parse().unwrap()));
    let mut table_route =
        Route::default_gateway("192.0.2.254".parse().unwrap());
    table_route.table = Some(RouteTable::Id(100));
    network.routes.push(table_route);
    let mut rule = RoutingPolicyRule::new(100);
    rule.from = Some("192.0.2.10".parse().unwrap());
    rule.priority = Some(1000);
    network.routing_policy_rules.push(rule);
    network.dns = vec!["192.0.2.53".parse().unwrap()];
    network.domains = vec!["example.org".to_string()];
    network.ntp = vec!["ntp.example.org".to_string()];
    network.dhcpv4_server = Some(Dhcpv4ServerConfig {
        pool_offset: Some(100),
        pool_size: Some(50),
        ..Default::default()
    });
    network.router_advertisement = Some(RouterAdvertisementConfig {
        prefix: Some("2001:db8:1::/64".parse().unwrap()),
        ..Default::default()
    });
    let parent = InterfaceHandle::new("eth0").unwrap();
    network.vlans = vec![
        VlanDescriptor::new("eth0.100", 100, parent.clone()).unwrap(),
        VlanDescriptor::new("eth0.200", 200, parent).unwrap(),
    ];
    network
}

fn generated_files(root: &Path) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> =
        std::fs::read_dir(NcmConfig::with_root(root).network_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .map(|p| {
                (
                    p.file_name().unwrap().to_string_lossy().to_string(),
                    std::fs::read_to_string(&p).unwrap(),
                )
            })
            // Lock files
            .filter(|(name, _)| !name.starts_with('.'))
            .collect();
    files.sort();
    files
}

#[test]
fn test_full_network_generation() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let report = manager.generate_from_declarative_source(&[full_network()]);
    assert!(report.is_success());
    let content = std::fs::read_to_string(
        report.outcome("eth0").unwrap().path.as_ref().unwrap(),
    )
    .unwrap();
    for expected in [
        "[Link]\nMTUBytes=9000\n",
        "DHCPServer=yes\n",
        "IPv6SendRA=yes\n",
        "VLAN=eth0.100\nVLAN=eth0.200\n",
        "[Address]\nAddress=2001:db8:1::10/64\n",
        "[Route]\nGateway=192.0.2.254\nTable=100\n",
        "[RoutingPolicyRule]\n",
        "From=192.0.2.10\n",
        "[DHCPServer]\nPoolOffset=100\nPoolSize=50\n",
        "[IPv6SendRA]\n",
        "[IPv6Prefix]\nPrefix=2001:db8:1::/64\n",
    ] {
        assert!(content.contains(expected), "{expected:?} in {content}");
    }

    let files = generated_files(dir.path());
    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "10-eth0.100.netdev",
            "10-eth0.100.network",
            "10-eth0.200.netdev",
            "10-eth0.200.network",
            "10-eth0.network",
        ]
    );
    assert!(files[0].1.contains("Kind=vlan\n"));
    assert!(files[0].1.contains("Id=100\n"));
}

#[test]
fn test_generate_twice_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    let networks = vec![full_network(), network("eth1", "198.51.100.1/24")];

    let report = manager.generate_from_declarative_source(&networks);
    assert!(report.is_success());
    let first = generated_files(dir.path());
    let report = manager.generate_from_declarative_source(&networks);
    assert!(report.is_success());

    assert_eq!(generated_files(dir.path()), first);
}

#[test]
fn test_report_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    let mut broken = Network::new("eth0").unwrap();
    broken.ipv6_mtu = Some(0);

    let report = manager.generate_from_declarative_source(&[broken]);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["outcomes"][0]["iface"], "eth0");
    assert_eq!(json["outcomes"][0]["error"]["kind"], "invalid-input");
    let parsed: GenerateReport = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn test_generate_from_yaml_and_command_line() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    let yaml_path = dir.path().join("network.yml");
    std::fs::write(
        &yaml_path,
        "network:\n  ethernets:\n    eth0:\n      dhcp4: true\n",
    )
    .unwrap();

    let report = manager.generate_from_yaml(&yaml_path).unwrap();
    assert!(report.is_success());
    assert_eq!(
        std::fs::read_to_string(
            report.outcome("eth0").unwrap().path.as_ref().unwrap()
        )
        .unwrap(),
        "[Match]\nName=eth0\n\n[Network]\nDHCP=ipv4\n"
    );

    let report = manager
        .generate_from_command_line(None, Some("quiet ip=eth1:dhcp6"))
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.outcomes[0].iface, "eth1");

    let e = manager
        .generate_from_yaml(&dir.path().join("absent.yml"))
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_dual_write_persists_then_applies() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let eth0 = InterfaceHandle::new("eth0").unwrap();

    manager.set_link_mtu(&eth0, 9000).await.unwrap();
    manager
        .configure_route(
            &eth0,
            &Route::default_gateway("192.0.2.1".parse().unwrap()),
        )
        .await
        .unwrap();
    // Not changeable on a live link, persisted only
    manager
        .set_link_flag(&eth0, LinkFlag::RequiredForOnline, false)
        .await
        .unwrap();

    assert_eq!(manager.applier_mut().channel().requests.len(), 2);
    assert_eq!(
        manager.persister().show_network_config(&eth0).unwrap(),
        "[Match]\nName=eth0\n\n\
         [Link]\nMTUBytes=9000\nRequiredForOnline=no\n\n\
         [Route]\nGateway=192.0.2.1\n"
    );
}

#[tokio::test]
async fn test_remove_rules_from_file_and_kernel() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let eth0 = InterfaceHandle::new("eth0").unwrap();
    let mut rule = RoutingPolicyRule::new(100);
    rule.from = Some("192.0.2.10".parse().unwrap());
    rule.priority = Some(1000);

    manager
        .configure_routing_policy_rule(&eth0, &rule)
        .await
        .unwrap();
    assert_eq!(
        manager.persister().read_routing_policy_rules(&eth0).unwrap(),
        vec![rule.clone()]
    );
    manager.remove_routing_policy_rules(&eth0).await.unwrap();

    let requests = &manager.applier_mut().channel().requests;
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1],
        NetlinkRequest::DelRule { rule: rule.clone() }
    );
    assert!(manager
        .persister()
        .read_routing_policy_rules(&eth0)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_reconfigure_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let eth1 = InterfaceHandle::new("eth1").unwrap();
    let path = manager.persister().network_file_path(&eth1).unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "# managed by hand\n[Match]\nName=eth1\n").unwrap();

    manager.reconfigure_link(&eth1).await.unwrap();
    manager.reload_network().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[Match]\nName=eth1\n"
    );
    let daemon = manager.applier_mut().daemon_mut();
    assert_eq!(daemon.reconfigured, vec![3]);
    assert_eq!(daemon.reloads, 1);
}

#[tokio::test]
async fn test_reapply_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let eth0 = InterfaceHandle::new("eth0").unwrap();
    manager.set_link_mtu(&eth0, 1400).await.unwrap();

    let path = manager
        .reapply_network(&network("eth0", "198.51.100.2/24"))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        "[Match]\nName=eth0\n\n[Address]\nAddress=198.51.100.2/24\n"
    );
    assert_eq!(manager.applier_mut().daemon_mut().reconfigured, vec![2]);

    let mut broken = network("eth0", "198.51.100.3/24");
    broken.ipv6_mtu = Some(0);
    let e = manager.reapply_network(&broken).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    // Validation happens before the old file is removed
    assert!(manager.persister().show_network_config(&eth0).is_ok());
}

#[tokio::test]
async fn test_reapply_keeps_file_when_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let eth0 = InterfaceHandle::new("eth0").unwrap();
    manager.set_link_mtu(&eth0, 1400).await.unwrap();
    let path = manager.persister().network_file_path(&eth0).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();
    // Occupy the temporary file name of the atomic write
    std::fs::create_dir(path.with_file_name(format!(
        ".10-eth0.network.tmp{}",
        std::process::id()
    )))
    .unwrap();

    let e = manager
        .reapply_network(&network("eth0", "198.51.100.2/24"))
        .await
        .unwrap_err();

    assert_eq!(e.kind(), ErrorKind::PersistFailure);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert!(manager.applier_mut().daemon_mut().reconfigured.is_empty());
}

#[tokio::test]
async fn test_additional_gateway_and_link_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());
    let eth1 = InterfaceHandle::new("eth1").unwrap();
    let address = "192.0.2.10/24".parse().unwrap();
    let mut route = Route::default_gateway("192.0.2.1".parse().unwrap());
    route.table = Some(RouteTable::Id(100));

    manager
        .configure_additional_gateway(&eth1, &address, &route)
        .await
        .unwrap();
    manager.set_link_state(&eth1, LinkState::Up).await.unwrap();

    let host = "192.0.2.10".parse().unwrap();
    let mut from_rule = RoutingPolicyRule::new(100);
    from_rule.from = Some(host);
    let mut to_rule = RoutingPolicyRule::new(100);
    to_rule.to = Some(host);
    assert_eq!(
        manager.applier_mut().channel().requests,
        vec![
            NetlinkRequest::AddAddress {
                index: 3,
                address: AddressConfig::new(address),
            },
            NetlinkRequest::AddRoute { index: 3, route },
            NetlinkRequest::AddRule { rule: from_rule },
            NetlinkRequest::AddRule { rule: to_rule },
            NetlinkRequest::SetLinkState {
                index: 3,
                state: LinkState::Up,
            },
        ]
    );
    // Link state is never persisted
    assert!(!manager
        .persister()
        .show_network_config(&eth1)
        .unwrap()
        .contains("[Link]"));
}
