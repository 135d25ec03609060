// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::{
    ActivationPolicy, AddressConfig, AddressFamilyOnline, ConfigPersister,
    DhcpClientDuid, DhcpClientIdentifier, DhcpClientMode, DhcpFamily,
    Dhcpv4ServerConfig, DnsScope, DuidType, ErrorKind, InterfaceHandle,
    IpAddress, LinkFlag, NcmConfig, ProxyConfig, Route, RouteTable,
    RouterAdvertisementConfig, VlanDescriptor,
};

fn persister(root: &Path) -> ConfigPersister {
    ConfigPersister::new(NcmConfig::with_root(root))
}

fn eth0() -> InterfaceHandle {
    InterfaceHandle::new("eth0").unwrap()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn addr(s: &str) -> IpAddress {
    s.parse().unwrap()
}

#[test]
fn test_configure_address_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let cfg = AddressConfig::new(addr("192.0.2.10/24"));

    persister.configure_address(&eth0(), &cfg).unwrap();
    let path = persister.network_file_path(&eth0()).unwrap();
    let first = read(&path);
    persister.configure_address(&eth0(), &cfg).unwrap();

    assert_eq!(read(&path), first);
    assert_eq!(
        first,
        "[Match]\nName=eth0\n\n[Address]\nAddress=192.0.2.10/24\n"
    );
    assert!(path.ends_with("etc/systemd/network/10-eth0.network"));
}

#[test]
fn test_delete_address_restores_file() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    persister
        .set_dhcp_client(&eth0(), DhcpClientMode::Ipv4)
        .unwrap();
    let path = persister.network_file_path(&eth0()).unwrap();
    let before = read(&path);

    persister
        .configure_address(&eth0(), &AddressConfig::new(addr("2001:db8::1/64")))
        .unwrap();
    persister
        .delete_address(&eth0(), &addr("2001:db8::1/64"))
        .unwrap();

    assert_eq!(read(&path), before);
}

#[test]
fn test_remove_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());

    let e = persister
        .delete_address(&eth0(), &addr("192.0.2.10/24"))
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
    assert_eq!(e.iface(), Some("eth0"));
    let e = persister.remove_network_file(&eth0()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
}

#[test]
fn test_invalid_input_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());

    assert!("192.0.2.10/33".parse::<IpAddress>().is_err());
    assert!(InterfaceHandle::new("").is_err());
    assert!("sometimes".parse::<DhcpClientMode>().is_err());
    let e = persister.set_link_mtu(&eth0(), 0).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);

    assert!(!persister.network_file_path(&eth0()).unwrap().exists());
}

#[test]
fn test_default_gateway_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.network_file_path(&eth0()).unwrap();

    persister
        .configure_route(&eth0(), &Route::default_gateway(addr("192.0.2.1")))
        .unwrap();
    // Same family replaces the previous gateway
    persister
        .configure_default_gateway(
            &eth0(),
            &Route::default_gateway(addr("192.0.2.254")),
        )
        .unwrap();
    let mut onlink = Route::default_gateway(addr("fe80::1"));
    onlink.onlink = true;
    persister.configure_route(&eth0(), &onlink).unwrap();

    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [Route]\nGateway=192.0.2.254\n\n\
         [Route]\nGateway=fe80::1\nGatewayOnLink=yes\n"
    );

    persister.remove_gateway_or_route(&eth0(), true).unwrap();
    assert_eq!(read(&path), "[Match]\nName=eth0\n");
}

#[test]
fn test_route_with_table_is_not_minimal() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let mut route = Route::default_gateway(addr("192.0.2.1"));
    route.table = Some(RouteTable::Id(100));
    route.metric = Some(10);

    persister.configure_route(&eth0(), &route).unwrap();

    assert_eq!(
        read(&persister.network_file_path(&eth0()).unwrap()),
        "[Match]\nName=eth0\n\n\
         [Route]\nGateway=192.0.2.1\nTable=100\nMetric=10\n"
    );
}

#[test]
fn test_dns_scope_and_revert() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let resolved = persister.config().resolved_conf.clone();
    std::fs::create_dir_all(resolved.parent().unwrap()).unwrap();
    std::fs::write(&resolved, "[Resolve]\nDNS=198.51.100.53\n").unwrap();

    persister
        .add_dns_servers(&eth0(), &[addr("192.0.2.53")], DnsScope::system())
        .unwrap();
    assert_eq!(read(&resolved), "[Resolve]\nDNS=198.51.100.53\n");

    persister
        .add_dns_servers(&eth0(), &[addr("192.0.2.54")], DnsScope::global())
        .unwrap();
    persister
        .add_dns_domains(
            &eth0(),
            &["example.org".to_string()],
            DnsScope::global(),
        )
        .unwrap();
    let path = persister.network_file_path(&eth0()).unwrap();
    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [Network]\nDNS=192.0.2.53 192.0.2.54\nDomains=example.org\n"
    );
    assert_eq!(
        read(&resolved),
        "[Resolve]\nDNS=198.51.100.53 192.0.2.54\nDomains=example.org\n"
    );
    assert_eq!(
        persister.read_system_domains().unwrap(),
        vec!["example.org".to_string()]
    );

    persister.revert_dns_and_domains(&eth0()).unwrap();
    assert_eq!(read(&path), "[Match]\nName=eth0\n");
    assert_eq!(read(&resolved), "[Resolve]\nDNS=198.51.100.53\n");
}

#[test]
fn test_existing_file_matched_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let network_dir = persister.config().network_dir.clone();
    std::fs::create_dir_all(&network_dir).unwrap();
    let custom = network_dir.join("50-uplink.network");
    std::fs::write(&custom, "[Match]\nName=eth0\n\n[Network]\nDHCP=yes\n")
        .unwrap();

    assert_eq!(persister.network_file_path(&eth0()).unwrap(), custom);
    persister
        .set_dhcp_client(&eth0(), DhcpClientMode::Ipv6)
        .unwrap();
    assert_eq!(
        persister.get_dhcp_client(&eth0()).unwrap(),
        DhcpClientMode::Ipv6
    );
}

#[test]
fn test_create_and_remove_vlan() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    persister
        .set_dhcp_client(&eth0(), DhcpClientMode::Yes)
        .unwrap();
    let parent_path = persister.network_file_path(&eth0()).unwrap();
    let before = read(&parent_path);
    let vlan = VlanDescriptor::new("vlan10", 10, eth0()).unwrap();

    persister.create_vlan(&vlan).unwrap();
    let netdev = persister.config().network_dir.join("10-vlan10.netdev");
    assert_eq!(
        read(&netdev),
        "[NetDev]\nName=vlan10\nKind=vlan\n\n[VLAN]\nId=10\n"
    );
    assert_eq!(
        read(&parent_path),
        "[Match]\nName=eth0\n\n[Network]\nDHCP=yes\nVLAN=vlan10\n"
    );

    let e = persister.remove_netdev("vlan10", "bond").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    persister.remove_netdev("vlan10", "vlan").unwrap();
    assert!(!netdev.exists());
    assert_eq!(read(&parent_path), before);
}

#[test]
fn test_link_and_network_keys() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.network_file_path(&eth0()).unwrap();

    persister.set_link_mtu(&eth0(), 1400).unwrap();
    persister
        .set_link_mac(&eth0(), &"00:11:22:AA:bb:cc".parse().unwrap())
        .unwrap();
    persister.set_link_flag(&eth0(), LinkFlag::Arp, false).unwrap();
    persister
        .set_link_required_family_for_online(
            &eth0(),
            AddressFamilyOnline::Both,
        )
        .unwrap();
    persister
        .set_link_activation_policy(&eth0(), ActivationPolicy::AlwaysUp)
        .unwrap();
    persister.enable_ipv6(&eth0(), false).unwrap();
    persister.set_ipv6_mtu(&eth0(), 1280).unwrap();
    persister
        .set_network_key_bool(&eth0(), "IPForward", true)
        .unwrap();

    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [Link]\nMTUBytes=1400\nMACAddress=00:11:22:aa:bb:cc\nARP=no\n\
         RequiredFamilyForOnline=both\nActivationPolicy=always-up\n\n\
         [Network]\nLinkLocalAddressing=no\nIPv6AcceptRA=no\n\
         IPv6MTUBytes=1280\nIPForward=yes\n"
    );

    let e = persister
        .set_network_key(&eth0(), "Bad Key", "yes")
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    persister.unset_network_key(&eth0(), "IPForward").unwrap();
    assert!(!read(&path).contains("IPForward"));
}

#[test]
fn test_dhcp_client_settings() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.network_file_path(&eth0()).unwrap();

    persister
        .set_dhcp4_client_identifier(&eth0(), DhcpClientIdentifier::Duid)
        .unwrap();
    persister
        .set_dhcp_client_iaid(&eth0(), DhcpFamily::V6, 42)
        .unwrap();
    let mut duid = DhcpClientDuid::new(DuidType::LinkLayer);
    duid.raw_data = Some("00:11:22".to_string());
    persister
        .set_dhcp_client_duid(&eth0(), DhcpFamily::V4, &duid)
        .unwrap();
    persister
        .set_dhcp_section_bool(&eth0(), DhcpFamily::V4, "UseDNS", false)
        .unwrap();

    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [DHCPv4]\nClientIdentifier=duid\nDUIDType=link-layer\n\
         DUIDRawData=00:11:22\nUseDNS=no\n\n\
         [DHCPv6]\nIAID=42\n"
    );
    assert_eq!(
        persister.get_dhcp4_client_identifier(&eth0()).unwrap(),
        Some(DhcpClientIdentifier::Duid)
    );
    assert_eq!(
        persister.get_dhcp_client_iaid(&eth0(), DhcpFamily::V6).unwrap(),
        Some(42)
    );
    assert_eq!(
        persister.get_dhcp_client_iaid(&eth0(), DhcpFamily::V4).unwrap(),
        None
    );
}

#[test]
fn test_system_duid_goes_to_daemon_config() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let mut duid = DhcpClientDuid::new(DuidType::Vendor);
    duid.persist_across_systems = true;

    persister
        .set_dhcp_client_duid(&eth0(), DhcpFamily::V6, &duid)
        .unwrap();

    assert_eq!(
        read(&persister.config().networkd_conf),
        "[DHCPv6]\nDUIDType=vendor\n"
    );
    assert!(!persister.network_file_path(&eth0()).unwrap().exists());

    duid.raw_data = Some("zz".to_string());
    let e = persister
        .set_dhcp_client_duid(&eth0(), DhcpFamily::V6, &duid)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_ntp() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.network_file_path(&eth0()).unwrap();
    let servers = |v: &[&str]| -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    };

    persister
        .add_ntp(&eth0(), &servers(&["ntp1.example.org"]), true)
        .unwrap();
    persister
        .add_ntp(&eth0(), &servers(&["ntp2.example.org"]), true)
        .unwrap();
    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [Network]\nNTP=ntp1.example.org ntp2.example.org\n"
    );
    persister
        .add_ntp(&eth0(), &servers(&["192.0.2.123"]), false)
        .unwrap();
    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n[Network]\nNTP=192.0.2.123\n"
    );
    persister.remove_ntp(&eth0()).unwrap();
    assert_eq!(read(&path), "[Match]\nName=eth0\n");

    let timesyncd = persister.config().timesyncd_conf.clone();
    persister
        .add_system_ntp(&servers(&["a.example.org", "b.example.org"]))
        .unwrap();
    persister
        .remove_system_ntp(&servers(&["a.example.org"]))
        .unwrap();
    assert_eq!(read(&timesyncd), "[Time]\nNTP=b.example.org\n");
}

#[test]
fn test_dhcp_server_and_router_advertisement() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.network_file_path(&eth0()).unwrap();
    persister
        .configure_address(&eth0(), &AddressConfig::new(addr("192.0.2.1/24")))
        .unwrap();
    let before = read(&path);

    let mut server = Dhcpv4ServerConfig::default();
    server.pool_offset = Some(100);
    server.pool_size = Some(20);
    server.emit_dns = Some(true);
    server.dns = Some(addr("192.0.2.53"));
    persister.configure_dhcpv4_server(&eth0(), &server).unwrap();
    persister.configure_dhcpv4_server(&eth0(), &server).unwrap();

    let mut ra = RouterAdvertisementConfig::default();
    ra.prefix = Some(addr("2001:db8:1::/64"));
    ra.managed = Some(true);
    persister.configure_router_advertisement(&eth0(), &ra).unwrap();

    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [Address]\nAddress=192.0.2.1/24\n\n\
         [Network]\nDHCPServer=yes\nIPv6SendRA=yes\n\n\
         [DHCPServer]\nPoolOffset=100\nPoolSize=20\nEmitDNS=yes\n\
         DNS=192.0.2.53\n\n\
         [IPv6SendRA]\nManaged=yes\n\n\
         [IPv6Prefix]\nPrefix=2001:db8:1::/64\n"
    );

    persister.remove_router_advertisement(&eth0()).unwrap();
    persister.remove_dhcpv4_server(&eth0()).unwrap();
    assert_eq!(read(&path), before);

    let mut server = Dhcpv4ServerConfig::default();
    server.dns = Some(addr("2001:db8::53"));
    let e = persister
        .configure_dhcpv4_server(&eth0(), &server)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    assert_eq!(read(&path), before);
}

#[test]
fn test_additional_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.network_file_path(&eth0()).unwrap();
    let mut route = Route::default_gateway(addr("192.0.2.1"));
    route.table = Some(RouteTable::Id(100));

    for _ in 0..2 {
        persister
            .configure_additional_gateway(
                &eth0(),
                &addr("192.0.2.10/24"),
                &route,
            )
            .unwrap();
    }

    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n\
         [Address]\nAddress=192.0.2.10/24\n\n\
         [Route]\nGateway=192.0.2.1\nTable=100\n\n\
         [RoutingPolicyRule]\nFrom=192.0.2.10\nTable=100\n\n\
         [RoutingPolicyRule]\nTo=192.0.2.10\nTable=100\n"
    );
    let rules = persister.read_routing_policy_rules(&eth0()).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].from, Some(addr("192.0.2.10")));

    route.table = None;
    let e = persister
        .configure_additional_gateway(&eth0(), &addr("192.0.2.11/24"), &route)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_proxy() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let proxy_conf = persister.config().proxy_conf.clone();
    std::fs::create_dir_all(proxy_conf.parent().unwrap()).unwrap();
    std::fs::write(&proxy_conf, "OTHER=\"kept\"\n").unwrap();

    assert_eq!(persister.read_proxy().unwrap(), ProxyConfig::default());

    let mut cfg = ProxyConfig::default();
    cfg.enabled = true;
    cfg.http = Some("http://proxy.example.org:3128".to_string());
    cfg.no_proxy.insert("localhost".to_string());
    cfg.no_proxy.insert("127.0.0.1".to_string());
    persister.configure_proxy(&cfg).unwrap();

    assert_eq!(
        read(&proxy_conf),
        "OTHER=\"kept\"\nPROXY_ENABLED=\"yes\"\n\
         HTTP_PROXY=\"http://proxy.example.org:3128\"\n\
         NO_PROXY=\"127.0.0.1, localhost\"\n"
    );
    assert_eq!(persister.read_proxy().unwrap(), cfg);

    persister.remove_proxy().unwrap();
    assert_eq!(read(&proxy_conf), "OTHER=\"kept\"\n");
}

#[test]
fn test_comments_survive_address_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let path = persister.config().network_dir.join("10-eth0.network");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let original = "# managed by admin\n[Match]\nName=eth0\n\n\
                    # uplink\n[Network]\n;DHCP=yes\nIPv6AcceptRA=no\n";
    std::fs::write(&path, original).unwrap();

    let cfg = AddressConfig::new(addr("192.0.2.10/24"));
    persister.configure_address(&eth0(), &cfg).unwrap();
    assert_eq!(
        read(&path),
        format!("{original}\n[Address]\nAddress=192.0.2.10/24\n")
    );
    persister
        .delete_address(&eth0(), &addr("192.0.2.10/24"))
        .unwrap();

    assert_eq!(read(&path), original);
}

#[test]
fn test_resolver_comments_survive_dns_revert() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let resolved = persister.config().resolved_conf.clone();
    std::fs::create_dir_all(resolved.parent().unwrap()).unwrap();
    let original = "# See resolved.conf(5)\n[Resolve]\n#DNS=\n#FallbackDNS=\n";
    std::fs::write(&resolved, original).unwrap();

    persister
        .add_dns_servers(&eth0(), &[addr("192.0.2.53")], DnsScope::global())
        .unwrap();
    assert_eq!(read(&resolved), format!("{original}DNS=192.0.2.53\n"));
    persister.revert_dns_and_domains(&eth0()).unwrap();

    assert_eq!(read(&resolved), original);
}

#[test]
fn test_revert_keeps_values_already_in_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    let resolved = persister.config().resolved_conf.clone();
    std::fs::create_dir_all(resolved.parent().unwrap()).unwrap();
    std::fs::write(&resolved, "[Resolve]\nDNS=192.0.2.53\n").unwrap();

    persister
        .add_dns_servers(&eth0(), &[addr("192.0.2.53")], DnsScope::system())
        .unwrap();
    persister.revert_dns_and_domains(&eth0()).unwrap();
    assert_eq!(read(&resolved), "[Resolve]\nDNS=192.0.2.53\n");

    persister
        .add_dns_servers(
            &eth0(),
            &[addr("192.0.2.53"), addr("192.0.2.54")],
            DnsScope::global(),
        )
        .unwrap();
    assert_eq!(read(&resolved), "[Resolve]\nDNS=192.0.2.53 192.0.2.54\n");
    persister.revert_dns_and_domains(&eth0()).unwrap();

    assert_eq!(read(&resolved), "[Resolve]\nDNS=192.0.2.53\n");
    assert_eq!(
        read(&persister.network_file_path(&eth0()).unwrap()),
        "[Match]\nName=eth0\n"
    );
    assert!(!persister
        .config()
        .state_dir
        .join("resolved-eth0.conf")
        .exists());
}

#[test]
fn test_delete_address_without_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let persister = persister(dir.path());
    for a in ["192.0.2.1/24", "198.51.100.1/24"] {
        persister
            .configure_address(&eth0(), &AddressConfig::new(addr(a)))
            .unwrap();
    }
    let path = persister.network_file_path(&eth0()).unwrap();

    persister
        .delete_address(&eth0(), &addr("198.51.100.1/25"))
        .unwrap();
    persister.delete_address(&eth0(), &addr("192.0.2.1")).unwrap();

    assert_eq!(
        read(&path),
        "[Match]\nName=eth0\n\n[Address]\nAddress=198.51.100.1/24\n"
    );
}
