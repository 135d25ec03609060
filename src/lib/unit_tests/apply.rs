// SPDX-License-Identifier: Apache-2.0

use nix::errno::Errno;

use super::{MockChannel, MockDaemon};
use crate::{
    AddressConfig, ErrorKind, InterfaceHandle, IpAddress, LinkFlag,
    LiveApplier, NetlinkRequest, RetryConfig, Route, RoutingPolicyRule,
};

fn applier(channel: MockChannel) -> LiveApplier<MockChannel, MockDaemon> {
    LiveApplier::new(
        channel,
        MockDaemon::default(),
        RetryConfig {
            attempts: 3,
            backoff_ms: 0,
        },
    )
}

fn eth0() -> InterfaceHandle {
    InterfaceHandle::new("eth0").unwrap()
}

fn addr(s: &str) -> IpAddress {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_add_existing_address_is_success() {
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.failures.push_back(Errno::EEXIST);
    let mut applier = applier(channel);
    let cfg = AddressConfig::new(addr("192.0.2.10/24"));

    applier.configure_address(&eth0(), &cfg).await.unwrap();
    applier.configure_address(&eth0(), &cfg).await.unwrap();

    let requests = &applier.channel().requests;
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0],
        NetlinkRequest::AddAddress {
            index: 2,
            address: cfg.clone()
        }
    );
    // Index resolved once, then cached
    assert_eq!(applier.channel().lookups, 1);
}

#[tokio::test]
async fn test_delete_missing_address_is_success() {
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.failures.push_back(Errno::EADDRNOTAVAIL);
    let mut applier = applier(channel);

    applier
        .delete_address(&eth0(), &addr("192.0.2.10/24"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_eexist_on_non_add_is_failure() {
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.failures.push_back(Errno::EEXIST);
    let mut applier = applier(channel);

    let e = applier.set_link_mtu(&eth0(), 1400).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ApplyFailure);
    assert_eq!(e.iface(), Some("eth0"));
}

#[tokio::test]
async fn test_transient_failure_retried() {
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.failures.push_back(Errno::EBUSY);
    channel.failures.push_back(Errno::EAGAIN);
    let mut applier = applier(channel);

    applier.set_link_mtu(&eth0(), 9000).await.unwrap();
    assert_eq!(applier.channel().requests.len(), 3);
}

#[tokio::test]
async fn test_transient_failure_exhausts_attempts() {
    let mut channel = MockChannel::with_link("eth0", 2);
    for _ in 0..3 {
        channel.failures.push_back(Errno::EBUSY);
    }
    let mut applier = applier(channel);

    let e = applier.set_link_mtu(&eth0(), 9000).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ApplyFailure);
    assert_eq!(applier.channel().requests.len(), 3);
}

#[tokio::test]
async fn test_permission_denied_carries_errno_description() {
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.failures.push_back(Errno::EPERM);
    let mut applier = applier(channel);

    let e = applier
        .configure_route(
            &eth0(),
            &Route::default_gateway(addr("192.0.2.1")),
        )
        .await
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ApplyFailure);
    assert!(e.msg().contains(Errno::EPERM.desc()));
    assert_eq!(applier.channel().requests.len(), 1);
}

#[tokio::test]
async fn test_unknown_interface() {
    let mut applier = applier(MockChannel::default());

    let e = applier.set_link_mtu(&eth0(), 1500).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NoSuchDevice);
    assert_eq!(e.iface(), Some("eth0"));
    assert!(applier.channel().requests.is_empty());
}

#[tokio::test]
async fn test_stale_index_resolved_again() {
    let mut channel = MockChannel::with_link("eth0", 2);
    channel.links.get_mut("eth0").unwrap().push_back(7);
    channel.failures.push_back(Errno::ENODEV);
    let mut applier = applier(channel);

    applier.set_link_mtu(&eth0(), 1500).await.unwrap();
    assert_eq!(
        applier.channel().requests,
        vec![
            NetlinkRequest::SetLinkMtu {
                index: 2,
                mtu: 1500
            },
            NetlinkRequest::SetLinkMtu {
                index: 7,
                mtu: 1500
            },
        ]
    );
    assert_eq!(applier.channel().lookups, 2);
}

#[tokio::test]
async fn test_invalid_input_before_any_request() {
    let mut applier = applier(MockChannel::with_link("eth0", 2));

    let e = applier.set_link_mtu(&eth0(), 0).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    let e = applier
        .configure_policy_rule(&RoutingPolicyRule::new(100))
        .await
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    let e = applier
        .set_link_flag(&eth0(), LinkFlag::Multicast, true)
        .await
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidInput);
    assert!(applier.channel().requests.is_empty());
}

#[tokio::test]
async fn test_removing_absent_netdev_is_success() {
    let mut applier = applier(MockChannel::default());

    applier
        .remove_netdev(&InterfaceHandle::new("vlan10").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dhcp_server_reconfigures_link() {
    let mut applier = applier(MockChannel::with_link("eth0", 4));

    applier
        .start_dhcpv4_server(&eth0(), &Default::default())
        .await
        .unwrap();
    assert_eq!(applier.daemon_mut().reconfigured, vec![4]);
    assert!(applier.channel().requests.is_empty());
}
