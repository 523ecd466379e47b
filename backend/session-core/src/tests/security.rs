use crate::security::{HostPort, SecurityPolicy, parse_host_port};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn lan_policy() -> SecurityPolicy {
    SecurityPolicy::with_local_addresses([
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x1234)),
    ])
}

#[test]
fn given_host_and_port_when_parsed_then_split() {
    assert_eq!(
        parse_host_port("127.0.0.1:5555"),
        Some(HostPort {
            host: "127.0.0.1".to_string(),
            port: 5555
        })
    );
}

#[test]
fn given_bracketed_ipv6_when_parsed_then_brackets_stripped() {
    let parsed = parse_host_port("[::1]:5555").expect("bracket form");

    assert_eq!(parsed.host, "::1");
    assert_eq!(parsed.port, 5555);
    assert_eq!(parsed.to_string(), "[::1]:5555");
}

/// **VALUE**: Rejects every malformed target shape.
///
/// **WHY THIS MATTERS**: A lenient parser could hand the self-host check a host
/// string that is not what the backend will actually dial.
///
/// **BUG THIS CATCHES**: Accepting port 0, ports above 65535, blank hosts or an
/// unbracketed IPv6 address whose last group would be misread as the port.
#[test]
fn given_malformed_targets_when_parsed_then_no_match() {
    for input in [
        "",
        "   ",
        "localhost",
        ":5555",
        "host:",
        "host:0",
        "host:65536",
        "host:port",
        "::1:5555",
        "[::1]",
        "[::1]5555",
        "[]:5555",
        " :5555",
    ] {
        assert_eq!(parse_host_port(input), None, "input: {input:?}");
    }
}

#[test]
fn given_port_bounds_when_parsed_then_inclusive_range_accepted() {
    assert_eq!(parse_host_port("h:1").map(|p| p.port), Some(1));
    assert_eq!(parse_host_port("h:65535").map(|p| p.port), Some(65535));
}

#[test]
fn given_loopback_names_when_checked_then_self_host() {
    let policy = SecurityPolicy::with_local_addresses(Vec::<IpAddr>::new());

    for host in ["localhost", "LOCALHOST", "LocalHost", "127.0.0.1", "::1"] {
        assert!(policy.is_self_host(host), "host: {host}");
    }
}

#[test]
fn given_interface_addresses_when_checked_then_self_host() {
    let policy = lan_policy();

    assert!(policy.is_self_host("192.168.1.20"));
    assert!(policy.is_self_host("fe80::1234"));
}

#[test]
fn given_foreign_hosts_when_checked_then_not_self_host() {
    let policy = lan_policy();

    for host in ["8.8.8.8", "192.168.1.21", "example.com", "127.0.0.2", ""] {
        assert!(!policy.is_self_host(host), "host: {host}");
    }
}

#[test]
fn given_target_string_when_local_target_called_then_host_and_port_checked_together() {
    let policy = lan_policy();

    assert!(policy.local_target("192.168.1.20:37000").is_some());
    assert!(policy.local_target("[::1]:5555").is_some());
    assert!(policy.local_target("8.8.8.8:5555").is_none());
    assert!(policy.local_target("192.168.1.20").is_none());
}

#[test]
fn given_system_policy_when_listing_addresses_then_no_multicast() {
    let addresses = SecurityPolicy::system().local_addresses();

    assert!(addresses.iter().all(|addr| !addr.is_multicast()));
}
