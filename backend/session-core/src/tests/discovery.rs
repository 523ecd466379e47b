use crate::discovery::{
    CONNECT_SERVICE, PAIRING_SERVICE, PortProbe, ServiceKind, accept_resolved,
};
use crate::error::discovery::DiscoveryError;
use crate::security::SecurityPolicy;

use std::net::{IpAddr, Ipv4Addr};

struct FixedProbe(Vec<u16>);

impl PortProbe for FixedProbe {
    fn is_listening(&self, port: u16) -> bool {
        self.0.contains(&port)
    }
}

fn policy() -> SecurityPolicy {
    SecurityPolicy::with_local_addresses([IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))])
}

/// **VALUE**: Verifies accepted records are normalised to loopback.
///
/// **WHY THIS MATTERS**: The daemon advertises its LAN address, but the host
/// always dials it through loopback.
///
/// **BUG THIS CATCHES**: Storing the advertised host, which would later fail the
/// connect path on networks where the address changes.
#[test]
fn given_local_record_with_listener_when_accepted_then_loopback_address() {
    let probe = FixedProbe(vec![37000]);

    let address = accept_resolved("192.168.1.20", 37000, &policy(), &probe).expect("accepted");

    assert_eq!(address, "127.0.0.1:37000");
}

#[test]
fn given_foreign_host_when_accepted_then_rejected() {
    let probe = FixedProbe(vec![37000]);

    let result = accept_resolved("192.168.1.99", 37000, &policy(), &probe);

    assert!(matches!(result, Err(DiscoveryError::Rejected { .. })));
}

#[test]
fn given_hostname_instead_of_address_when_accepted_then_rejected() {
    let probe = FixedProbe(vec![37000]);

    assert!(accept_resolved("phone.local", 37000, &policy(), &probe).is_err());
}

#[test]
fn given_port_without_listener_when_accepted_then_rejected() {
    let probe = FixedProbe(vec![]);

    let result = accept_resolved("192.168.1.20", 37000, &policy(), &probe);

    assert!(matches!(result, Err(DiscoveryError::Rejected { .. })));
}

#[test]
fn given_service_types_when_mapped_then_kinds_round_trip() {
    assert_eq!(ServiceKind::from_service_type(PAIRING_SERVICE), Some(ServiceKind::Pairing));
    assert_eq!(
        ServiceKind::from_service_type("_adb-tls-connect._tcp."),
        Some(ServiceKind::Connect)
    );
    assert_eq!(ServiceKind::from_service_type("_http._tcp"), None);
    assert_eq!(ServiceKind::Connect.service_type(), CONNECT_SERVICE);
}
