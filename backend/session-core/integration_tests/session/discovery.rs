use crate::helpers::{FakeBackend, LAN_ADDRESS, start_controller, start_running};

use session_core::ConnectionState;
use session_core::discovery::{ServiceEvent, ServiceKind};

use common::RedactedPairingCode;

#[tokio::test]
async fn given_local_pairing_service_when_resolved_then_loopback_address_stored() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    controller.apply_discovery(ServiceEvent::Resolved {
        kind: ServiceKind::Pairing,
        host: LAN_ADDRESS.to_string(),
        port: 37000,
    });

    assert_eq!(controller.snapshot().pairing_address, "127.0.0.1:37000");
}

/// **VALUE**: Service records from other machines are ignored.
///
/// **WHY THIS MATTERS**: Any device on the network can advertise the service
/// types; only this device's own daemon may be used.
///
/// **BUG THIS CATCHES**: Storing a foreign host, or a port nobody listens on.
#[tokio::test]
async fn given_untrusted_records_when_resolved_then_ignored() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    controller.apply_discovery(ServiceEvent::Resolved {
        kind: ServiceKind::Pairing,
        host: "192.168.1.77".to_string(),
        port: 37000,
    });
    controller.apply_discovery(ServiceEvent::Resolved {
        kind: ServiceKind::Connect,
        host: LAN_ADDRESS.to_string(),
        port: 40000,
    });

    let state = controller.snapshot();
    assert_eq!(state.pairing_address, "");
    assert_eq!(state.connect_address, "");
}

#[tokio::test]
async fn given_lost_service_when_applied_then_address_cleared() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    controller.apply_discovery(ServiceEvent::Resolved {
        kind: ServiceKind::Connect,
        host: LAN_ADDRESS.to_string(),
        port: 5555,
    });
    assert_eq!(controller.snapshot().connect_address, "127.0.0.1:5555");

    controller.apply_discovery(ServiceEvent::Lost {
        kind: ServiceKind::Connect,
    });

    assert_eq!(controller.snapshot().connect_address, "");
}

#[tokio::test]
async fn given_discovery_failure_when_applied_then_error_recorded() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    controller.apply_discovery(ServiceEvent::Failed {
        kind: ServiceKind::Pairing,
        code: 3,
    });

    let state = controller.snapshot();
    assert_eq!(state.last_error.as_deref(), Some("Service discovery failed (3)."));
    assert_eq!(state.logs[0], "Pairing discovery failed (3)");
    assert_eq!(state.connection_state, ConnectionState::Idle);
}

#[tokio::test]
async fn given_pending_auto_connect_when_connect_service_resolves_then_connects() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller
        .request_pair("127.0.0.1:37000", RedactedPairingCode::new("123456"))
        .expect("queued");
    controller.drain().await.expect("drained");

    controller.apply_discovery(ServiceEvent::Resolved {
        kind: ServiceKind::Connect,
        host: LAN_ADDRESS.to_string(),
        port: 5555,
    });
    controller.drain().await.expect("drained");

    assert_eq!(backend.count("connect 127.0.0.1:5555"), 1);
    assert_eq!(controller.snapshot().connection_state, ConnectionState::Connected);
}
