//! Intake for locally broadcast wireless-debugging services.
//!
//! The mDNS transport lives outside this crate. It hands resolved records to
//! the session as [`ServiceEvent`]s; everything in here treats them as
//! untrusted and re-checks them before they touch session state.

pub mod probe;

use crate::LOCAL_HOSTNAME;
use crate::error::discovery::DiscoveryError;
use crate::security::SecurityPolicy;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::net::IpAddr;
use std::panic::Location;

use log::warn;
use serde::{Deserialize, Serialize};

pub const PAIRING_SERVICE: &str = "_adb-tls-pairing._tcp";
pub const CONNECT_SERVICE: &str = "_adb-tls-connect._tcp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Pairing,
    Connect,
}

impl ServiceKind {
    pub fn service_type(&self) -> &'static str {
        match self {
            ServiceKind::Pairing => PAIRING_SERVICE,
            ServiceKind::Connect => CONNECT_SERVICE,
        }
    }

    /// Map a DNS-SD service type (trailing dot tolerated) to a kind.
    pub fn from_service_type(service_type: &str) -> Option<Self> {
        match service_type.trim_end_matches('.') {
            PAIRING_SERVICE => Some(ServiceKind::Pairing),
            CONNECT_SERVICE => Some(ServiceKind::Connect),
            _ => None,
        }
    }
}

impl Display for ServiceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            ServiceKind::Pairing => write!(formatter, "Pairing"),
            ServiceKind::Connect => write!(formatter, "Connect"),
        }
    }
}

/// What the discovery transport reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Resolved {
        kind: ServiceKind,
        host: String,
        port: u16,
    },
    Lost {
        kind: ServiceKind,
    },
    Failed {
        kind: ServiceKind,
        code: i32,
    },
}

/// Checks whether a TCP port has a listener on this machine.
pub trait PortProbe: Send + Sync {
    fn is_listening(&self, port: u16) -> bool;
}

/// [`PortProbe`] backed by the system socket table.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetstatProbe;

impl PortProbe for NetstatProbe {
    fn is_listening(&self, port: u16) -> bool {
        match probe::is_port_listening(port) {
            Ok(listening) => listening,
            Err(e) => {
                warn!("Socket probe for port {port} failed: {e}");
                false
            }
        }
    }
}

/// Accept a resolved service record.
///
/// The host must be one of this machine's interface addresses and the port must
/// have a live listener. Accepted records are normalised to the loopback
/// address, which is where the debug daemon is reachable.
#[track_caller]
pub fn accept_resolved(
    host: &str,
    port: u16,
    policy: &SecurityPolicy,
    probe: &dyn PortProbe,
) -> Result<String, DiscoveryError> {
    let on_local_interface = host
        .trim()
        .parse::<IpAddr>()
        .is_ok_and(|ip| policy.local_addresses().contains(&ip) || ip.is_loopback());

    if !on_local_interface {
        return Err(DiscoveryError::Rejected {
            message: format!("Service host {host} is not a local interface"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if port == 0 || !probe.is_listening(port) {
        return Err(DiscoveryError::Rejected {
            message: format!("Nothing is listening on port {port}"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(format!("{LOCAL_HOSTNAME}:{port}"))
}
