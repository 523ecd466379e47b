//! Local-only target policy.
//!
//! Every pairing and connection target passes through [`SecurityPolicy::is_self_host`]
//! before it reaches the backend. This is the only thing keeping the controller
//! from being pointed at a remote host.

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::net::IpAddr;

use log::trace;
use sysinfo::Networks;

const LOCALHOST_NAME: &str = "localhost";
const LOOPBACK_V4: &str = "127.0.0.1";
const LOOPBACK_V6: &str = "::1";

/// A parsed `host:port` or `[host]:port` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl Display for HostPort {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        if self.host.contains(':') {
            write!(formatter, "[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{}:{}", self.host, self.port)
        }
    }
}

/// Parse `host:port` or `[host]:port`.
///
/// Hosts containing colons must use the bracket form. The port must be in
/// `1..=65535` and the host must not be blank.
pub fn parse_host_port(input: &str) -> Option<HostPort> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
        let end = rest.find(']')?;
        let port = rest[end + 1..].strip_prefix(':')?;
        (&rest[..end], port)
    } else {
        let colon = trimmed.rfind(':')?;
        if colon == 0 || colon == trimmed.len() - 1 {
            return None;
        }
        let host = &trimmed[..colon];
        if host.contains(':') {
            return None;
        }
        (host, &trimmed[colon + 1..])
    };

    let port = port.parse::<u32>().ok()?;
    if !(1..=65535).contains(&port) || host.trim().is_empty() {
        return None;
    }

    Some(HostPort {
        host: host.to_string(),
        port: port as u16,
    })
}

#[derive(Debug, Clone)]
enum AddressSource {
    System,
    Fixed(HashSet<IpAddr>),
}

/// Decides whether a host refers to this machine.
///
/// The system variant re-reads the interface list on every check so an address
/// that disappears (Wi-Fi drop) stops being trusted immediately.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    source: AddressSource,
}

impl SecurityPolicy {
    /// Policy backed by the live interface list.
    pub fn system() -> Self {
        Self {
            source: AddressSource::System,
        }
    }

    /// Policy with a fixed set of local addresses (tests, sandboxes).
    pub fn with_local_addresses(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            source: AddressSource::Fixed(addresses.into_iter().collect()),
        }
    }

    /// True for `localhost`, `127.0.0.1`, `::1`, or any unicast address bound
    /// to a local interface.
    pub fn is_self_host(&self, host: &str) -> bool {
        let normalized = host.trim();
        if normalized.eq_ignore_ascii_case(LOCALHOST_NAME)
            || normalized == LOOPBACK_V4
            || normalized == LOOPBACK_V6
        {
            return true;
        }

        match normalized.parse::<IpAddr>() {
            Ok(ip) => self.local_addresses().contains(&ip),
            Err(_) => false,
        }
    }

    /// Parse `target` and check its host. `None` when the target is malformed.
    pub fn local_target(&self, target: &str) -> Option<HostPort> {
        parse_host_port(target).filter(|parsed| self.is_self_host(&parsed.host))
    }

    /// Unicast addresses currently bound to local interfaces.
    pub fn local_addresses(&self) -> HashSet<IpAddr> {
        match &self.source {
            AddressSource::Fixed(addresses) => addresses.clone(),
            AddressSource::System => system_addresses(),
        }
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::system()
    }
}

fn system_addresses() -> HashSet<IpAddr> {
    let networks = Networks::new_with_refreshed_list();
    let addresses: HashSet<IpAddr> = networks
        .iter()
        .flat_map(|(_, data)| data.ip_networks().iter().map(|network| network.addr))
        .filter(|addr| !addr.is_multicast())
        .collect();

    trace!("Local interface addresses: {addresses:?}");
    addresses
}
