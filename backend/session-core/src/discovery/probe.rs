use crate::error::discovery::DiscoveryError;

use common::ErrorLocation;

use std::panic::Location;

use log::trace;
use netstat2::{
    AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, SocketInfo, TcpState, get_sockets_info,
};

#[track_caller]
fn query_tcp_sockets() -> Result<Vec<SocketInfo>, DiscoveryError> {
    get_sockets_info(
        AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6,
        ProtocolFlags::TCP,
    )
    .map_err(|e| DiscoveryError::NetworkQuery {
        message: format!("Failed to query network sockets: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })
}

/// True when some local socket is listening on `port`.
#[track_caller]
pub fn is_port_listening(port: u16) -> Result<bool, DiscoveryError> {
    let sockets = query_tcp_sockets()?;

    let listening = sockets.iter().any(|s| {
        matches!(
            &s.protocol_socket_info,
            ProtocolSocketInfo::Tcp(tcp) if tcp.state == TcpState::Listen && tcp.local_port == port
        )
    });

    trace!("Port {port} listening: {listening}");
    Ok(listening)
}
