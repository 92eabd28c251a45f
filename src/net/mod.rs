//! Networking
//!
//! Blocking TCP/UDP sockets and an HTTP client plus in-process HTTP test
//! server.

pub mod http;
pub mod socket;

use std::net::{
    IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener as StdTcpListener, TcpStream,
    ToSocketAddrs,
};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::status::{codes, FatResult, Failure};

/// Resolve `host:port`. Unparseable or unresolvable addresses are `Syntax`.
pub fn resolve(addr: &str) -> FatResult<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| Failure::syntax(codes::SOCKET, format!("address {:?}: {}", addr, e)))?
        .next()
        .ok_or_else(|| Failure::syntax(codes::SOCKET, format!("address {:?}: no addresses", addr)))
}

/// Unblock a thread parked in `accept()` on `addr` by connecting to it. The
/// acceptor must check its shutdown flag before using the connection.
pub(crate) fn wake_acceptor(addr: SocketAddr) {
    let target: SocketAddr = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => (Ipv4Addr::LOCALHOST, addr.port()).into(),
        IpAddr::V6(ip) if ip.is_unspecified() => (Ipv6Addr::LOCALHOST, addr.port()).into(),
        _ => addr,
    };
    let _ = TcpStream::connect_timeout(&target, Duration::from_secs(1));
}

/// Create a TCP listener with SO_REUSEADDR.
pub(crate) fn create_listener(addr: SocketAddr, code: i32) -> FatResult<StdTcpListener> {
    let io_failure = |e: std::io::Error| Failure::other(code, format!("listen {}: {}", addr, e));

    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(io_failure)?;
    socket.set_reuse_address(true).map_err(io_failure)?;
    socket.bind(&addr.into()).map_err(io_failure)?;
    socket.listen(128).map_err(io_failure)?;
    Ok(socket.into())
}
