//! TCP and UDP sockets.
//!
//! Thin blocking wrappers over `std::net`. Reads and writes go through
//! shared references so one thread may read while another writes.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{create_listener, resolve, wake_acceptor};
use crate::status::{codes, FatResult, Failure};

fn io_failure(context: &str, e: io::Error) -> Failure {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Failure::eof(),
        io::ErrorKind::InvalidInput | io::ErrorKind::AddrNotAvailable => {
            Failure::syntax(codes::SOCKET, format!("{}: {}", context, e))
        }
        _ => Failure::other(codes::SOCKET, format!("{}: {}", context, e)),
    }
}

fn addr_string(addr: io::Result<SocketAddr>) -> String {
    addr.map(|a| a.to_string()).unwrap_or_default()
}

// =============================================================================
// TCP
// =============================================================================

/// A connected TCP stream.
#[derive(Debug)]
pub struct TcpConn {
    stream: TcpStream,
}

impl TcpConn {
    pub fn dial(addr: &str) -> FatResult<Self> {
        let target = resolve(addr)?;
        let stream = TcpStream::connect(target).map_err(|e| io_failure("dial", e))?;
        tracing::debug!(remote = %target, "tcp connected");
        Ok(Self { stream })
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Read into `dst`. An orderly shutdown by the peer is EOF.
    pub fn read(&self, dst: &mut [u8]) -> FatResult<usize> {
        match (&self.stream).read(dst) {
            Ok(0) if !dst.is_empty() => Err(Failure::eof()),
            Ok(n) => Ok(n),
            Err(e) => Err(io_failure("read", e)),
        }
    }

    /// Write all of `src`.
    pub fn write(&self, src: &[u8]) -> FatResult<usize> {
        (&self.stream)
            .write_all(src)
            .map(|_| src.len())
            .map_err(|e| io_failure("write", e))
    }

    pub fn local_addr(&self) -> String {
        addr_string(self.stream.local_addr())
    }

    pub fn remote_addr(&self) -> String {
        addr_string(self.stream.peer_addr())
    }

    pub fn close(&self) -> FatResult<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(io_failure("close", e)),
        }
    }
}

/// A listening TCP socket.
///
/// Closing wakes threads blocked in `accept`, which then fail; the socket
/// itself is released when the last reference drops.
#[derive(Debug)]
pub struct TcpListener {
    listener: std::net::TcpListener,
    closed: AtomicBool,
}

fn closed_listener() -> Failure {
    Failure::other(codes::SOCKET, "accept: use of closed listener")
}

impl TcpListener {
    pub fn listen(addr: &str) -> FatResult<Self> {
        let target = resolve(addr)?;
        let listener = create_listener(target, codes::SOCKET)?;
        tracing::debug!(local = %addr_string(listener.local_addr()), "tcp listening");
        Ok(Self {
            listener,
            closed: AtomicBool::new(false),
        })
    }

    pub fn accept(&self) -> FatResult<TcpConn> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(closed_listener());
        }
        let (stream, peer) = self.listener.accept().map_err(|e| io_failure("accept", e))?;
        if self.closed.load(Ordering::SeqCst) {
            return Err(closed_listener());
        }
        tracing::debug!(%peer, "tcp accepted");
        Ok(TcpConn::from_stream(stream))
    }

    pub fn addr(&self) -> String {
        addr_string(self.listener.local_addr())
    }

    /// Stop accepting. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(addr) = self.listener.local_addr() {
            wake_acceptor(addr);
        }
        tracing::debug!(local = %self.addr(), "tcp listener closed");
    }
}

// =============================================================================
// UDP
// =============================================================================

/// A UDP socket, optionally connected to a fixed peer.
#[derive(Debug)]
pub struct UdpConn {
    socket: UdpSocket,
}

impl UdpConn {
    /// Bind to a local address.
    pub fn listen(addr: &str) -> FatResult<Self> {
        let local = resolve(addr)?;
        let socket = UdpSocket::bind(local).map_err(|e| io_failure("listen", e))?;
        Ok(Self { socket })
    }

    /// Bind an ephemeral port and connect to `addr`.
    pub fn dial(addr: &str) -> FatResult<Self> {
        let remote = resolve(addr)?;
        let local: SocketAddr = if remote.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(|e| io_failure("dial", e))?;
        socket.connect(remote).map_err(|e| io_failure("dial", e))?;
        Ok(Self { socket })
    }

    /// Receive one datagram, returning its length and sender.
    pub fn read_from(&self, dst: &mut [u8]) -> FatResult<(usize, String)> {
        let (n, from) = self
            .socket
            .recv_from(dst)
            .map_err(|e| io_failure("read_from", e))?;
        Ok((n, from.to_string()))
    }

    pub fn write_to(&self, src: &[u8], addr: &str) -> FatResult<usize> {
        let target = resolve(addr)?;
        self.socket
            .send_to(src, target)
            .map_err(|e| io_failure("write_to", e))
    }

    /// Send to the connected peer.
    pub fn write(&self, src: &[u8]) -> FatResult<usize> {
        self.socket.send(src).map_err(|e| io_failure("write", e))
    }

    pub fn local_addr(&self) -> String {
        addr_string(self.socket.local_addr())
    }

    /// Connected peer, or an empty string.
    pub fn remote_addr(&self) -> String {
        addr_string(self.socket.peer_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn test_tcp_echo() {
        let listener = TcpListener::listen("127.0.0.1:0").unwrap();
        let addr = listener.addr();
        let server = std::thread::spawn(move || {
            let conn = listener.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = conn.read(&mut buf).unwrap();
            conn.write(&buf[..n]).unwrap();
            conn.close().unwrap();
        });

        let client = TcpConn::dial(&addr).unwrap();
        assert_eq!(client.remote_addr(), addr);
        client.write(b"ping").unwrap();
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert!(client.read(&mut buf).unwrap_err().is_eof());
        server.join().unwrap();
    }

    #[test]
    fn test_close_wakes_blocked_accept() {
        let listener = std::sync::Arc::new(TcpListener::listen("127.0.0.1:0").unwrap());
        let blocked = {
            let listener = listener.clone();
            std::thread::spawn(move || listener.accept())
        };
        std::thread::sleep(std::time::Duration::from_millis(100));
        listener.close();

        let err = blocked.join().unwrap().unwrap_err();
        assert_eq!(err.status, Status::Other);
        assert_eq!(err.code, codes::SOCKET);
        assert!(listener.accept().is_err());
        listener.close();
    }

    #[test]
    fn test_bad_address_is_syntax() {
        let err = TcpConn::dial("not an address").unwrap_err();
        assert_eq!(err.status, Status::Syntax);
        assert_eq!(err.code, codes::SOCKET);
    }

    #[test]
    fn test_udp_exchange() {
        let server = UdpConn::listen("127.0.0.1:0").unwrap();
        assert_eq!(server.remote_addr(), "");
        let client = UdpConn::dial(&server.local_addr()).unwrap();
        assert_eq!(client.write(b"dgram").unwrap(), 5);

        let mut buf = [0u8; 32];
        let (n, from) = server.read_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"dgram");
        assert_eq!(from, client.local_addr().replace("0.0.0.0", "127.0.0.1"));

        server.write_to(b"back", &from).unwrap();
        let (n, _) = client.read_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"back");
    }
}
