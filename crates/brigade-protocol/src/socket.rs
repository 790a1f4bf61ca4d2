use std::io;
use std::net::{SocketAddr, UdpSocket as StdUdpSocket};

/// Thin non-blocking UDP wrapper. The tick loop polls `recv_from` once per
/// phase rather than suspending on it, so the socket is always set
/// non-blocking at bind time.
pub struct Socket {
    inner: StdUdpSocket,
}

impl Socket {
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let inner = StdUdpSocket::bind(addr)?;
        inner.set_nonblocking(true)?;
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.inner.send_to(buf, addr)
    }

    /// `Ok(None)` means no datagram was queued, not an error.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.inner.recv_from(buf) {
            Ok((n, from)) => Ok(Some((n, from))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}
