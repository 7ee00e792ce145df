use std::{
    io,
    net::{SocketAddr, UdpSocket},
    sync::{Arc, Mutex},
    time::Duration,
};

/// The little the [reliable socket](super::ReliableSocket) needs from the host network stack
pub trait Datagram: Send + Sync {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Blocks until a datagram arrives, or fails with [`io::ErrorKind::WouldBlock`] /
    /// [`io::ErrorKind::TimedOut`] once the receive timeout elapses
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// After closing, sends and receives fail
    fn close(&self);
}

/// A [datagram](Datagram) backed by a [std udp socket](UdpSocket). Closing releases the port
/// as soon as a receive still in flight times out
pub struct UdpDatagram {
    socket: Mutex<Option<Arc<UdpSocket>>>,
}

impl UdpDatagram {
    /// Binds to `addr`, bounding every receive by `receive_timeout`
    pub fn bind(addr: SocketAddr, receive_timeout: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(receive_timeout))?;

        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
        })
    }

    /// The open socket. The lock is only held to clone it, never across a blocking call
    fn open(&self) -> io::Result<Arc<UdpSocket>> {
        self.socket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket closed"))
    }
}

impl Datagram for UdpDatagram {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.open()?.send_to(buf, target)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.open()?.recv_from(buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.open()?.local_addr()
    }

    fn close(&self) {
        self.socket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

/// Whether a failed receive only means nothing arrived in time
pub(crate) fn is_receive_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_times_out_then_closes() {
        let datagram =
            UdpDatagram::bind("127.0.0.1:0".parse().unwrap(), Duration::from_millis(10)).unwrap();
        let target = datagram.local_addr().unwrap();
        let mut buf = [0; 8];

        let error = datagram.recv_from(&mut buf).unwrap_err();
        assert!(is_receive_timeout(&error));

        datagram.close();
        let error = datagram.recv_from(&mut buf).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotConnected);
        assert!(!is_receive_timeout(&error));
        assert!(datagram.send_to(&buf, target).is_err());
        assert!(datagram.local_addr().is_err());
    }

    #[test]
    fn test_close_releases_the_port() {
        let datagram =
            UdpDatagram::bind("127.0.0.1:0".parse().unwrap(), Duration::from_millis(10)).unwrap();
        let addr = datagram.local_addr().unwrap();

        datagram.close();
        let rebound = UdpDatagram::bind(addr, Duration::from_millis(10)).unwrap();
        assert_eq!(rebound.local_addr().unwrap(), addr);
    }
}
