//! The non-blocking socket pair: a length-prefixed TCP stream for the
//! reliable channel and a connected `UdpSocket` for the unreliable
//! datagram channel. Both are keyed by the same remote address
//! (`SPEC_FULL.md` §4.2).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use super::TransportError;

/// Datagrams larger than this are rejected rather than silently truncated.
pub const MAX_DATAGRAM_SIZE: usize = 4096;
/// Reliable frames larger than this are rejected; guards against a
/// corrupted length prefix driving an unbounded allocation.
const MAX_RELIABLE_FRAME_SIZE: u32 = 1 << 22;

/// One inbound unit of data off either channel.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Reliable(Vec<u8>),
    Datagram(Vec<u8>),
}

/// Opens and owns both channels to one remote game server.
pub struct Transport {
    tcp: TcpStream,
    udp: UdpSocket,
    reliable_read_buf: Vec<u8>,
}

impl Transport {
    /// Opens both channels to `addr`. `udp_addr` is usually the same host
    /// and port as `addr`; they're kept distinct because the datagram
    /// channel may be relayed through a different port (§4.5 relays).
    pub fn connect(addr: SocketAddr, udp_addr: SocketAddr, timeout: Duration) -> Result<Self, TransportError> {
        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        tcp.set_nonblocking(true)?;
        tcp.set_nodelay(true)?;

        let udp = UdpSocket::bind("0.0.0.0:0")?;
        udp.connect(udp_addr)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        udp.set_nonblocking(true)?;

        Ok(Self {
            tcp,
            udp,
            reliable_read_buf: Vec::new(),
        })
    }

    /// Sends a frame on the reliable channel, length-prefixed (`len:u32`)
    /// so the byte stream can be split back into frames on the other end.
    pub fn send_reliable(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let len = bytes.len() as u32;
        let mut framed = Vec::with_capacity(4 + bytes.len());
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(bytes);
        self.write_all_nonblocking(&framed)
    }

    pub fn send_datagram(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::SocketError(format!(
                "datagram of {} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_DATAGRAM_SIZE
            )));
        }
        self.udp.send(bytes)?;
        Ok(())
    }

    /// A non-blocking write loop: TCP writes rarely block on a healthy
    /// connection at these message sizes, but would-block is handled by
    /// retrying briefly rather than failing the send outright.
    fn write_all_nonblocking(&mut self, mut buf: &[u8]) -> Result<(), TransportError> {
        let deadline = Instant::now() + Duration::from_millis(500);
        while !buf.is_empty() {
            match self.tcp.write(buf) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(TransportError::Timeout);
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Drains everything currently available on both channels without
    /// blocking past `timeout`. Returns as soon as at least one event is
    /// available, or once `timeout` elapses with nothing to report.
    pub fn poll(&mut self, timeout: Duration) -> Result<Vec<PollEvent>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut events = Vec::new();
            self.drain_datagrams(&mut events)?;
            self.drain_reliable(&mut events)?;
            if !events.is_empty() || Instant::now() >= deadline {
                return Ok(events);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn drain_datagrams(&mut self, out: &mut Vec<PollEvent>) -> Result<(), TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            match self.udp.recv(&mut buf) {
                Ok(n) => out.push(PollEvent::Datagram(buf[..n].to_vec())),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn drain_reliable(&mut self, out: &mut Vec<PollEvent>) -> Result<(), TransportError> {
        let mut buf = [0u8; 4096];
        loop {
            match self.tcp.read(&mut buf) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => self.reliable_read_buf.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        while let Some(frame) = self.take_reliable_frame()? {
            out.push(PollEvent::Reliable(frame));
        }
        Ok(())
    }

    fn take_reliable_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.reliable_read_buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes(self.reliable_read_buf[0..4].try_into().unwrap());
        if len > MAX_RELIABLE_FRAME_SIZE {
            return Err(TransportError::SocketError(format!(
                "reliable frame length {len} exceeds the maximum"
            )));
        }
        let len = len as usize;
        if self.reliable_read_buf.len() < 4 + len {
            return Ok(None);
        }
        let frame = self.reliable_read_buf[4..4 + len].to_vec();
        self.reliable_read_buf.drain(0..4 + len);
        Ok(Some(frame))
    }

    pub fn local_udp_addr(&self) -> std::io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    pub fn close(self) {
        let _ = self.tcp.shutdown(std::net::Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn loopback_transport_pair() -> (Transport, TcpStream, UdpSocket) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let tcp_addr = listener.local_addr().unwrap();
        let server_udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_udp_addr = server_udp.local_addr().unwrap();

        let client = Transport::connect(tcp_addr, server_udp_addr, Duration::from_secs(1)).unwrap();
        let (server_tcp, _) = listener.accept().unwrap();
        server_udp.connect(client.local_udp_addr().unwrap()).unwrap();

        (client, server_tcp, server_udp)
    }

    #[test]
    fn reliable_frame_roundtrips_through_length_prefix() {
        let (mut client, mut server_tcp, _server_udp) = loopback_transport_pair();
        client.send_reliable(b"hello reliable").unwrap();

        let mut buf = [0u8; 64];
        std::thread::sleep(Duration::from_millis(20));
        let n = server_tcp.read(&mut buf).unwrap();
        assert_eq!(&buf[4..n], b"hello reliable");
    }

    #[test]
    fn datagram_roundtrips() {
        let (mut client, _server_tcp, server_udp) = loopback_transport_pair();
        client.send_datagram(b"hi").unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let mut buf = [0u8; 64];
        let n = server_udp.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hi");
    }

    #[test]
    fn poll_returns_empty_after_timeout_with_nothing_sent() {
        let (mut client, _server_tcp, _server_udp) = loopback_transport_pair();
        let events = client.poll(Duration::from_millis(10)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn poll_surfaces_both_channels() {
        let (mut client, mut server_tcp, server_udp) = loopback_transport_pair();
        server_tcp.write_all(&5u32.to_be_bytes()).unwrap();
        server_tcp.write_all(b"howdy").unwrap();
        server_udp.send(b"dg").unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let events = client.poll(Duration::from_millis(50)).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, PollEvent::Reliable(b) if b == b"howdy")));
        assert!(events
            .iter()
            .any(|e| matches!(e, PollEvent::Datagram(b) if b == b"dg")));
    }

    #[test]
    fn oversized_datagram_is_rejected() {
        let (mut client, _server_tcp, _server_udp) = loopback_transport_pair();
        let big = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        assert!(client.send_datagram(&big).is_err());
    }
}
