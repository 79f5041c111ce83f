use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::Packet;
use socket2::{Domain, Protocol, Type};

use crate::ProbeError;

/// Large enough for any ICMP response including its quoted packet.
pub(crate) const RECV_BUFFER_LEN: usize = 1500;

/// Seam between the probe engine and the wire. One implementation per
/// socket flavor, plus a scripted mock for tests.
pub(crate) trait ProbeSocket {
    /// Sends `buf` to `dst` with the IP-layer TTL of this one packet set
    /// to `ttl`.
    fn send_to(&self, buf: &[u8], dst: Ipv4Addr, ttl: u8) -> Result<(), ProbeError>;

    /// Waits up to `timeout` for the next inbound ICMP message. Returns
    /// the ICMP bytes written into `buf` and the sender's address, or
    /// `None` when the deadline elapsed without a packet.
    fn recv_from(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, IpAddr)>, ProbeError>;
}

/// A raw ICMPv4 socket bound once per run. Raw sockets require elevated
/// privileges; creating one without them fails with `PermissionDenied`.
/// The descriptor is closed on drop, so the run releases it on every exit
/// path.
pub(crate) struct RawIcmpSocket {
    socket: socket2::Socket,
}

impl RawIcmpSocket {
    pub(crate) fn bind(local_addr: Ipv4Addr) -> io::Result<Self> {
        tracing::trace!(%local_addr, "creating raw ICMPv4 socket");
        let socket = socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.bind(&SocketAddrV4::new(local_addr, 0).into())?;
        Ok(RawIcmpSocket { socket })
    }
}

impl ProbeSocket for RawIcmpSocket {
    fn send_to(&self, buf: &[u8], dst: Ipv4Addr, ttl: u8) -> Result<(), ProbeError> {
        // The TTL applies to the socket, but with exactly one packet in
        // flight it is effectively per-send.
        self.socket.set_ttl(u32::from(ttl)).map_err(ProbeError::SetTtl)?;
        let addr = SocketAddr::new(IpAddr::V4(dst), 0);
        self.socket.send_to(buf, &addr.into()).map_err(ProbeError::Send)?;
        Ok(())
    }

    fn recv_from(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, IpAddr)>, ProbeError> {
        self.socket.set_read_timeout(Some(timeout)).map_err(ProbeError::Recv)?;

        let mut recv_buf = [0u8; RECV_BUFFER_LEN];
        // Socket2 guarantees it never reads from the buffer, which makes
        // this cast to `&mut [MaybeUninit<u8>]` sound:
        // https://docs.rs/socket2/0.4.7/socket2/struct.Socket.html#method.recv
        let recv_result = self.socket.recv_from(unsafe {
            &mut *(std::ptr::addr_of_mut!(recv_buf) as *mut [u8]
                as *mut [std::mem::MaybeUninit<u8>])
        });
        let (n, socket_addr) = match recv_result {
            Ok(ok) => ok,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(None);
            }
            Err(e) => return Err(ProbeError::Recv(e)),
        };

        // On a raw socket we get the whole IP packet. Hand back only the
        // ICMP content.
        let ipv4_packet = Ipv4Packet::new(&recv_buf[..n]).ok_or(ProbeError::Decode)?;
        let ip_payload = ipv4_packet.payload();
        let len = ip_payload.len().min(buf.len());
        buf[..len].copy_from_slice(&ip_payload[..len]);

        let peer = socket_addr
            .as_socket_ipv4()
            .map(|a| IpAddr::V4(*a.ip()))
            .ok_or_else(|| {
                ProbeError::Recv(io::Error::new(io::ErrorKind::Other, "peer address is not IPv4"))
            })?;
        Ok(Some((len, peer)))
    }
}
