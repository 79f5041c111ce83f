use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::hop::Hop;
use crate::icmpv4::{self, IcmpMessage};
use crate::icmpv4_socket::{ProbeSocket, RawIcmpSocket, RECV_BUFFER_LEN};
use crate::trace_error::{ProbeError, TraceError, TraceResult};
use crate::utils;

const DEFAULT_MAX_TTL: u8 = 30;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// A single traceroute session: configuration plus the sequential per-TTL
/// probe loop.
///
/// Probes are sent one at a time with TTL 1, 2, 3, ... and the run ends
/// when the destination answers with an Echo Reply or the TTL budget is
/// exhausted. Each TTL is probed exactly once; an unanswered probe becomes
/// a silent [`Hop`] and the run moves on.
///
/// ```no_run
/// use tracehop::Tracer;
///
/// let hops = Tracer::new("example.com").run()?;
/// for hop in &hops {
///     println!("{hop}");
/// }
/// # Ok::<(), tracehop::TraceError>(())
/// ```
pub struct Tracer {
    local_addr: Ipv4Addr,
    remote_host: String,
    max_ttl: u8,
    timeout: Duration,
    identifier: u16,
}

/// Classification of one probe's outcome.
enum Outcome {
    /// Timeout, or a response that tells us nothing about this hop.
    Silent,
    /// Time Exceeded from an intermediate router.
    Router { peer: std::net::IpAddr, rtt: Duration },
    /// Echo Reply from the destination; terminates the run.
    Destination { peer: std::net::IpAddr, rtt: Duration },
}

impl Tracer {
    /// Creates a session for `remote_host` with the defaults: bind to any
    /// address, max TTL 30, 3 second per-probe timeout, random identifier.
    pub fn new(remote_host: impl Into<String>) -> Self {
        Tracer {
            local_addr: Ipv4Addr::UNSPECIFIED,
            remote_host: remote_host.into(),
            max_ttl: DEFAULT_MAX_TTL,
            timeout: DEFAULT_TIMEOUT,
            identifier: rand::thread_rng().gen(),
        }
    }

    #[must_use]
    pub fn local_addr(mut self, local_addr: Ipv4Addr) -> Self {
        self.local_addr = local_addr;
        self
    }

    #[must_use]
    pub fn max_ttl(mut self, max_ttl: u8) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the 16-bit tag that marks this run's probes. Concurrent
    /// runs on one host must use distinct identifiers.
    #[must_use]
    pub fn identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    /// Runs the trace once. On a fatal mid-run failure the hops gathered
    /// so far travel inside [`TraceError::Aborted`].
    pub fn run(&self) -> TraceResult<Vec<Hop>> {
        let dst = utils::lookup_host_v4(&self.remote_host)?;
        tracing::debug!(remote = %self.remote_host, %dst, "resolved remote host");
        let socket = RawIcmpSocket::bind(self.local_addr).map_err(TraceError::SocketSetup)?;
        self.run_on(&socket, dst)
    }

    fn run_on<S: ProbeSocket>(&self, socket: &S, dst: Ipv4Addr) -> TraceResult<Vec<Hop>> {
        let mut hops: Vec<Hop> = vec![];
        for ttl in 1..self.max_ttl {
            match self.probe(socket, dst, ttl) {
                Ok(Outcome::Silent) => {
                    tracing::debug!(ttl, "no answer");
                    hops.push(Hop::silent(ttl));
                }
                Ok(Outcome::Router { peer, rtt }) => {
                    tracing::debug!(ttl, %peer, ?rtt, "intermediate router");
                    hops.push(Hop::responded(ttl, peer, rtt));
                }
                Ok(Outcome::Destination { peer, rtt }) => {
                    tracing::debug!(ttl, %peer, ?rtt, "destination reached");
                    hops.push(Hop::responded(ttl, peer, rtt));
                    return Ok(hops);
                }
                Err(source) => return Err(TraceError::Aborted { ttl, hops, source }),
            }
        }
        Ok(hops)
    }

    /// One send/receive/classify cycle for a single TTL.
    fn probe<S: ProbeSocket>(
        &self,
        socket: &S,
        dst: Ipv4Addr,
        ttl: u8,
    ) -> Result<Outcome, ProbeError> {
        let request = icmpv4::encode_echo_request(self.identifier, u16::from(ttl))?;
        let begin = Instant::now();
        socket.send_to(&request, dst, ttl)?;

        let mut buf = [0u8; RECV_BUFFER_LEN];
        let (n, peer) = match socket.recv_from(&mut buf, self.timeout)? {
            Some(received) => received,
            None => {
                tracing::trace!(ttl, "probe timed out");
                return Ok(Outcome::Silent);
            }
        };
        let rtt = begin.elapsed();

        match icmpv4::decode(&buf[..n])? {
            IcmpMessage::TimeExceeded { quoted } => {
                // When the router quoted our request we can check that the
                // expiry belongs to this probe and not to stale traffic.
                if let Some(quoted) = quoted {
                    if quoted.identifier != self.identifier || quoted.sequence != u16::from(ttl) {
                        tracing::trace!(ttl, "time exceeded for a foreign probe");
                        return Ok(Outcome::Silent);
                    }
                }
                Ok(Outcome::Router { peer, rtt })
            }
            IcmpMessage::EchoReply { identifier, sequence } => {
                if identifier != self.identifier {
                    tracing::trace!(ttl, identifier, "echo reply with foreign identifier");
                    return Ok(Outcome::Silent);
                }
                // Only the destination sends Echo Replies; a stale sequence
                // from an earlier probe still pins down the path end.
                if sequence != u16::from(ttl) {
                    tracing::trace!(ttl, sequence, "echo reply answers an earlier probe");
                }
                Ok(Outcome::Destination { peer, rtt })
            }
            IcmpMessage::Other { icmp_type, icmp_code } => {
                tracing::trace!(ttl, icmp_type, icmp_code, "uninformative ICMP message");
                Ok(Outcome::Silent)
            }
        }
    }
}
