use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// One entry of a trace: the response (or lack of one) observed for a
/// single TTL value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    /// The TTL of the probe, 1-based. Doubles as the probe sequence number.
    pub ttl: u8,
    /// Address of the responding router or destination, `None` when the
    /// probe went unanswered.
    pub peer: Option<IpAddr>,
    /// Round-trip time; always `None` for an unanswered probe.
    pub rtt: Option<Duration>,
}

impl Hop {
    pub(crate) fn silent(ttl: u8) -> Self {
        Hop { ttl, peer: None, rtt: None }
    }

    pub(crate) fn responded(ttl: u8, peer: IpAddr, rtt: Duration) -> Self {
        Hop { ttl, peer: Some(peer), rtt: Some(rtt) }
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.peer.is_none()
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.peer, self.rtt) {
            (Some(peer), Some(rtt)) => {
                write!(f, "{}\t{}\t{:.2}ms", self.ttl, peer, rtt.as_secs_f64() * 1000.0)
            }
            _ => write!(f, "{}\t*", self.ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn fmt_silent() {
        assert_eq!("5\t*", format!("{}", Hop::silent(5)));
    }

    #[test]
    fn fmt_responded() {
        let hop = Hop::responded(
            3,
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            Duration::from_micros(12_300),
        );
        assert_eq!("3\t10.0.0.1\t12.30ms", format!("{hop}"));
    }

    #[test]
    fn silent_hop_has_no_rtt() {
        let hop = Hop::silent(7);
        assert!(hop.is_silent());
        assert!(hop.rtt.is_none());
    }
}
