use std::io;

use thiserror::Error;

use crate::hop::Hop;

pub type TraceResult<T> = std::result::Result<T, TraceError>;

/// A fatal, run-level failure. Recoverable per-hop conditions (timeout,
/// uninformative reply) are never errors; they show up as silent [`Hop`]s.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("could not resolve host {host}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// The host resolved, but to no IPv4 address.
    #[error("no usable remote address for host {0}")]
    NoUsableAddress(String),

    #[error("could not set up ICMP socket")]
    SocketSetup(#[source] io::Error),

    /// A probe failed mid-run. Carries the hops gathered before the abort.
    #[error("probe with ttl {ttl} failed")]
    Aborted {
        ttl: u8,
        hops: Vec<Hop>,
        #[source]
        source: ProbeError,
    },
}

impl TraceError {
    /// The hops collected before the run was aborted (empty unless the
    /// error is [`TraceError::Aborted`]).
    #[must_use]
    pub fn partial_hops(&self) -> &[Hop] {
        match self {
            TraceError::Aborted { hops, .. } => hops,
            _ => &[],
        }
    }
}

/// Failure of a single probe. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not encode ICMP echo request")]
    Encode,

    #[error("could not set ttl on outgoing packet")]
    SetTtl(#[source] io::Error),

    #[error("could not send probe")]
    Send(#[source] io::Error),

    #[error("could not receive from socket")]
    Recv(#[source] io::Error),

    #[error("received bytes do not form an ICMP message")]
    Decode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_aborted() {
        let error = TraceError::Aborted {
            ttl: 4,
            hops: vec![Hop::silent(1)],
            source: ProbeError::Decode,
        };
        assert_eq!("probe with ttl 4 failed", format!("{error}"));
    }

    #[test]
    fn aborted_carries_partial_hops() {
        let error = TraceError::Aborted {
            ttl: 2,
            hops: vec![Hop::silent(1)],
            source: ProbeError::Encode,
        };
        assert_eq!(1, error.partial_hops().len());
    }

    #[test]
    fn partial_hops_empty_before_first_probe() {
        let error = TraceError::NoUsableAddress("example.invalid".to_string());
        assert!(error.partial_hops().is_empty());
    }

    #[test]
    fn source_is_chained() {
        use std::error::Error;
        let error = TraceError::SocketSetup(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(error.source().is_some());
    }
}
