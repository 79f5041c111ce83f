use std::net::{IpAddr, Ipv4Addr};

use crate::TraceError;

/// Resolves `hostname` and selects the first IPv4 candidate. IPv6-only
/// hosts fail with [`TraceError::NoUsableAddress`] before any packet is
/// sent.
pub(crate) fn lookup_host_v4(hostname: &str) -> Result<Ipv4Addr, TraceError> {
    let ips: Vec<IpAddr> = dns_lookup::lookup_host(hostname).map_err(|source| {
        TraceError::Resolve { host: hostname.to_owned(), source }
    })?;
    first_ipv4(&ips).ok_or_else(|| TraceError::NoUsableAddress(hostname.to_owned()))
}

fn first_ipv4(ips: &[IpAddr]) -> Option<Ipv4Addr> {
    ips.iter().find_map(|ip| match ip {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(_) => None,
    })
}
