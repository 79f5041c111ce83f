#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]

//! A traceroute (ICMP) library: discovers the routers between this host
//! and a destination by sending Echo Requests with increasing TTLs and
//! classifying the ICMP responses. Probing is sequential and blocking;
//! one probe per TTL, one probe in flight at a time. Requires a raw
//! socket, so elevated privileges are needed.

pub use hop::Hop;
pub use trace_error::{ProbeError, TraceError, TraceResult};
pub use tracer::Tracer;

mod hop;
mod icmpv4;
mod icmpv4_socket;
mod trace_error;
mod tracer;
mod utils;
