use pnet_packet::icmp::{
    echo_reply::EchoReplyPacket,
    echo_request::{
        EchoRequestPacket as EchoRequestPacketV4,
        MutableEchoRequestPacket as MutableEchoRequestPacketV4,
    },
    time_exceeded::TimeExceededPacket,
    IcmpCode, IcmpPacket, IcmpTypes,
};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::Packet;

use crate::ProbeError;

/// Fixed probe payload, wire-compatible with the classic "R-U-OK?" probe.
pub(crate) const ECHO_PAYLOAD: &[u8] = b"R-U-OK?";

/// An inbound ICMP message reduced to what the classifier needs.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum IcmpMessage {
    EchoReply { identifier: u16, sequence: u16 },
    /// `quoted` is the Echo Request embedded in the Time Exceeded body,
    /// when the router quoted enough of it to parse.
    TimeExceeded { quoted: Option<QuotedEcho> },
    Other { icmp_type: u8, icmp_code: u8 },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct QuotedEcho {
    pub identifier: u16,
    pub sequence: u16,
}

/// Marshals an ICMP Echo Request (type 8, code 0) with the fixed payload.
pub(crate) fn encode_echo_request(identifier: u16, sequence: u16) -> Result<Vec<u8>, ProbeError> {
    let buf = vec![0u8; EchoRequestPacketV4::minimum_packet_size() + ECHO_PAYLOAD.len()];
    let mut packet = MutableEchoRequestPacketV4::owned(buf).ok_or(ProbeError::Encode)?;
    packet.set_icmp_type(IcmpTypes::EchoRequest);
    packet.set_icmp_code(IcmpCode::new(0));
    packet.set_identifier(identifier);
    packet.set_sequence_number(sequence);
    packet.set_payload(ECHO_PAYLOAD);

    let checksum =
        pnet_packet::icmp::checksum(&IcmpPacket::new(packet.packet()).ok_or(ProbeError::Encode)?);
    packet.set_checksum(checksum);
    Ok(packet.packet().to_vec())
}

/// Parses raw ICMP bytes. Unknown types parse into [`IcmpMessage::Other`];
/// only bytes too short to carry an ICMP header fail.
pub(crate) fn decode(buf: &[u8]) -> Result<IcmpMessage, ProbeError> {
    let packet = IcmpPacket::new(buf).ok_or(ProbeError::Decode)?;
    match packet.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let reply = EchoReplyPacket::new(buf).ok_or(ProbeError::Decode)?;
            Ok(IcmpMessage::EchoReply {
                identifier: reply.get_identifier(),
                sequence: reply.get_sequence_number(),
            })
        }
        IcmpTypes::TimeExceeded => {
            let exceeded = TimeExceededPacket::new(buf).ok_or(ProbeError::Decode)?;
            Ok(IcmpMessage::TimeExceeded { quoted: parse_quoted_echo(exceeded.payload()) })
        }
        other => Ok(IcmpMessage::Other {
            icmp_type: other.0,
            icmp_code: packet.get_icmp_code().0,
        }),
    }
}

// The Time Exceeded body quotes the originating IP packet (header plus at
// least 8 bytes of its payload). Routers truncate inconsistently, so a
// parse failure here yields None rather than an error.
fn parse_quoted_echo(quoted: &[u8]) -> Option<QuotedEcho> {
    let ipv4 = Ipv4Packet::new(quoted)?;
    if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return None;
    }
    let echo = EchoRequestPacketV4::new(ipv4.payload())?;
    if echo.get_icmp_type() != IcmpTypes::EchoRequest {
        return None;
    }
    Some(QuotedEcho {
        identifier: echo.get_identifier(),
        sequence: echo.get_sequence_number(),
    })
}
