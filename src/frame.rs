//! Ethernet/IPv4/UDP framing around a reservation PDU. The dispatcher hands
//! this module the raw captured frame; everything here about Ethernet/IP/UDP
//! is read-only except for substituting the 45-byte payload in place, which
//! preserves every other header byte-for-byte (SPEC_FULL.md §4.6).
//!
//! Checksums are not recomputed when the payload is substituted, matching
//! the reference implementation's `scapy` layer substitution: this is a
//! controller-internal rewrite of a frame already known to carry a valid
//! reservation PDU, not a general-purpose packet builder.

use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet as PnetPacket;

use crate::reservation::{CodecError, Reservation, Status, PDU_LEN};

/// An unparsed Ethernet frame as captured off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(pub Vec<u8>);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short to contain an Ethernet/IPv4/UDP header")]
    Truncated,
    #[error("frame is not IPv4")]
    NotIpv4,
    #[error("frame is not UDP")]
    NotUdp,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Parses the reservation PDU carried as the UDP payload of `frame`.
pub fn parse_reservation_frame(frame: &RawFrame) -> Result<(Status, Reservation), FrameError> {
    let (_, payload) = udp_payload(frame)?;
    let (status, reservation) = Reservation::decode(payload)?;
    Ok((status, reservation))
}

/// Returns the byte offset of the UDP payload and the payload slice itself.
fn udp_payload(frame: &RawFrame) -> Result<(usize, &[u8]), FrameError> {
    let eth = EthernetPacket::new(&frame.0).ok_or(FrameError::Truncated)?;
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return Err(FrameError::NotIpv4);
    }
    let eth_header_len = frame.0.len() - eth.payload().len();

    let ip = Ipv4Packet::new(eth.payload()).ok_or(FrameError::Truncated)?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return Err(FrameError::NotUdp);
    }
    let ip_header_len = ip.get_header_length() as usize * 4;

    let udp = UdpPacket::new(ip.payload()).ok_or(FrameError::Truncated)?;
    let udp_header_len = ip.payload().len() - udp.payload().len();

    let offset = eth_header_len + ip_header_len + udp_header_len;
    Ok((offset, &frame.0[offset..]))
}

/// Returns a copy of `frame` with its UDP payload replaced by `reservation`
/// encoded under `status`, leaving every Ethernet/IP/UDP header byte
/// untouched. Used to flood the delay-updated advertisement copy and to
/// re-advertise an unchanged stream.
pub fn with_reservation_payload(
    frame: &RawFrame,
    status: Status,
    reservation: &Reservation,
) -> Result<RawFrame, FrameError> {
    let (offset, payload) = udp_payload(frame)?;
    if payload.len() != PDU_LEN {
        return Err(FrameError::Codec(CodecError::MalformedPdu {
            expected: PDU_LEN,
            actual: payload.len(),
        }));
    }
    let mut bytes = frame.0.clone();
    bytes[offset..offset + PDU_LEN].copy_from_slice(&reservation.encode(status));
    Ok(RawFrame(bytes))
}
