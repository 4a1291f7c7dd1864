//! Stream identity: the triple that two reservations must share to be
//! considered the same stream, independent of traffic shape or delay state.

use std::net::Ipv4Addr;

use super::pdu::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl StreamKey {
    pub fn new(src_ip: Ipv4Addr, src_port: u16, dst_port: u16) -> Self {
        StreamKey {
            src_ip,
            src_port,
            dst_port,
        }
    }
}

impl From<&Reservation> for StreamKey {
    fn from(r: &Reservation) -> Self {
        StreamKey::new(r.src_ip, r.src_port, r.dst_port)
    }
}
