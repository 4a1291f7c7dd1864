//! The reservation PDU: a fixed-size big-endian wire record carried as the
//! UDP payload of advertisement, subscription and acknowledgement frames.
//!
//! ```text
//!                                     Bits
//!             |---------------------------------------------------------------|
//!     Octets  |   8   |   7   |   6   |   5   |   4   |   3   |   2   |   1   |
//!             |---------------------------------------------------------------|
//!     1       | Status (0 = ADVERTISEMENT, 1 = SUBSCRIPTION, 2 = ACK)         |
//!     2-5     | Required Latency (us)                                         |
//!     6-9     | Priority                                                      |
//!     10-13   | Source IP Address                                             |
//!     14-17   | Destination IP Address                                        |
//!     18-19   | Source Port                                                   |
//!     20-21   | Destination Port                                              |
//!     22-25   | Minimum Frame Size (bytes)                                    |
//!     26-29   | Maximum Frame Size (bytes)                                    |
//!     30-33   | Burst Size (bytes)                                            |
//!     34-37   | Burst Interval (us)                                           |
//!     38-41   | Accumulated Minimum Delay (us)                                |
//!     42-45   | Accumulated Maximum Delay (us)                                |
//!             |---------------------------------------------------------------|
//! ```
//!
//! See `DESIGN.md` for why this crate uses a 45-byte layout rather than the
//! "37-byte" figure that appears in the source specification's prose.

use std::net::Ipv4Addr;

use byteorder::{ByteOrder, NetworkEndian};

/// Total encoded length of a reservation PDU, in bytes.
pub const PDU_LEN: usize = 45;

/// The frame role carried in the PDU's first octet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Advertisement = 0,
    Subscription = 1,
    Acknowledgement = 2,
}

impl Status {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Status::Advertisement),
            1 => Some(Status::Subscription),
            2 => Some(Status::Acknowledgement),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed reservation PDU: expected {expected} bytes, got {actual}")]
    MalformedPdu { expected: usize, actual: usize },
    #[error("unrecognized reservation status byte: {0}")]
    BadStatus(u8),
}

/// The canonical record of a stream or a subscription.
///
/// Identity (`PartialEq`/`Hash` via [`crate::reservation::StreamKey`]) is the
/// triple `(src_ip, src_port, dst_port)`; every other field describes the
/// stream's traffic shape and accumulated delay and may change between
/// advertisements of the same stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub req_latency: u32,
    pub priority: u32,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub min_frame: u32,
    pub max_frame: u32,
    pub burst_size: u32,
    pub burst_interval: u32,
    pub acc_min_delay: u32,
    pub acc_max_delay: u32,
}

impl Reservation {
    /// Constructs a reservation from explicit field values (the keyword-bag
    /// constructor of the reference implementation).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        req_latency: u32,
        priority: u32,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
        min_frame: u32,
        max_frame: u32,
        burst_size: u32,
        burst_interval: u32,
        acc_min_delay: u32,
        acc_max_delay: u32,
    ) -> Self {
        Reservation {
            req_latency,
            priority,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            min_frame,
            max_frame,
            burst_size,
            burst_interval,
            acc_min_delay,
            acc_max_delay,
        }
    }

    /// `burst_rate = ceil(burst_size * 8 / (burst_interval * 1e-6))` bits/s.
    pub fn burst_rate(&self) -> u64 {
        let bits = self.burst_size as u64 * 8;
        // burst_interval is in microseconds; bits/s = bits * 1_000_000 / burst_interval_us
        crate::units::ceil_div_u64(bits * 1_000_000, self.burst_interval as u64)
    }

    /// A copy with a new `dst_ip`, used to turn an advertisement into a
    /// subscription directed at a specific listener, or vice versa.
    pub fn with_dst_ip(mut self, dst_ip: Ipv4Addr) -> Self {
        self.dst_ip = dst_ip;
        self
    }

    /// Hash over the traffic-shape and delay fields only (excludes the
    /// identity triple). Two advertisements for the same stream key with
    /// equal `stream_hash` are considered unchanged.
    pub fn stream_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.req_latency.hash(&mut hasher);
        self.priority.hash(&mut hasher);
        self.min_frame.hash(&mut hasher);
        self.max_frame.hash(&mut hasher);
        self.burst_size.hash(&mut hasher);
        self.burst_interval.hash(&mut hasher);
        self.acc_min_delay.hash(&mut hasher);
        self.acc_max_delay.hash(&mut hasher);
        hasher.finish()
    }

    /// Encodes `self` with the given frame role into a fixed-size PDU.
    pub fn encode(&self, status: Status) -> [u8; PDU_LEN] {
        let mut buf = [0u8; PDU_LEN];
        let mut pos = 0;

        buf[pos] = status as u8;
        pos += 1;

        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.req_latency);
        pos += 4;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.priority);
        pos += 4;
        buf[pos..pos + 4].copy_from_slice(&self.src_ip.octets());
        pos += 4;
        buf[pos..pos + 4].copy_from_slice(&self.dst_ip.octets());
        pos += 4;
        NetworkEndian::write_u16(&mut buf[pos..pos + 2], self.src_port);
        pos += 2;
        NetworkEndian::write_u16(&mut buf[pos..pos + 2], self.dst_port);
        pos += 2;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.min_frame);
        pos += 4;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.max_frame);
        pos += 4;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.burst_size);
        pos += 4;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.burst_interval);
        pos += 4;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.acc_min_delay);
        pos += 4;
        NetworkEndian::write_u32(&mut buf[pos..pos + 4], self.acc_max_delay);
        pos += 4;

        debug_assert_eq!(pos, PDU_LEN);
        buf
    }

    /// Decodes a fixed-size PDU, returning the frame role alongside the
    /// parsed reservation.
    pub fn decode(buffer: &[u8]) -> Result<(Status, Reservation), CodecError> {
        if buffer.len() != PDU_LEN {
            return Err(CodecError::MalformedPdu {
                expected: PDU_LEN,
                actual: buffer.len(),
            });
        }

        let status = Status::from_u8(buffer[0]).ok_or(CodecError::BadStatus(buffer[0]))?;

        let mut pos = 1;
        let req_latency = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let priority = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let src_ip = Ipv4Addr::new(buffer[pos], buffer[pos + 1], buffer[pos + 2], buffer[pos + 3]);
        pos += 4;
        let dst_ip = Ipv4Addr::new(buffer[pos], buffer[pos + 1], buffer[pos + 2], buffer[pos + 3]);
        pos += 4;
        let src_port = NetworkEndian::read_u16(&buffer[pos..pos + 2]);
        pos += 2;
        let dst_port = NetworkEndian::read_u16(&buffer[pos..pos + 2]);
        pos += 2;
        let min_frame = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let max_frame = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let burst_size = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let burst_interval = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let acc_min_delay = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;
        let acc_max_delay = NetworkEndian::read_u32(&buffer[pos..pos + 4]);
        pos += 4;

        debug_assert_eq!(pos, PDU_LEN);

        Ok((
            status,
            Reservation {
                req_latency,
                priority,
                src_ip,
                dst_ip,
                src_port,
                dst_port,
                min_frame,
                max_frame,
                burst_size,
                burst_interval,
                acc_min_delay,
                acc_max_delay,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reservation {
        Reservation::new(
            5000,
            7,
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(0, 0, 0, 0),
            1000,
            1000,
            100,
            1500,
            1500,
            1000,
            0,
            0,
        )
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let r = sample();
        for status in [Status::Advertisement, Status::Subscription, Status::Acknowledgement] {
            let bytes = r.encode(status);
            assert_eq!(bytes.len(), PDU_LEN);
            let (decoded_status, decoded) = Reservation::decode(&bytes).unwrap();
            assert_eq!(decoded_status, status);
            assert_eq!(decoded, r);
        }
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let bytes = [0u8; PDU_LEN - 1];
        assert_eq!(
            Reservation::decode(&bytes),
            Err(CodecError::MalformedPdu {
                expected: PDU_LEN,
                actual: PDU_LEN - 1
            })
        );
    }

    #[test]
    fn decode_rejects_bad_status() {
        let mut bytes = sample().encode(Status::Advertisement);
        bytes[0] = 3;
        assert_eq!(Reservation::decode(&bytes), Err(CodecError::BadStatus(3)));
    }

    #[test]
    fn burst_rate_matches_scenario_one() {
        let r = sample();
        // burst_size=1500 bytes, burst_interval=1000us -> 1500*8*1e6/1000 = 12_000_000 bit/s
        assert_eq!(r.burst_rate(), 12_000_000);
    }

    #[test]
    fn stream_hash_changes_when_shape_changes() {
        let a = sample();
        let mut b = sample();
        b.burst_interval = 500;
        assert_ne!(a.stream_hash(), b.stream_hash());

        let c = sample();
        assert_eq!(a.stream_hash(), c.stream_hash());
    }
}
