//! Translates an admitted subscription into the switch's QoS flow-list rule
//! text, quantizing the raw burst rate to a hardware-supported step. See
//! SPEC_FULL.md §4.5.

use std::net::Ipv4Addr;

use crate::reservation::Reservation;
use crate::units::ceil_div_u64;

/// The source and destination network mask applied to every QoS flow-list
/// entry. Must match exact addresses.
const NETWORK_MASK: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

/// The id of the catch-all default rule, chosen so it matches last (rules
/// are evaluated in ascending id order).
const DEFAULT_RULE_ID: u32 = 100_000;

/// Quantizes a raw bits/s burst rate to a step the switch can enforce:
/// 64 000-bit/s steps up to 960 000, a flat 1 000 000 immediately above
/// that, and 100 000-bit/s steps beyond.
pub fn quantize_burst_rate(burst_rate_bps: u64) -> u64 {
    if burst_rate_bps <= 960_000 {
        ceil_div_u64(burst_rate_bps, 64_000) * 64_000
    } else if burst_rate_bps <= 1_000_000 {
        1_000_000
    } else {
        ceil_div_u64(burst_rate_bps, 100_000) * 100_000
    }
}

/// One QoS flow-list entry, either the per-stream rule for an admitted
/// subscription or the catch-all default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    pub sequence_no: u32,
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub cos: u32,
    pub max_rate_bps: u64,
}

impl FlowRule {
    /// Renders the rule in the switch CLI's `qos udp` command syntax.
    pub fn to_command(&self) -> String {
        format!(
            "{} qos udp {} {} eq {} {} {} eq {} action cos {} max-rate {} max-rate-burst 32",
            self.sequence_no,
            self.src_ip,
            NETWORK_MASK,
            self.src_port,
            self.dst_ip,
            NETWORK_MASK,
            self.dst_port,
            self.cos,
            self.max_rate_bps,
        )
    }
}

/// The catch-all rule mapping unmatched IP traffic to class 0, installed
/// exactly once at startup before any stream rule.
pub fn default_rule_command() -> String {
    format!("{DEFAULT_RULE_ID} qos ip any any action cos 0")
}

/// Hands out sequence numbers for admitted-stream rules, starting at 1.
#[derive(Debug, Default)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    pub fn new() -> Self {
        SequenceCounter(0)
    }

    /// Returns the next sequence number, starting at 1.
    pub fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Builds the flow rule for an admitted subscription.
pub fn build_flow_rule(subscription: &Reservation, sequence_no: u32) -> FlowRule {
    FlowRule {
        sequence_no,
        src_ip: subscription.src_ip,
        src_port: subscription.src_port,
        dst_ip: subscription.dst_ip,
        dst_port: subscription.dst_port,
        cos: subscription.priority,
        max_rate_bps: quantize_burst_rate(subscription.burst_rate()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_matches_boundary_properties() {
        assert_eq!(quantize_burst_rate(64_000), 64_000);
        assert_eq!(quantize_burst_rate(64_001), 128_000);
        assert_eq!(quantize_burst_rate(960_001), 1_000_000);
        assert_eq!(quantize_burst_rate(1_000_001), 1_100_000);
    }

    #[test]
    fn sequence_counter_starts_at_one_and_increments() {
        let mut seq = SequenceCounter::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.next(), 3);
    }

    #[test]
    fn default_rule_uses_highest_id() {
        assert_eq!(default_rule_command(), "100000 qos ip any any action cos 0");
    }

    #[test]
    fn flow_rule_command_matches_scenario_one() {
        let r = Reservation::new(
            5000,
            7,
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(192, 168, 1, 20),
            1000,
            2000,
            100,
            1500,
            1500,
            1000,
            1,
            500,
        );
        let rule = build_flow_rule(&r, 1);
        assert_eq!(rule.max_rate_bps, 12_000_000);
        assert_eq!(
            rule.to_command(),
            "1 qos udp 192.168.1.10 0.0.0.0 eq 1000 192.168.1.20 0.0.0.0 eq 2000 action cos 7 max-rate 12000000 max-rate-burst 32"
        );
    }
}
