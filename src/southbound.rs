//! Plain data types standing in for the OpenFlow 1.0 messages the dispatcher
//! reacts to and emits. No wire codec is implemented here: transporting
//! these to and from a real switch's control channel is out of scope (see
//! SPEC_FULL.md §1, §6).

use crate::frame::RawFrame;

/// An event arriving on the switch's control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchEvent {
    /// The initial handshake message; triggers flow-table reset and CLI
    /// session setup.
    Features,
    /// A frame punted to the controller because it matched the reservation
    /// punt rule, carrying the port it arrived on.
    PacketIn { in_port: u16, frame: RawFrame },
}

/// A command the dispatcher issues back to the switch's control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchCommand {
    /// Deletes every flow currently installed (`OFPFC_DELETE`, match-all).
    PurgeFlowTable,
    /// Installs the punt rule matching `eth_type=IPv4 ∧ ip_proto=UDP ∧
    /// udp_dst=1000`, with action "send to controller".
    InstallPuntRule,
    /// Floods `frame` out every port except `except_port`.
    Flood { frame: RawFrame, except_port: u16 },
    /// Unicasts `frame` out `out_port`.
    Unicast { frame: RawFrame, out_port: u16 },
}
