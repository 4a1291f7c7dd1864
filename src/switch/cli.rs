//! The CLI side-channel session: login/enable/config handshake and the QoS
//! flow-list commands issued against it. See SPEC_FULL.md §6.
//!
//! The reference target is a Telnet session; this module only depends on a
//! [`CliTransport`] so tests can substitute an in-memory transport instead of
//! opening a real socket.

use std::io;

use crate::reservation::Reservation;
use crate::switch::programmer::{build_flow_rule, default_rule_command, SequenceCounter};

/// Abstracts the line-oriented I/O a CLI session is driven over. A real
/// transport is a Telnet socket; a test transport is an in-memory buffer.
/// Reading replies back is a transport-specific quirk (the reference switch
/// needs three reads per command to drain its banner) and is not part of
/// this trait's contract beyond "consume whatever the switch sent back".
pub trait CliTransport {
    /// Blocks until the login prompt has been seen.
    fn wait_for_login_prompt(&mut self) -> io::Result<()>;
    /// Writes `command` terminated by CR LF and drains the reply.
    fn write_command(&mut self, command: &str) -> io::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProgrammingError {
    #[error("CLI transport error: {0}")]
    Io(#[from] io::Error),
}

/// Drives the QoS flow-list setup and per-stream rule commands over a
/// [`CliTransport`]. Owns the monotonically increasing rule sequence
/// counter; a session is connected at most once.
pub struct CliSession<T: CliTransport> {
    transport: T,
    username: String,
    qos_flow_list_name: String,
    connected: bool,
    sequence: SequenceCounter,
}

impl<T: CliTransport> CliSession<T> {
    pub fn new(transport: T, username: impl Into<String>, qos_flow_list_name: impl Into<String>) -> Self {
        CliSession {
            transport,
            username: username.into(),
            qos_flow_list_name: qos_flow_list_name.into(),
            connected: false,
            sequence: SequenceCounter::new(),
        }
    }

    /// Runs the full connect sequence of SPEC_FULL.md §6: login, enter
    /// configuration mode, commission the QoS flow list and apply it to
    /// VLAN 1, then install the default rule. A no-op if already connected.
    pub fn connect(&mut self) -> Result<(), ProgrammingError> {
        if self.connected {
            return Ok(());
        }

        self.transport.wait_for_login_prompt()?;
        self.transport.write_command(&self.username.clone())?;
        self.transport.write_command("enable")?;
        self.transport.write_command("config")?;
        self.transport
            .write_command(&format!("no ip qos-flow-list {}", self.qos_flow_list_name))?;
        self.transport
            .write_command(&format!("ip qos-flow-list {}", self.qos_flow_list_name))?;
        self.transport.write_command("exit")?;
        self.transport.write_command("interface vlan 1")?;
        self.transport
            .write_command(&format!("ip qos-flow-group {} in", self.qos_flow_list_name))?;
        self.transport.write_command("exit")?;
        self.transport
            .write_command(&format!("ip qos-flow-list {}", self.qos_flow_list_name))?;
        self.transport.write_command(&default_rule_command())?;

        self.connected = true;
        Ok(())
    }

    /// Issues the QoS flow-list entry for an admitted subscription, using
    /// the next sequence number.
    pub fn add_tsn_stream(&mut self, subscription: &Reservation) -> Result<(), ProgrammingError> {
        let rule = build_flow_rule(subscription, self.sequence.next());
        self.transport.write_command(&rule.to_command())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct RecordingTransport {
        commands: Vec<String>,
        login_prompt_waits: u32,
    }

    impl CliTransport for RecordingTransport {
        fn wait_for_login_prompt(&mut self) -> io::Result<()> {
            self.login_prompt_waits += 1;
            Ok(())
        }

        fn write_command(&mut self, command: &str) -> io::Result<()> {
            self.commands.push(command.to_string());
            Ok(())
        }
    }

    fn stream() -> Reservation {
        Reservation::new(
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
        )
    }

    #[test]
    fn connect_issues_the_exact_command_sequence() {
        let mut session = CliSession::new(RecordingTransport::default(), "operator", "TSN");
        session.connect().unwrap();

        assert_eq!(
            session.transport.commands,
            vec![
                "operator",
                "enable",
                "config",
                "no ip qos-flow-list TSN",
                "ip qos-flow-list TSN",
                "exit",
                "interface vlan 1",
                "ip qos-flow-group TSN in",
                "exit",
                "ip qos-flow-list TSN",
                "100000 qos ip any any action cos 0",
            ]
        );
        assert_eq!(session.transport.login_prompt_waits, 1);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut session = CliSession::new(RecordingTransport::default(), "operator", "TSN");
        session.connect().unwrap();
        let after_first = session.transport.commands.len();
        session.connect().unwrap();
        assert_eq!(session.transport.commands.len(), after_first);
    }

    #[test]
    fn add_tsn_stream_uses_increasing_sequence_numbers() {
        let mut session = CliSession::new(RecordingTransport::default(), "operator", "TSN");
        session.connect().unwrap();
        session.add_tsn_stream(&stream()).unwrap();
        session.add_tsn_stream(&stream()).unwrap();

        let issued: Vec<&String> = session.transport.commands.iter().skip(11).collect();
        assert!(issued[0].starts_with("1 qos udp"));
        assert!(issued[1].starts_with("2 qos udp"));
    }
}
