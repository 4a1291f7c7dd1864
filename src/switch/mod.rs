pub mod cli;
pub mod programmer;

pub use cli::{CliSession, CliTransport, ProgrammingError};
pub use programmer::{build_flow_rule, default_rule_command, quantize_burst_rate, FlowRule, SequenceCounter};
