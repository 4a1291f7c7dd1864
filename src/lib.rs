//! Admission-control and reservation controller for real-time UDP streams
//! deployed across a single TSN-style Ethernet switch under strict-priority
//! scheduling.
//!
//! Module map, leaves first: [`units`] (ceiling-division helper),
//! [`reservation`] (wire codec and stream identity), [`delay`] (worst-case
//! queuing delay calculus), [`store`] (reservation state), [`admission`]
//! (the admission engine), [`switch`] (rate quantization and the CLI
//! side-channel), [`frame`] (Ethernet/IPv4/UDP framing), [`southbound`]
//! (control-channel event/command types), [`dispatcher`] (the event loop
//! tying everything together), [`config`] and [`error`] (the ambient
//! layers).

pub mod admission;
pub mod config;
pub mod delay;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod reservation;
pub mod southbound;
pub mod store;
pub mod switch;
pub mod units;

pub use admission::AdmissionError;
pub use config::{Config, ConfigError};
pub use delay::ClassDelayMap;
pub use dispatcher::Controller;
pub use error::ControllerError;
pub use reservation::{Reservation, Status, StreamKey};
