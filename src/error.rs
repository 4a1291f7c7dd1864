//! Top-level error aggregation: one variant per subsystem boundary, so the
//! dispatcher's top-level event handler can log a single `ControllerError`
//! without matching every subsystem enum individually (SPEC_FULL.md §4.8).

use crate::admission::AdmissionError;
use crate::config::ConfigError;
use crate::frame::FrameError;
use crate::switch::ProgrammingError;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error(transparent)]
    Programming(#[from] ProgrammingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
