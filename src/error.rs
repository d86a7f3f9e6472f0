//! Error types for the hypermodel library.

use thiserror::Error;

/// Precondition violations of the model API.
///
/// Every model function validates its inputs at the boundary and reports the
/// first violated precondition together with the offending value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("training frequency must be positive: {0}")]
    BadFrequency(u32),

    #[error("repetitions must be at least 1: {0}")]
    BadReps(u32),

    #[error("reps in reserve must be a finite non-negative number: {0}")]
    BadRir(f64),

    #[error("weight must be a finite non-negative number: {0}")]
    BadWeight(f64),

    #[error("gross stimulus must be a finite non-negative number: {0}")]
    BadStimulus(f64),

    #[error("recovery hours must be a finite non-negative number: {0}")]
    BadRecoveryHours(f64),

    #[error("recovery capacity multiplier must be finite and at least 0.01: {0}")]
    BadRecoveryCapacity(f64),

    #[error("invalid target rep range: min {min} is greater than max {max}")]
    BadRepRange { min: u32, max: u32 },

    #[error("search grid has no candidates")]
    EmptySearchGrid,

    #[error("program has no muscles to plan")]
    EmptyProgram,
}

/// Errors that can occur when building or loading a calibration.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("calibration file not found: {0}")]
    FileNotFound(String),

    #[error("cannot read calibration file: {0}")]
    CannotRead(String),

    #[error("invalid calibration format: {0}")]
    InvalidFormat(String),

    #[error("invalid calibration curve: {0}")]
    InvalidCurve(String),

    #[error("invalid calibration value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },
}
