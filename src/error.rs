//! Error taxonomy for wavelength calibration.
//!
//! Parameter errors are always caller-fixable and are raised before any search
//! work starts. Catalog and convergence errors are fatal to a calibration call
//! and never come with a partial result.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the calibration pipeline.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// A numeric parameter is out of its valid range (slit width, order, discard zones, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two signals that must have equal length do not.
    #[error("signal length mismatch: expected {expected} samples, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// A catalog file could not be read.
    #[error("failed to read line catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A catalog file line does not hold exactly two numeric columns.
    #[error("line catalog parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The catalog resolved to zero lines.
    #[error("line catalog is empty")]
    EmptyCatalog,

    /// No catalog line falls in the wavelength window covered by the detector.
    #[error("no catalog lines between {wave_min:.2} and {wave_max:.2} Angstrom")]
    NoLinesInRange { wave_min: f64, wave_max: f64 },

    /// No catalog line contributed to a synthesized model signal.
    #[error("no catalog line contributes to the model signal")]
    NoSignal,

    /// The dispersion search exhausted its passes without converging.
    #[error("dispersion search did not converge after {passes} passes")]
    Convergence { passes: usize },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CalibrationError>;

impl CalibrationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CalibrationError::InvalidParameter(msg.into())
    }
}
