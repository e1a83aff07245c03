//! # wavecal
//!
//! Wavelength calibration of near-infrared long-slit spectra.
//!
//! Given a 1-D signal extracted from an arc-lamp or sky frame and a catalog of
//! known emission lines, `wavecal` finds the cubic dispersion relation
//! `wavelength(pixel)` that best explains the observed lines, starting from a
//! physical-model guess.
//!
//! ## Example
//!
//! ```no_run
//! use wavecal::{compute_dispersion_relation, CalibrationConfig, DispersionPolynomial};
//!
//! // Slit-collapsed arc spectrum, one sample per detector column.
//! let raw_line: Vec<f64> = vec![0.0; 1024];
//!
//! // Physical-model guess for the dispersion relation (Angstrom).
//! let guess = DispersionPolynomial::new(11800.0, 3.1, 1.2e-4, -2.0e-8);
//!
//! let config = CalibrationConfig {
//!     catalog: "Xe+Ar".to_string(),
//!     slit_width_px: 2.5,
//!     ..Default::default()
//! };
//! let result = compute_dispersion_relation(&raw_line, &guess, &config).unwrap();
//! println!(
//!     "{} (xcorr {:.3}, rms {:.2} px over {} lines)",
//!     result.polynomial, result.cross_correlation, result.rms_residual, result.detected_lines
//! );
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Synthesis**: for a trial polynomial, every catalog line landing on the
//!    detector is rendered as a Gaussian of the slit width and the model is
//!    log-compressed
//! 2. **Correlation**: the model is cross-correlated with the observed signal,
//!    which also yields the integer pixel offset between the two
//! 3. **Grid search**: scale factors on the linear, quadratic and cubic terms
//!    are searched pass after pass on ever narrower grids, with a sub-pixel
//!    offset refinement of the best candidates
//! 4. **Validation**: each catalog line is located and centroided under the
//!    final polynomial, giving mean and RMS residuals in pixels
//!
//! Too few catalog lines in range demote the searched model degree instead of
//! failing; the result carries a flag when that happens.

/// Built-in line tables: OH airglow, Xenon and Argon
pub(crate) mod catalogs;
pub mod disprel;
pub mod error;
pub mod linecatalog;
pub mod polynomial;
pub mod spectrum;
pub mod synth;
pub mod xcorr;

pub use disprel::{
    compute_dispersion_relation, compute_dispersion_relation_from_image,
    compute_dispersion_relation_with_catalog, CalibrationConfig, CalibrationResult,
    ConvergenceCriteria, DispersionSearchEngine, DispersionSolution, LineMatch, LineMatchStats,
    PassSummary, SearchConfig, SearchModel, SearchOutcome, SearchProblem, SolutionRefiner,
};
pub use error::{CalibrationError, Result};
pub use linecatalog::{EmissionLine, LineCatalog, LineSource};
pub use polynomial::DispersionPolynomial;
pub use spectrum::SpectralImage;
pub use synth::{build_signal, ModelSignal, SignalSynthesizer};
pub use xcorr::{cross_correlate, Correlation};
