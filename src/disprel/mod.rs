//! Dispersion-relation calibration by cross-correlation against a line catalog.
//!
//! The calibration runs in two stages:
//!
//! 1. **Search**: starting from a physical-model guess, a multi-pass grid
//!    search over scale factors of the polynomial coefficients synthesizes a
//!    model spectrum for each candidate and cross-correlates it with the
//!    observed signal. Each pass narrows the grid around the winner until the
//!    solution stops moving.
//! 2. **Refine**: the winning polynomial predicts where each catalog line
//!    should fall; the observed line is located and centroided, and the
//!    offsets are summarised as mean and RMS residuals.
//!
//! [`compute_dispersion_relation`] runs both stages on a raw extracted line.

pub mod grid;
pub mod refine;
pub mod search;

use tracing::{debug, info};

use crate::error::{CalibrationError, Result};
use crate::linecatalog::LineCatalog;
use crate::polynomial::DispersionPolynomial;
use crate::spectrum::{self, SpectralImage};

pub use refine::{LineMatch, LineMatchStats, SolutionRefiner};
pub use search::{DispersionSearchEngine, PassSummary, SearchOutcome, SearchProblem};

// ── Tuning constants ────────────────────────────────────────────────────────

/// Maximum number of search passes before giving up.
pub const MAX_PASSES: usize = 8;
/// Cross-correlation half-window on the first pass, in samples.
pub const WIDE_MAX_DELAY: usize = 50;
/// Cross-correlation half-window on later passes.
pub const FINE_MAX_DELAY: usize = 3;
/// Cross-correlation half-window for sub-pixel offset steps.
pub const SUBPIXEL_MAX_DELAY: usize = 2;
/// Offset grid steps (`C0_NSTEPS`).
pub const C0_NSTEPS: usize = 8;
/// Offset grid steps when few catalog lines are in range.
pub const SPARSE_C0_NSTEPS: usize = 16;
/// Below this many lines in range the sparse offset grid is used.
pub const SPARSE_LINE_COUNT: usize = 50;
/// Sub-pixel refinement acceptance ratio against the running best score.
pub const SUBLIM: f64 = 0.98;
/// Acceptance ratio for very crowded spectra.
pub const CROWDED_SUBLIM: f64 = 0.9;
/// Above this many lines in range the crowded acceptance ratio is used.
pub const CROWDED_LINE_COUNT: usize = 200;
/// Convergence: largest solution change, in pixels.
pub const MAX_PIXEL_DRIFT: f64 = 0.25;
/// Convergence: largest `npix * |score change|`.
pub const MAX_SCORE_CHANGE_PER_PIXEL: f64 = 1.0;
/// Convergence: largest relative change of the quadratic and cubic terms.
pub const MAX_RELATIVE_COEFF_CHANGE: f64 = 0.25;
/// Floor on the local dispersion (Angstrom/pixel) when converting a wavelength
/// change to pixels.
pub const MIN_DISPERSION: f64 = 1e-3;
/// Above this wavelength (Angstrom) an OH calibration is in the thermal regime.
pub const THERMAL_THRESHOLD: f64 = 20000.0;
/// Default width of each discard zone, in pixels.
pub const DEFAULT_DISCARD: usize = 10;

// ── Search model ────────────────────────────────────────────────────────────

/// Highest polynomial term the search is allowed to scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchModel {
    /// Only the constant term moves.
    OffsetOnly,
    Linear,
    Quadratic,
    Cubic,
}

impl SearchModel {
    /// Model supported by `lines` usable catalog lines.
    pub fn from_line_count(lines: usize) -> Self {
        match lines {
            0 | 1 => SearchModel::OffsetOnly,
            2 => SearchModel::Linear,
            3 => SearchModel::Quadratic,
            _ => SearchModel::Cubic,
        }
    }

    /// Model implied by the highest non-zero coefficient of `pm`.
    pub fn from_guess(pm: &DispersionPolynomial) -> Self {
        match pm.degree() {
            0 => SearchModel::OffsetOnly,
            1 => SearchModel::Linear,
            2 => SearchModel::Quadratic,
            _ => SearchModel::Cubic,
        }
    }

    /// Number of scale axes (coefficients 1..) this model may search.
    pub fn scaled_axes(self) -> usize {
        match self {
            SearchModel::OffsetOnly => 0,
            SearchModel::Linear => 1,
            SearchModel::Quadratic => 2,
            SearchModel::Cubic => 3,
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Thresholds of the pass-to-pass convergence test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    /// Largest wavelength change over the detector, in local pixels. Default 0.25.
    pub max_pixel_drift: f64,
    /// Largest `npix * |Δscore|`. Default 1.0.
    pub max_score_change_per_pixel: f64,
    /// Largest relative change of c2 and c3. Default 0.25.
    pub max_relative_coeff_change: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_pixel_drift: MAX_PIXEL_DRIFT,
            max_score_change_per_pixel: MAX_SCORE_CHANGE_PER_PIXEL,
            max_relative_coeff_change: MAX_RELATIVE_COEFF_CHANGE,
        }
    }
}

impl ConvergenceCriteria {
    /// `true` when the move from `(prev, prev_score)` to `(cur, cur_score)` is
    /// small enough to stop searching.
    pub fn is_met(
        &self,
        prev: &DispersionPolynomial,
        prev_score: f64,
        cur: &DispersionPolynomial,
        cur_score: f64,
        npix: usize,
    ) -> bool {
        let drift = cur.max_pixel_drift(prev, npix, MIN_DISPERSION);
        let score_change = npix as f64 * (cur_score - prev_score).abs();
        let coeffs_settled = [2, 3].iter().all(|&k| {
            relative_change(prev.coeff(k), cur.coeff(k)) < self.max_relative_coeff_change
        });
        drift < self.max_pixel_drift
            && score_change < self.max_score_change_per_pixel
            && coeffs_settled
    }
}

/// `|b - a| / |a|`, with 0/0 taken as no change.
fn relative_change(a: f64, b: f64) -> f64 {
    let delta = (b - a).abs();
    if delta == 0.0 {
        0.0
    } else {
        delta / a.abs()
    }
}

/// Parameters of the dispersion search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Maximum number of passes. Default 8.
    pub max_passes: usize,
    /// Cross-correlation half-window on pass 0. Default 50.
    pub wide_max_delay: usize,
    /// Cross-correlation half-window on later passes. Default 3.
    pub fine_max_delay: usize,
    /// Half-window for sub-pixel offset steps. Default 2.
    pub subpixel_max_delay: usize,
    /// Offset grid and sub-pixel step count. Default 8.
    pub offset_steps: usize,
    /// Step count used when fewer than `sparse_line_count` lines are in range.
    /// Default 16.
    pub sparse_offset_steps: usize,
    /// Default 50.
    pub sparse_line_count: usize,
    /// Additive wavelength offset range (Angstrom) for the constant term on
    /// the first pass. An empty range `(x, x)` searches a single offset.
    /// Default `(0, 0)`.
    pub offset_bound: (f64, f64),
    /// Sub-pixel refinement is attempted for scores above
    /// `running_best * sublim`. Default 0.98.
    pub sublim: f64,
    /// `sublim` when more than `crowded_line_count` lines are in range. Default 0.9.
    pub crowded_sublim: f64,
    /// Default 200.
    pub crowded_line_count: usize,
    pub convergence: ConvergenceCriteria,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_passes: MAX_PASSES,
            wide_max_delay: WIDE_MAX_DELAY,
            fine_max_delay: FINE_MAX_DELAY,
            subpixel_max_delay: SUBPIXEL_MAX_DELAY,
            offset_steps: C0_NSTEPS,
            sparse_offset_steps: SPARSE_C0_NSTEPS,
            sparse_line_count: SPARSE_LINE_COUNT,
            offset_bound: (0.0, 0.0),
            sublim: SUBLIM,
            crowded_sublim: CROWDED_SUBLIM,
            crowded_line_count: CROWDED_LINE_COUNT,
            convergence: ConvergenceCriteria::default(),
        }
    }
}

/// Parameters of a calibration call.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Catalog source: `"oh"`, `"Xe"`, `"Ar"`, `"Xe+Ar"`, or a file path.
    pub catalog: String,
    /// Spectral order, >= 1. Default 1.
    pub order: u32,
    /// Slit width in pixels, > 0. Default 2.
    pub slit_width_px: f64,
    /// Samples zeroed at the blue end. None = 10.
    pub discard_left: Option<usize>,
    /// Samples zeroed at the red end. None = 10, or half the detector for
    /// OH calibrations in the thermal regime.
    pub discard_right: Option<usize>,
    /// Image rows ignored at the bottom of the slit when collapsing.
    pub discard_rows_lo: usize,
    /// Image rows ignored at the top of the slit when collapsing.
    pub discard_rows_hi: usize,
    /// Force thermal-background removal.
    pub remove_thermal: bool,
    pub search: SearchConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            catalog: "oh".to_string(),
            order: 1,
            slit_width_px: 2.0,
            discard_left: None,
            discard_right: None,
            discard_rows_lo: 0,
            discard_rows_hi: 0,
            remove_thermal: false,
            search: SearchConfig::default(),
        }
    }
}

impl CalibrationConfig {
    fn validate(&self, raw_line: &[f64]) -> Result<()> {
        if self.order < 1 {
            return Err(CalibrationError::invalid(format!(
                "spectral order must be >= 1, got {}",
                self.order
            )));
        }
        if !(self.slit_width_px > 0.0) || !self.slit_width_px.is_finite() {
            return Err(CalibrationError::invalid(format!(
                "slit width must be positive, got {}",
                self.slit_width_px
            )));
        }
        if raw_line.is_empty() {
            return Err(CalibrationError::invalid("empty input signal"));
        }
        if let Some(i) = raw_line.iter().position(|v| !v.is_finite()) {
            return Err(CalibrationError::invalid(format!(
                "input sample {i} is not finite ({})",
                raw_line[i]
            )));
        }
        Ok(())
    }
}

// ── Results ─────────────────────────────────────────────────────────────────

/// Output of the dispersion search.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionSolution {
    pub polynomial: DispersionPolynomial,
    /// Cross-correlation score of `polynomial` against the observed signal.
    pub cross_correlation: f64,
    /// Passes run, including the converging one.
    pub passes: usize,
    /// Highest term the search scaled.
    pub model: SearchModel,
    /// The catalog had too few lines for the degree of the guess.
    pub demoted: bool,
}

/// Outcome of a successful calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    pub polynomial: DispersionPolynomial,
    pub cross_correlation: f64,
    /// Mean absolute line offset, in pixels.
    pub mean_residual: f64,
    /// Sample standard deviation of the signed line offsets, in pixels.
    pub rms_residual: f64,
    /// Positive-intensity catalog lines expected in the non-discarded range.
    pub catalog_lines_in_range: usize,
    /// Lines that were located in the signal.
    pub detected_lines: usize,
    pub model: SearchModel,
    pub demoted: bool,
    pub passes: usize,
    pub matches: Vec<LineMatch>,
}

impl CalibrationResult {
    fn combine(solution: DispersionSolution, stats: LineMatchStats) -> Self {
        Self {
            polynomial: solution.polynomial,
            cross_correlation: solution.cross_correlation,
            mean_residual: stats.mean_residual,
            rms_residual: stats.rms_residual,
            catalog_lines_in_range: stats.catalog_lines,
            detected_lines: stats.detected_lines,
            model: solution.model,
            demoted: solution.demoted,
            passes: solution.passes,
            matches: stats.matches,
        }
    }
}

// ── Orchestrator ────────────────────────────────────────────────────────────

/// Calibrate a raw 1-D line against the catalog named by `config.catalog`.
///
/// `raw_line` is the slit-collapsed spectrum before any pre-processing;
/// `initial_guess` is the physical-model dispersion relation.
pub fn compute_dispersion_relation(
    raw_line: &[f64],
    initial_guess: &DispersionPolynomial,
    config: &CalibrationConfig,
) -> Result<CalibrationResult> {
    config.validate(raw_line)?;
    let catalog = LineCatalog::load(&config.catalog)?;
    compute_dispersion_relation_with_catalog(raw_line, initial_guess, &catalog, config)
}

/// Threshold and collapse a 2-D frame, then calibrate the resulting line.
pub fn compute_dispersion_relation_from_image(
    image: &SpectralImage,
    initial_guess: &DispersionPolynomial,
    config: &CalibrationConfig,
) -> Result<CalibrationResult> {
    let mut image = image.clone();
    image.threshold_negative();
    let line = image.collapse_median(config.discard_rows_lo, config.discard_rows_hi)?;
    compute_dispersion_relation(&line, initial_guess, config)
}

/// Calibrate a raw 1-D line against an already loaded catalog.
pub fn compute_dispersion_relation_with_catalog(
    raw_line: &[f64],
    initial_guess: &DispersionPolynomial,
    catalog: &LineCatalog,
    config: &CalibrationConfig,
) -> Result<CalibrationResult> {
    config.validate(raw_line)?;
    if catalog.is_empty() {
        return Err(CalibrationError::EmptyCatalog);
    }
    let npix = raw_line.len();
    let wave_min = initial_guess.wavelength(1.0);
    let wave_max = initial_guess.wavelength(npix as f64);
    if catalog.count_lines_in_range(wave_min, wave_max, config.order)? == 0 {
        return Err(CalibrationError::NoLinesInRange { wave_min, wave_max });
    }

    // ── Discard zones and thermal regime ──
    let sky_thermal = catalog.is_sky_lines() && wave_max > THERMAL_THRESHOLD;
    let remove_thermal = config.remove_thermal || sky_thermal;
    let discard_left = config.discard_left.unwrap_or(DEFAULT_DISCARD);
    let discard_right = config
        .discard_right
        .unwrap_or(if sky_thermal { npix / 2 } else { DEFAULT_DISCARD });
    if discard_left + discard_right >= npix {
        return Err(CalibrationError::invalid(format!(
            "discard zones {discard_left} + {discard_right} cover the whole {npix}-pixel signal"
        )));
    }
    debug!(
        "Calibrating {} pixels, order {}, slit {:.2}px, discard {}/{}, thermal={}",
        npix, config.order, config.slit_width_px, discard_left, discard_right, remove_thermal
    );

    // ── Pre-process ──
    let mut signal = raw_line.to_vec();
    if remove_thermal {
        spectrum::subtract_thermal(&mut signal, spectrum::thermal_window(config.slit_width_px));
    }
    spectrum::clamp_negative(&mut signal);
    spectrum::zero_discard_zones(&mut signal, discard_left, discard_right);
    spectrum::log_compress(&mut signal);

    // ── Search ──
    let problem = SearchProblem {
        observed: &signal,
        catalog,
        order: config.order,
        slit_width_px: config.slit_width_px,
        discard_left,
        discard_right,
    };
    let outcome = DispersionSearchEngine::new(problem, &config.search)?.run(initial_guess)?;

    // ── Refine ──
    let refiner = SolutionRefiner::new(
        &signal,
        catalog,
        config.order,
        config.slit_width_px,
        discard_left,
        discard_right,
    )?;
    let stats = refiner.refine(&outcome.solution.polynomial)?;

    let result = CalibrationResult::combine(outcome.solution, stats);
    info!(
        "Dispersion relation: {} (xcorr {:.4}, {} passes, {:?}{})",
        result.polynomial,
        result.cross_correlation,
        result.passes,
        result.model,
        if result.demoted { ", demoted" } else { "" }
    );
    info!(
        "Line residuals: mean {:.3} px, rms {:.3} px, {} of {} catalog lines detected",
        result.mean_residual,
        result.rms_residual,
        result.detected_lines,
        result.catalog_lines_in_range
    );
    Ok(result)
}
