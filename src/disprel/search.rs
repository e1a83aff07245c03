//! Multi-pass, multi-resolution grid search for the dispersion relation.
//!
//! Each pass walks a grid of scale factors on coefficients 1..3 of the initial
//! guess (plus an additive offset on coefficient 0), synthesizes the catalog
//! through every candidate and keeps the candidate whose model correlates best
//! with the observed signal. Promising candidates get a sub-pixel offset
//! refinement. After each pass the grid is narrowed to one step either side of
//! the winner; the search stops when two consecutive winners agree.

use tracing::{debug, trace, warn};

use crate::error::{CalibrationError, Result};
use crate::linecatalog::LineCatalog;
use crate::polynomial::{central_pixel, DispersionPolynomial};
use crate::spectrum::zero_discard_zones;
use crate::synth::SignalSynthesizer;
use crate::xcorr::{cross_correlate, Correlation};

use super::grid::{initial_scale_bounds, offset_bound, SearchBound, SnakeWalk, WarmStart};
use super::{DispersionSolution, SearchConfig, SearchModel};

/// Inputs of a search: the observed signal and how to model it.
#[derive(Debug, Clone, Copy)]
pub struct SearchProblem<'a> {
    /// Pre-processed (log-compressed) observed signal, one sample per pixel.
    pub observed: &'a [f64],
    /// Catalog, sorted by wavelength.
    pub catalog: &'a LineCatalog,
    pub order: u32,
    pub slit_width_px: f64,
    /// Samples ignored at the blue end.
    pub discard_left: usize,
    /// Samples ignored at the red end.
    pub discard_right: usize,
}

/// Bookkeeping for one search pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSummary {
    pub pass: usize,
    /// Best score after this pass. Never lower than the previous pass.
    pub best_score: f64,
    /// This pass found a better candidate than the previous passes.
    pub improved: bool,
    /// Grid candidates that were synthesized and correlated.
    pub evaluated: usize,
    /// Grid candidates skipped as non-monotonic or without signal.
    pub skipped: usize,
}

/// Search result with its per-pass history.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub solution: DispersionSolution,
    pub history: Vec<PassSummary>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    poly: DispersionPolynomial,
    score: f64,
    scales: [f64; 3],
    /// Total constant-term translation relative to the rescaled guess.
    offset: f64,
}

#[derive(Debug, Clone, Copy)]
struct SearchPlan {
    model: SearchModel,
    demoted: bool,
    scales: [SearchBound; 3],
    offsets: SearchBound,
    /// Offset grid and sub-pixel step count.
    c0_steps: usize,
    sublim: f64,
}

/// Grid-search engine. Owns a copy of the observed signal with its discard
/// zones zeroed and one scratch buffer reused for every model.
#[derive(Debug)]
pub struct DispersionSearchEngine<'a> {
    catalog: &'a LineCatalog,
    order: u32,
    config: &'a SearchConfig,
    synth: SignalSynthesizer<'a>,
    observed: Vec<f64>,
    scratch: Vec<f64>,
    discard_left: usize,
    discard_right: usize,
}

impl<'a> DispersionSearchEngine<'a> {
    pub fn new(problem: SearchProblem<'a>, config: &'a SearchConfig) -> Result<Self> {
        let npix = problem.observed.len();
        if npix == 0 {
            return Err(CalibrationError::invalid("empty observed signal"));
        }
        if problem.discard_left + problem.discard_right >= npix {
            return Err(CalibrationError::invalid(format!(
                "discard zones {} + {} cover the whole {npix}-pixel signal",
                problem.discard_left, problem.discard_right
            )));
        }
        if config.max_passes == 0 || config.offset_steps == 0 || config.sparse_offset_steps == 0 {
            return Err(CalibrationError::invalid(
                "search needs at least one pass and one offset step",
            ));
        }
        if problem.catalog.is_empty() {
            return Err(CalibrationError::EmptyCatalog);
        }
        let synth = SignalSynthesizer::new(problem.catalog, problem.order, problem.slit_width_px)?;
        let mut observed = problem.observed.to_vec();
        zero_discard_zones(&mut observed, problem.discard_left, problem.discard_right);
        Ok(Self {
            catalog: problem.catalog,
            order: problem.order,
            config,
            synth,
            observed,
            scratch: vec![0.0; npix],
            discard_left: problem.discard_left,
            discard_right: problem.discard_right,
        })
    }

    pub fn npix(&self) -> usize {
        self.observed.len()
    }

    /// Run the search from the physical-model guess `pm`.
    ///
    /// Fails with [`CalibrationError::NoLinesInRange`] when no usable catalog line
    /// falls on the detector and with [`CalibrationError::Convergence`] when the
    /// passes run out.
    pub fn run(&mut self, pm: &DispersionPolynomial) -> Result<SearchOutcome> {
        let plan = self.plan(pm)?;
        let npix = self.npix();
        let center = central_pixel(npix);
        let warm_limit = npix / 2;

        let mut scales = plan.scales;
        let mut offsets = plan.offsets;
        let mut best: Option<Candidate> = None;
        let mut history = Vec::with_capacity(self.config.max_passes);

        for pass in 0..self.config.max_passes {
            let max_delay = if pass == 0 {
                self.config.wide_max_delay
            } else {
                self.config.fine_max_delay
            };
            let previous = best;
            let mut running = best.map_or(f64::NEG_INFINITY, |b| b.score);
            let mut warm = WarmStart::default();
            let (mut evaluated, mut skipped) = (0, 0);

            let lens = [scales[0].len(), scales[1].len(), scales[2].len(), offsets.len()];
            for [i1, i2, i3, i0] in SnakeWalk::new(lens) {
                let s = [scales[0].value(i1), scales[1].value(i2), scales[2].value(i3)];
                let offset = offsets.value(i0);
                let base = pm.rescaled_about(s, center).translated(offset);
                let trial = base.shifted_pixels(warm.delay as f64, center);

                let Some(corr) = self.evaluate(&trial, max_delay) else {
                    skipped += 1;
                    continue;
                };
                evaluated += 1;
                let total_delay = warm.delay + corr.delay;
                warm = warm.advanced(corr.delay, warm_limit);

                let mut poly = base.shifted_pixels(total_delay as f64, center);
                let mut score = corr.score;
                trace!(
                    "pass {} scales [{:.5}, {:.4}, {:.4}] offset {:.3}: score {:.5} at delay {}",
                    pass,
                    s[0],
                    s[1],
                    s[2],
                    offset,
                    score,
                    total_delay
                );

                if score > running * plan.sublim {
                    if let Some((refined, refined_score)) = self.refine_subpixel(&poly, plan.c0_steps)
                    {
                        if refined_score > score {
                            poly = refined;
                            score = refined_score;
                        }
                    }
                }

                if score > running {
                    running = score;
                    best = Some(Candidate {
                        poly,
                        score,
                        scales: s,
                        offset: poly.coeff(0) - pm.rescaled_about(s, center).coeff(0),
                    });
                }
            }

            let Some(current) = best else {
                warn!("No candidate produced a model signal on pass {}", pass);
                return Err(CalibrationError::Convergence { passes: pass + 1 });
            };
            let improved = previous.map_or(true, |p| current.score > p.score);
            history.push(PassSummary {
                pass,
                best_score: current.score,
                improved,
                evaluated,
                skipped,
            });
            debug!(
                "Pass {}: best {:.5} ({}), {} evaluated, {} skipped, scales [{:.5}, {:.4}, {:.4}]",
                pass,
                current.score,
                if improved { "improved" } else { "kept previous" },
                evaluated,
                skipped,
                current.scales[0],
                current.scales[1],
                current.scales[2]
            );

            // ── Narrow the grid around the winner ──
            for (bound, &scale) in scales.iter_mut().zip(&current.scales) {
                *bound = bound.narrowed_around(scale);
            }
            offsets = SearchBound::fixed(current.offset);

            if let Some(prev) = previous {
                if self.config.convergence.is_met(
                    &prev.poly,
                    prev.score,
                    &current.poly,
                    current.score,
                    npix,
                ) {
                    debug!("Converged after {} passes: {}", pass + 1, current.poly);
                    if current.score <= 0.0 {
                        warn!(
                            "Search converged with cross-correlation {:.4}: the observed signal \
                             does not match the catalog",
                            current.score
                        );
                    }
                    return Ok(SearchOutcome {
                        solution: DispersionSolution {
                            polynomial: current.poly,
                            cross_correlation: current.score,
                            passes: pass + 1,
                            model: plan.model,
                            demoted: plan.demoted,
                        },
                        history,
                    });
                }
            }
        }

        warn!(
            "Dispersion search did not converge in {} passes",
            self.config.max_passes
        );
        Err(CalibrationError::Convergence {
            passes: self.config.max_passes,
        })
    }

    /// Count usable lines, pick the model and build the first-pass grids.
    fn plan(&self, pm: &DispersionPolynomial) -> Result<SearchPlan> {
        let npix = self.npix();
        let wave_min = pm.wavelength(1.0);
        let wave_max = pm.wavelength(npix as f64);
        if !pm.is_monotonic(npix) {
            warn!("Initial guess {} is not monotonic over {} pixels", pm, npix);
        }
        let lines = self
            .catalog
            .count_lines_in_range(wave_min, wave_max, self.order)?;
        if lines == 0 {
            return Err(CalibrationError::NoLinesInRange { wave_min, wave_max });
        }

        let requested = SearchModel::from_guess(pm);
        let supported = SearchModel::from_line_count(lines);
        let model = requested.min(supported);
        let demoted = supported < requested;
        if demoted {
            warn!(
                "Only {} usable catalog lines in [{:.1}, {:.1}]: searching {:?} model instead of {:?}",
                lines, wave_min, wave_max, model, requested
            );
        }

        let c0_steps = if lines < self.config.sparse_line_count {
            self.config.sparse_offset_steps
        } else {
            self.config.offset_steps
        };
        let sublim = if lines > self.config.crowded_line_count {
            self.config.crowded_sublim
        } else {
            self.config.sublim
        };
        let plan = SearchPlan {
            model,
            demoted,
            scales: initial_scale_bounds(pm, model),
            offsets: offset_bound(self.config.offset_bound, c0_steps),
            c0_steps,
            sublim,
        };
        debug!(
            "Search plan: {} lines in range, {:?} model, grid {}x{}x{}x{}, sublim {}",
            lines,
            plan.model,
            plan.scales[0].len(),
            plan.scales[1].len(),
            plan.scales[2].len(),
            plan.offsets.len(),
            plan.sublim
        );
        Ok(plan)
    }

    /// Synthesize `poly` into the scratch buffer and correlate it against the
    /// observed signal. `None` for candidates that must be skipped.
    fn evaluate(&mut self, poly: &DispersionPolynomial, max_delay: usize) -> Option<Correlation> {
        if !poly.is_monotonic(self.observed.len()) {
            return None;
        }
        if self.synth.render_into(poly, &mut self.scratch) == 0 {
            return None;
        }
        zero_discard_zones(&mut self.scratch, self.discard_left, self.discard_right);
        cross_correlate(&self.scratch, &self.observed, max_delay).ok()
    }

    /// Try `steps` constant-term shifts spanning ±0.5 pixel around `poly`,
    /// keeping only zero-delay correlations. Returns the best one, if any.
    fn refine_subpixel(
        &mut self,
        poly: &DispersionPolynomial,
        steps: usize,
    ) -> Option<(DispersionPolynomial, f64)> {
        let center = central_pixel(self.npix());
        let max_delay = self.config.subpixel_max_delay;
        let mut best: Option<(DispersionPolynomial, f64)> = None;
        for j in 0..steps {
            let frac = -0.5 + (j as f64 + 0.5) / steps as f64;
            let trial = poly.shifted_pixels(frac, center);
            if let Some(corr) = self.evaluate(&trial, max_delay) {
                if corr.delay == 0 && best.map_or(true, |(_, s)| corr.score > s) {
                    best = Some((trial, corr.score));
                }
            }
        }
        best
    }
}
