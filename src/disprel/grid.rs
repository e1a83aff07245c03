//! Search grids over the dispersion coefficients.
//!
//! Coefficients 1..3 are searched as multiplicative scale factors on the
//! initial guess; coefficient 0 as an additive wavelength offset. Grid points
//! are visited in snake order so that consecutive candidates differ by a single
//! step on a single axis, which keeps the cross-correlation delay of one
//! candidate a good starting point for the next.

use crate::polynomial::DispersionPolynomial;

use super::SearchModel;

// ── Grid presets ────────────────────────────────────────────────────────────

/// Linear-term scale range and steps when the guess has a cubic term.
pub const CUBIC_REGIME_C1: SearchBound = SearchBound::new(0.98, 1.02, 21);
/// Linear-term scale range and steps for quadratic and linear guesses.
pub const WIDE_C1: SearchBound = SearchBound::new(0.95, 1.05, 29);
/// Quadratic-term scale range and steps.
pub const C2_GRID: SearchBound = SearchBound::new(0.7, 1.3, 13);
/// Cubic-term scale range and steps.
pub const C3_GRID: SearchBound = SearchBound::new(0.5, 1.5, 11);

// ── SearchBound ─────────────────────────────────────────────────────────────

/// Inclusive range `[min, max]` sampled at `steps` evenly spaced points.
///
/// A bound with a single step (or `max <= min`) is fixed at `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBound {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl SearchBound {
    pub const fn new(min: f64, max: f64, steps: usize) -> Self {
        Self { min, max, steps }
    }

    /// A single-point bound.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, 1)
    }

    pub fn is_fixed(&self) -> bool {
        self.steps <= 1 || self.max <= self.min
    }

    /// Number of grid points, at least 1.
    pub fn len(&self) -> usize {
        if self.is_fixed() {
            1
        } else {
            self.steps
        }
    }

    /// Spacing between grid points, 0 for a fixed bound.
    pub fn step(&self) -> f64 {
        if self.is_fixed() {
            0.0
        } else {
            (self.max - self.min) / (self.steps - 1) as f64
        }
    }

    /// Grid point `i`, `i` in `0..len()`.
    pub fn value(&self, i: usize) -> f64 {
        self.min + i as f64 * self.step()
    }

    /// Same step count over `[center - step, center + step]`. A fixed bound
    /// stays fixed at `center`.
    pub fn narrowed_around(&self, center: f64) -> Self {
        if self.is_fixed() {
            return Self::fixed(center);
        }
        let step = self.step();
        Self::new(center - step, center + step, self.steps)
    }
}

/// Initial scale bounds for coefficients 1..3.
///
/// The c1 range is tighter when the guess carries a cubic term. Axes above the
/// degree allowed by `model`, or whose guess coefficient is zero, are fixed at 1.
pub fn initial_scale_bounds(pm: &DispersionPolynomial, model: SearchModel) -> [SearchBound; 3] {
    let presets = [
        if pm.coeff(3) != 0.0 {
            CUBIC_REGIME_C1
        } else {
            WIDE_C1
        },
        C2_GRID,
        C3_GRID,
    ];
    let mut bounds = [SearchBound::fixed(1.0); 3];
    for (k, bound) in bounds.iter_mut().enumerate() {
        if k < model.scaled_axes() && pm.coeff(k + 1) != 0.0 {
            *bound = presets[k];
        }
    }
    bounds
}

/// Additive offset grid over `[lo, hi]`; a single point at `lo` when the range
/// is empty.
pub fn offset_bound(range: (f64, f64), steps: usize) -> SearchBound {
    let (lo, hi) = range;
    if hi > lo && steps > 1 {
        SearchBound::new(lo, hi, steps)
    } else {
        SearchBound::fixed(lo)
    }
}

// ── Snake walk ──────────────────────────────────────────────────────────────

/// Position and direction along one grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCursor {
    pub index: usize,
    pub len: usize,
    forward: bool,
}

impl AxisCursor {
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len,
            forward: true,
        }
    }

    /// Move one step in the current direction. At an end, reverse direction and
    /// report `false` without moving.
    fn advance(&mut self) -> bool {
        if self.forward && self.index + 1 < self.len {
            self.index += 1;
            true
        } else if !self.forward && self.index > 0 {
            self.index -= 1;
            true
        } else {
            self.forward = !self.forward;
            false
        }
    }
}

/// Boustrophedon walk over an `N`-dimensional grid, axis 0 fastest.
///
/// Yields every index tuple exactly once; consecutive tuples differ by one on
/// exactly one axis.
#[derive(Debug, Clone)]
pub struct SnakeWalk<const N: usize> {
    axes: [AxisCursor; N],
    started: bool,
    done: bool,
}

impl<const N: usize> SnakeWalk<N> {
    pub fn new(lens: [usize; N]) -> Self {
        Self {
            axes: lens.map(AxisCursor::new),
            started: false,
            done: lens.iter().any(|&l| l == 0),
        }
    }

    fn indices(&self) -> [usize; N] {
        self.axes.map(|a| a.index)
    }
}

impl<const N: usize> Iterator for SnakeWalk<N> {
    type Item = [usize; N];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices());
        }
        for axis in self.axes.iter_mut() {
            if axis.advance() {
                return Some(self.indices());
            }
        }
        self.done = true;
        None
    }
}

// ── Warm start ──────────────────────────────────────────────────────────────

/// Integer pixel delay carried from one candidate to the next.
///
/// Each candidate is pre-shifted by the delay the previous candidate ended up
/// at, so its own cross-correlation only needs to find the residual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmStart {
    pub delay: isize,
}

impl WarmStart {
    /// Warm start for the next candidate after this one was found at a
    /// further `found` samples. The total is clamped to `±limit`.
    pub fn advanced(self, found: isize, limit: usize) -> Self {
        let limit = limit as isize;
        Self {
            delay: (self.delay + found).clamp(-limit, limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_values_and_narrowing() {
        let b = SearchBound::new(0.98, 1.02, 21);
        assert_eq!(b.len(), 21);
        assert!((b.step() - 0.002).abs() < 1e-12);
        assert!((b.value(10) - 1.0).abs() < 1e-12);
        assert!((b.value(20) - 1.02).abs() < 1e-12);

        let narrow = b.narrowed_around(1.004);
        assert_eq!(narrow.steps, 21);
        assert!((narrow.min - 1.002).abs() < 1e-12);
        assert!((narrow.max - 1.006).abs() < 1e-12);

        let fixed = SearchBound::fixed(1.0);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed.value(0), 1.0);
        assert_eq!(fixed.narrowed_around(1.0), fixed);
    }

    #[test]
    fn test_offset_bound_empty_range_is_single_point() {
        assert_eq!(offset_bound((0.0, 0.0), 8), SearchBound::fixed(0.0));
        let b = offset_bound((-10.0, 10.0), 8);
        assert_eq!(b.len(), 8);
        assert_eq!(b.value(0), -10.0);
        assert!((b.value(7) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_initial_bounds_follow_regime_and_model() {
        let cubic = DispersionPolynomial::new(12000.0, 4.5, 2e-4, -3e-8);
        let b = initial_scale_bounds(&cubic, SearchModel::Cubic);
        assert_eq!(b, [CUBIC_REGIME_C1, C2_GRID, C3_GRID]);

        let b = initial_scale_bounds(&cubic, SearchModel::Linear);
        assert_eq!(b[0], CUBIC_REGIME_C1);
        assert!(b[1].is_fixed() && b[2].is_fixed());

        let b = initial_scale_bounds(&cubic, SearchModel::OffsetOnly);
        assert!(b.iter().all(|x| x.is_fixed() && x.value(0) == 1.0));

        let quad = DispersionPolynomial::new(12000.0, 4.5, 2e-4, 0.0);
        let b = initial_scale_bounds(&quad, SearchModel::Cubic);
        assert_eq!(b[0], WIDE_C1);
        assert_eq!(b[1], C2_GRID);
        assert!(b[2].is_fixed());

        let linear = DispersionPolynomial::new(12000.0, 4.5, 0.0, 0.0);
        let b = initial_scale_bounds(&linear, SearchModel::Cubic);
        assert_eq!(b[0], WIDE_C1);
        assert!(b[1].is_fixed() && b[2].is_fixed());
    }

    #[test]
    fn test_snake_walk_visits_all_with_unit_steps() {
        let walk: Vec<[usize; 3]> = SnakeWalk::new([4, 3, 2]).collect();
        assert_eq!(walk.len(), 24);
        let mut seen = walk.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 24);
        for pair in walk.windows(2) {
            let diff: usize = pair[0]
                .iter()
                .zip(&pair[1])
                .map(|(a, b)| a.abs_diff(*b))
                .sum();
            assert_eq!(diff, 1, "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert_eq!(walk[0], [0, 0, 0]);
        assert_eq!(walk[3], [3, 0, 0]);
        assert_eq!(walk[4], [3, 1, 0]);
    }

    #[test]
    fn test_snake_walk_degenerate_axes() {
        assert_eq!(SnakeWalk::new([1, 1]).count(), 1);
        assert_eq!(SnakeWalk::new([3, 0]).count(), 0);
    }

    #[test]
    fn test_warm_start_accumulates_and_clamps() {
        let w = WarmStart::default().advanced(5, 100).advanced(-2, 100);
        assert_eq!(w.delay, 3);
        assert_eq!(w.advanced(500, 100).delay, 100);
        assert_eq!(w.advanced(-500, 100).delay, -100);
    }
}
