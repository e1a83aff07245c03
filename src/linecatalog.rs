//! Emission-line catalog used as the reference for wavelength calibration.
//!
//! `LineCatalog` keeps its lines sorted by ascending wavelength. Range queries
//! and the signal synthesizer rely on that ordering to walk the catalog with a
//! single forward cursor instead of rescanning it.
//!
//! Catalogs come from one of the built-in tables (`"oh"`, `"Xe"`, `"Ar"`), the
//! merged lamp table `"Xe+Ar"`, or a two-column ASCII file:
//!
//! ```text
//! # wavelength(A)  intensity
//! 12112.326        200
//! 12139.738        130   # blended
//! ```

use std::fmt;
use std::path::Path;

use crate::catalogs;
use crate::error::{CalibrationError, Result};

/// Origin of an emission line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineSource {
    /// Atmospheric OH airglow.
    Oh,
    /// Xenon arc lamp.
    Xenon,
    /// Argon arc lamp.
    Argon,
    /// Loaded from a user-supplied file.
    External,
}

impl LineSource {
    /// Two-character tag: `"oh"`, `"Xe"`, `"Ar"` or `"EF"`.
    pub fn tag(&self) -> &'static str {
        match self {
            LineSource::Oh => "oh",
            LineSource::Xenon => "Xe",
            LineSource::Argon => "Ar",
            LineSource::External => "EF",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "oh" => Some(LineSource::Oh),
            "Xe" => Some(LineSource::Xenon),
            "Ar" => Some(LineSource::Argon),
            "EF" => Some(LineSource::External),
            _ => None,
        }
    }
}

impl fmt::Display for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single catalogued emission line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionLine {
    /// Wavelength in Angstrom.
    pub wavelength: f64,
    /// Relative intensity, non-negative.
    pub intensity: f64,
    pub source: LineSource,
}

/// Wavelength-sorted list of emission lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineCatalog {
    lines: Vec<EmissionLine>,
}

impl LineCatalog {
    /// Build a catalog from owned lines, sorting them by wavelength.
    pub fn from_lines(lines: Vec<EmissionLine>) -> Self {
        let mut catalog = Self { lines };
        catalog.sort();
        catalog
    }

    /// One of the built-in tables. `External` has no built-in table.
    pub fn builtin(source: LineSource) -> Option<Self> {
        let table = match source {
            LineSource::Oh => catalogs::oh::LINES,
            LineSource::Xenon => catalogs::xenon::LINES,
            LineSource::Argon => catalogs::argon::LINES,
            LineSource::External => return None,
        };
        let lines = table
            .iter()
            .map(|&(wavelength, intensity)| EmissionLine {
                wavelength,
                intensity,
                source,
            })
            .collect();
        Some(Self::from_lines(lines))
    }

    /// Resolve a catalog source: `"oh"`, `"Xe"`, `"Ar"`, `"Xe+Ar"`, or a file path.
    ///
    /// The result is sorted. A source resolving to zero lines fails with
    /// [`CalibrationError::EmptyCatalog`].
    pub fn load(source: &str) -> Result<Self> {
        let catalog = match source {
            "Xe+Ar" => {
                let xe = Self::builtin(LineSource::Xenon).unwrap_or_default();
                let ar = Self::builtin(LineSource::Argon).unwrap_or_default();
                let mut merged = Self::merge(&xe, &ar);
                merged.sort();
                merged
            }
            tag => match LineSource::from_tag(tag).and_then(Self::builtin) {
                Some(catalog) => catalog,
                None => Self::load_file(tag)?,
            },
        };
        if catalog.is_empty() {
            return Err(CalibrationError::EmptyCatalog);
        }
        Ok(catalog)
    }

    /// Load a two-column ASCII catalog file. Lines are tagged [`LineSource::External`].
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text)
    }

    /// Parse two-column ASCII catalog text.
    ///
    /// Blank lines and `#` comments are ignored; any other line must hold
    /// exactly two numbers (wavelength, intensity).
    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(CalibrationError::Parse {
                    line: idx + 1,
                    message: format!("expected 2 columns, found {}", fields.len()),
                });
            }
            let parse = |s: &str| -> Result<f64> {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| CalibrationError::Parse {
                        line: idx + 1,
                        message: format!("`{s}` is not a number"),
                    })
            };
            lines.push(EmissionLine {
                wavelength: parse(fields[0])?,
                intensity: parse(fields[1])?,
                source: LineSource::External,
            });
        }
        Ok(Self::from_lines(lines))
    }

    /// Lines from the given source, in catalog order. May be empty.
    pub fn select(&self, source: LineSource) -> Self {
        Self {
            lines: self
                .lines
                .iter()
                .filter(|l| l.source == source)
                .copied()
                .collect(),
        }
    }

    /// Concatenate two catalogs. The result is *not* re-sorted; call
    /// [`LineCatalog::sort`] before using it for range queries.
    pub fn merge(a: &Self, b: &Self) -> Self {
        let mut lines = Vec::with_capacity(a.len() + b.len());
        lines.extend_from_slice(&a.lines);
        lines.extend_from_slice(&b.lines);
        Self { lines }
    }

    /// Re-establish ascending wavelength order.
    pub fn sort(&mut self) {
        self.lines
            .sort_by(|a, b| a.wavelength.total_cmp(&b.wavelength));
    }

    pub fn is_sorted(&self) -> bool {
        self.lines
            .windows(2)
            .all(|w| w[0].wavelength <= w[1].wavelength)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[EmissionLine] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EmissionLine> {
        self.lines.iter()
    }

    /// `true` when every line is an OH sky line.
    pub fn is_sky_lines(&self) -> bool {
        !self.is_empty() && self.lines.iter().all(|l| l.source == LineSource::Oh)
    }

    /// Lines with `wavelength * order` in `[wave_min, wave_max]`, as a sub-slice.
    pub fn lines_in_range(&self, wave_min: f64, wave_max: f64, order: u32) -> &[EmissionLine] {
        let order = order.max(1) as f64;
        let start = self
            .lines
            .partition_point(|l| l.wavelength * order < wave_min);
        let end = self
            .lines
            .partition_point(|l| l.wavelength * order <= wave_max)
            .max(start);
        &self.lines[start..end]
    }

    /// Number of lines with positive intensity and `wavelength * order` in
    /// `[wave_min, wave_max]`.
    ///
    /// Both endpoints are inclusive: a line exactly at `wave_max` is counted.
    pub fn count_lines_in_range(&self, wave_min: f64, wave_max: f64, order: u32) -> Result<usize> {
        Ok(self
            .scan_range(wave_min, wave_max, order)?
            .filter(|l| l.intensity > 0.0)
            .count())
    }

    /// Same as [`count_lines_in_range`](Self::count_lines_in_range) without the
    /// intensity filter.
    pub fn count_all_lines_in_range(
        &self,
        wave_min: f64,
        wave_max: f64,
        order: u32,
    ) -> Result<usize> {
        Ok(self.scan_range(wave_min, wave_max, order)?.count())
    }

    /// Brightest intensity among lines in range.
    pub fn max_intensity_in_range(&self, wave_min: f64, wave_max: f64, order: u32) -> Option<f64> {
        self.lines_in_range(wave_min, wave_max, order)
            .iter()
            .map(|l| l.intensity)
            .reduce(f64::max)
    }

    /// Linear scan over the sorted lines, stopping at the first line past `wave_max`.
    fn scan_range(
        &self,
        wave_min: f64,
        wave_max: f64,
        order: u32,
    ) -> Result<impl Iterator<Item = &EmissionLine>> {
        if order < 1 {
            return Err(CalibrationError::invalid(format!(
                "spectral order must be >= 1, got {order}"
            )));
        }
        let order = order as f64;
        Ok(self
            .lines
            .iter()
            .skip_while(move |l| l.wavelength * order < wave_min)
            .take_while(move |l| l.wavelength * order <= wave_max))
    }
}

impl<'a> IntoIterator for &'a LineCatalog {
    type Item = &'a EmissionLine;
    type IntoIter = std::slice::Iter<'a, EmissionLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn line(wavelength: f64, intensity: f64) -> EmissionLine {
        EmissionLine {
            wavelength,
            intensity,
            source: LineSource::External,
        }
    }

    #[test]
    fn test_range_counts_use_closed_interval() {
        let catalog = LineCatalog::from_lines(vec![
            line(100.0, 1.0),
            line(200.0, 1.0),
            line(300.0, 1.0),
            line(400.0, 1.0),
        ]);
        assert_eq!(catalog.count_lines_in_range(150.0, 350.0, 1).unwrap(), 2);
        assert_eq!(catalog.count_all_lines_in_range(100.0, 400.0, 1).unwrap(), 4);
        // A line sitting exactly on the upper endpoint is counted.
        assert_eq!(catalog.count_lines_in_range(200.0, 400.0, 1).unwrap(), 3);
        assert_eq!(catalog.count_lines_in_range(400.0, 400.0, 1).unwrap(), 1);
        assert_eq!(catalog.lines_in_range(100.0, 400.0, 1).len(), 4);
        assert_eq!(catalog.lines_in_range(150.0, 350.0, 1).len(), 2);
    }

    #[test]
    fn test_range_counts_respect_order_and_intensity() {
        let catalog = LineCatalog::from_lines(vec![
            line(100.0, 1.0),
            line(200.0, 0.0),
            line(300.0, 2.0),
        ]);
        // Second order: effective wavelengths 200, 400, 600.
        assert_eq!(catalog.count_lines_in_range(150.0, 450.0, 2).unwrap(), 1);
        assert_eq!(catalog.count_all_lines_in_range(150.0, 450.0, 2).unwrap(), 2);
        assert!(catalog.count_lines_in_range(0.0, 1000.0, 0).is_err());
        assert_eq!(catalog.max_intensity_in_range(0.0, 1000.0, 1), Some(2.0));
    }

    #[test]
    fn test_empty_catalog_counts_zero() {
        let catalog = LineCatalog::default();
        assert_eq!(catalog.count_lines_in_range(1.0, 1e6, 1).unwrap(), 0);
        assert!(catalog.lines_in_range(1.0, 1e6, 1).is_empty());
    }

    #[test]
    fn test_builtin_tables_are_sorted_and_tagged() {
        for source in [LineSource::Oh, LineSource::Xenon, LineSource::Argon] {
            let catalog = LineCatalog::load(source.tag()).unwrap();
            assert!(!catalog.is_empty());
            assert!(catalog.is_sorted());
            assert!(catalog.iter().all(|l| l.source == source));
        }
        assert!(LineCatalog::builtin(LineSource::External).is_none());
        assert!(LineCatalog::load("oh").unwrap().is_sky_lines());
    }

    #[test]
    fn test_merged_lamp_catalog_is_sorted() {
        let xe = LineCatalog::load("Xe").unwrap();
        let ar = LineCatalog::load("Ar").unwrap();
        let merged = LineCatalog::load("Xe+Ar").unwrap();
        assert_eq!(merged.len(), xe.len() + ar.len());
        assert!(merged.is_sorted());
        assert_eq!(merged.select(LineSource::Argon), ar);
        assert_eq!(merged.select(LineSource::Xenon), xe);
        assert!(merged.select(LineSource::Oh).is_empty());
    }

    #[test]
    fn test_merge_then_sort_restores_order() {
        let a = LineCatalog::from_lines(vec![line(300.0, 1.0), line(500.0, 1.0)]);
        let b = LineCatalog::from_lines(vec![line(100.0, 1.0), line(400.0, 1.0)]);
        let mut merged = LineCatalog::merge(&a, &b);
        assert_eq!(merged.len(), 4);
        assert!(!merged.is_sorted());
        merged.sort();
        assert!(merged.is_sorted());
        let waves: Vec<f64> = merged.iter().map(|l| l.wavelength).collect();
        assert_eq!(waves, vec![100.0, 300.0, 400.0, 500.0]);
    }

    #[test]
    fn test_parse_text_skips_comments_and_blanks() {
        let text = "# header\n\n 12000.5  10\n11000 5 # trailing comment\n   \n";
        let catalog = LineCatalog::from_text(text).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lines()[0].wavelength, 11000.0);
        assert_eq!(catalog.lines()[1].intensity, 10.0);
        assert!(catalog.iter().all(|l| l.source == LineSource::External));
    }

    #[test]
    fn test_parse_text_rejects_malformed_lines() {
        match LineCatalog::from_text("100 1\n200 1 3\n") {
            Err(CalibrationError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
        match LineCatalog::from_text("100 abc\n") {
            Err(CalibrationError::Parse { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_file_and_empty_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# lamp").unwrap();
        writeln!(file, "15000.0 3").unwrap();
        writeln!(file, "14000.0 1").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let catalog = LineCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.is_sorted());

        let empty = tempfile::NamedTempFile::new().unwrap();
        let path = empty.path().to_str().unwrap().to_string();
        assert!(matches!(
            LineCatalog::load(&path),
            Err(CalibrationError::EmptyCatalog)
        ));

        assert!(matches!(
            LineCatalog::load("/nonexistent/catalog.txt"),
            Err(CalibrationError::Io { .. })
        ));
    }
}
