//! Public histogram type.
//!
//! Bin edges are fixed at construction. Every operation that changes the
//! binning (`rebin`, `rebin_to`) returns a new histogram instead.

use dj_core::{BinnedDistribution, Error, Result};
use serde::{Deserialize, Serialize};

use crate::filler::find_bin;

/// A 1D histogram with variable-width bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramJson")]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    bin_edges: Vec<f64>,
    bin_content: Vec<f64>,
    sumw2: Vec<f64>,
    /// Total number of fill calls (or the stored entry count).
    pub entries: f64,
    /// Sum of weights below the first edge.
    pub underflow: f64,
    /// Sum of weights at or above the last edge.
    pub overflow: f64,
}

/// Serialized form; `sumw2` and `entries` are optional on input.
#[derive(Deserialize)]
struct HistogramJson {
    name: String,
    #[serde(default)]
    title: String,
    bin_edges: Vec<f64>,
    bin_content: Vec<f64>,
    #[serde(default)]
    sumw2: Option<Vec<f64>>,
    #[serde(default)]
    entries: Option<f64>,
    #[serde(default)]
    underflow: f64,
    #[serde(default)]
    overflow: f64,
}

impl TryFrom<HistogramJson> for Histogram {
    type Error = Error;

    fn try_from(raw: HistogramJson) -> Result<Self> {
        let mut h = Histogram::from_parts(raw.name, raw.bin_edges, raw.bin_content, raw.sumw2)?;
        h.title = raw.title;
        if let Some(entries) = raw.entries {
            h.entries = entries;
        }
        h.underflow = raw.underflow;
        h.overflow = raw.overflow;
        Ok(h)
    }
}

/// Outcome of comparing one bin's error with `sqrt(content)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoissonCheck {
    /// Error equals `sqrt(content)`.
    Ok,
    /// Bin content is zero.
    Empty,
    /// Error differs from the Poisson expectation.
    Mismatch {
        /// Stored error.
        error: f64,
        /// `sqrt(content)`.
        expected: f64,
    },
}

pub(crate) fn validate_edges(name: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::Validation(format!(
            "histogram '{name}' needs at least 2 bin edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(Error::Validation(format!("histogram '{name}' has non-finite bin edges")));
    }
    if let Some(i) = edges.windows(2).position(|w| w[1] <= w[0]) {
        return Err(Error::Validation(format!(
            "histogram '{name}' bin edges must be strictly increasing (edge {} = {} >= edge {} = {})",
            i,
            edges[i],
            i + 1,
            edges[i + 1]
        )));
    }
    Ok(())
}

impl BinnedDistribution for Histogram {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    fn bin_content(&self) -> &[f64] {
        &self.bin_content
    }

    fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }
}

impl Histogram {
    /// Create an empty histogram with the given bin edges.
    pub fn new(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        validate_edges(&name, &bin_edges)?;
        let n = bin_edges.len() - 1;
        Ok(Self {
            name,
            title: String::new(),
            bin_edges,
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            entries: 0.0,
            underflow: 0.0,
            overflow: 0.0,
        })
    }

    /// Build a histogram from stored arrays.
    ///
    /// When `sumw2` is `None` the contents are taken as unweighted counts
    /// (`sumw2 = max(content, 0)`).
    pub fn from_parts(
        name: impl Into<String>,
        bin_edges: Vec<f64>,
        bin_content: Vec<f64>,
        sumw2: Option<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        validate_edges(&name, &bin_edges)?;
        let n = bin_edges.len() - 1;
        if bin_content.len() != n {
            return Err(Error::Validation(format!(
                "histogram '{name}': {} bin contents for {n} bins",
                bin_content.len()
            )));
        }
        let sumw2 = match sumw2 {
            Some(s) if s.len() != n => {
                return Err(Error::Validation(format!(
                    "histogram '{name}': {} sumw2 values for {n} bins",
                    s.len()
                )));
            }
            Some(s) => s,
            None => bin_content.iter().map(|&c| c.max(0.0)).collect(),
        };
        let entries = bin_content.iter().sum();
        Ok(Self {
            name,
            title: String::new(),
            bin_edges,
            bin_content,
            sumw2,
            entries,
            underflow: 0.0,
            overflow: 0.0,
        })
    }

    /// Empty histogram sharing this histogram's bin edges.
    pub fn empty_like(&self, name: impl Into<String>) -> Self {
        let n = self.n_bins();
        Self {
            name: name.into(),
            title: String::new(),
            bin_edges: self.bin_edges.clone(),
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            entries: 0.0,
            underflow: 0.0,
            overflow: 0.0,
        }
    }

    /// Set the title (builder style).
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.bin_edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.bin_edges[self.bin_edges.len() - 1]
    }

    /// Bin index containing `x`, or `None` for under/overflow and NaN.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        find_bin(&self.bin_edges, x)
    }

    /// Fill `x` with unit weight. Returns the bin that received the entry.
    pub fn fill(&mut self, x: f64) -> Option<usize> {
        self.fill_weighted(x, 1.0)
    }

    /// Fill `x` with weight `w`.
    pub fn fill_weighted(&mut self, x: f64, w: f64) -> Option<usize> {
        self.entries += 1.0;
        match self.find_bin(x) {
            Some(b) => {
                self.bin_content[b] += w;
                self.sumw2[b] += w * w;
                Some(b)
            }
            None => {
                if x < self.x_min() {
                    self.underflow += w;
                } else if x >= self.x_max() {
                    self.overflow += w;
                }
                None
            }
        }
    }

    /// Overwrite the content of bin `i`.
    pub fn set_bin_content(&mut self, i: usize, content: f64) {
        self.bin_content[i] = content;
    }

    /// Overwrite the error of bin `i`.
    pub fn set_bin_error(&mut self, i: usize, error: f64) {
        self.sumw2[i] = error * error;
    }

    /// Sum of contents over the inclusive bin range `[first, last]`.
    ///
    /// `last` is clamped to the final bin; an empty range gives 0.
    pub fn integral_range(&self, first: usize, last: usize) -> f64 {
        let n = self.n_bins();
        if n == 0 || first >= n {
            return 0.0;
        }
        let last = last.min(n - 1);
        if last < first {
            return 0.0;
        }
        self.bin_content[first..=last].iter().sum()
    }

    /// Largest bin content.
    pub fn maximum(&self) -> f64 {
        self.bin_content.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Multiply contents by `factor` (errors scale accordingly).
    pub fn scale(&mut self, factor: f64) {
        let f2 = factor * factor;
        for (c, s) in self.bin_content.iter_mut().zip(self.sumw2.iter_mut()) {
            *c *= factor;
            *s *= f2;
        }
        self.underflow *= factor;
        self.overflow *= factor;
    }

    /// Multiply by `factor` and divide every bin by its width.
    pub fn scale_by_width(&mut self, factor: f64) {
        for i in 0..self.n_bins() {
            let f = factor / self.bin_width(i);
            self.bin_content[i] *= f;
            self.sumw2[i] *= f * f;
        }
    }

    /// `self += coefficient * other`. Both must share the same binning.
    pub fn add(&mut self, other: &Histogram, coefficient: f64) -> Result<()> {
        self.check_same_binning(other)?;
        let c2 = coefficient * coefficient;
        for i in 0..self.n_bins() {
            self.bin_content[i] += coefficient * other.bin_content[i];
            self.sumw2[i] += c2 * other.sumw2[i];
        }
        self.underflow += coefficient * other.underflow;
        self.overflow += coefficient * other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Sum a list of histograms into a new one named `name`.
    pub fn merge(name: impl Into<String>, hists: &[Histogram]) -> Result<Histogram> {
        let name = name.into();
        let Some(first) = hists.first() else {
            return Err(Error::Validation(format!("cannot merge zero histograms into '{name}'")));
        };
        let mut out = first.clone();
        out.name = name;
        for h in &hists[1..] {
            out.add(h, 1.0)?;
        }
        Ok(out)
    }

    /// Bin-wise `self / other` assuming uncorrelated inputs.
    ///
    /// Bins with a zero denominator get content 0 and error 0.
    pub fn divide(&mut self, other: &Histogram) -> Result<()> {
        self.check_same_binning(other)?;
        for i in 0..self.n_bins() {
            let a = self.bin_content[i];
            let b = other.bin_content[i];
            if b == 0.0 {
                self.bin_content[i] = 0.0;
                self.sumw2[i] = 0.0;
                continue;
            }
            let b2 = b * b;
            self.sumw2[i] = (self.sumw2[i] * b2 + other.sumw2[i] * a * a) / (b2 * b2);
            self.bin_content[i] = a / b;
        }
        Ok(())
    }

    /// Merge groups of `factor` consecutive bins.
    pub fn rebin(&self, factor: usize) -> Result<Histogram> {
        let n = self.n_bins();
        if factor == 0 || n % factor != 0 {
            return Err(Error::Validation(format!(
                "histogram '{}': rebin factor {factor} does not divide {n} bins",
                self.name
            )));
        }
        let edges: Vec<f64> = self.bin_edges.iter().step_by(factor).copied().collect();
        self.rebin_to(&edges)
    }

    /// Merge bins onto `edges`, which must be a subset of the current edges
    /// spanning the same range.
    pub fn rebin_to(&self, edges: &[f64]) -> Result<Histogram> {
        validate_edges(&self.name, edges)?;
        if edges[0] != self.x_min() || edges[edges.len() - 1] != self.x_max() {
            return Err(Error::Validation(format!(
                "histogram '{}': new edges [{}, {}] must span [{}, {}]",
                self.name,
                edges[0],
                edges[edges.len() - 1],
                self.x_min(),
                self.x_max()
            )));
        }

        let mut out = Histogram::new(self.name.clone(), edges.to_vec())?;
        out.title = self.title.clone();
        let mut target = 0usize;
        for i in 0..self.n_bins() {
            let lo = self.bin_edges[i];
            while lo >= edges[target + 1] {
                target += 1;
            }
            if self.bin_edges[i + 1] > edges[target + 1] {
                return Err(Error::Validation(format!(
                    "histogram '{}': edge {} is not an existing bin edge",
                    self.name,
                    edges[target + 1]
                )));
            }
            out.bin_content[target] += self.bin_content[i];
            out.sumw2[target] += self.sumw2[i];
        }
        out.entries = self.entries;
        out.underflow = self.underflow;
        out.overflow = self.overflow;
        Ok(out)
    }

    /// Copy with every bin whose centre lies outside `[lo, hi)` zeroed.
    pub fn with_range(&self, lo: f64, hi: f64) -> Histogram {
        let mut out = self.clone();
        for i in 0..out.n_bins() {
            let c = out.bin_center(i);
            if c < lo || c >= hi {
                out.bin_content[i] = 0.0;
                out.sumw2[i] = 0.0;
            }
        }
        out
    }

    /// Histogram of effective entries: `content² / error²` per bin
    /// (0 where the error is 0), with error `sqrt(n_eff)`.
    pub fn effective_entries(&self, name: impl Into<String>) -> Histogram {
        let mut out = self.empty_like(name);
        for i in 0..self.n_bins() {
            let nee = if self.sumw2[i] != 0.0 {
                self.bin_content[i] * self.bin_content[i] / self.sumw2[i]
            } else {
                0.0
            };
            out.bin_content[i] = nee;
            out.sumw2[i] = nee;
        }
        out.entries = out.integral();
        out
    }

    /// Set every bin error to `sqrt(content)`.
    pub fn set_poisson_errors(&mut self) {
        for (c, s) in self.bin_content.iter().zip(self.sumw2.iter_mut()) {
            *s = c.max(0.0);
        }
    }

    /// Compare each bin error against `sqrt(content)`.
    pub fn poisson_error_report(&self) -> Vec<PoissonCheck> {
        (0..self.n_bins())
            .map(|i| {
                let c = self.bin_content[i];
                if c == 0.0 {
                    return PoissonCheck::Empty;
                }
                let expected = c.abs().sqrt();
                let error = self.error(i);
                if error == expected { PoissonCheck::Ok } else { PoissonCheck::Mismatch { error, expected } }
            })
            .collect()
    }

    /// Unit-weight copy with `round(content)` entries filled at each bin centre.
    pub fn rounded(&self, name: impl Into<String>) -> Histogram {
        let mut out = self.empty_like(name);
        for i in 0..self.n_bins() {
            let n = self.bin_content[i].round();
            if n > 0.0 {
                out.bin_content[i] = n;
                out.sumw2[i] = n;
                out.entries += n;
            }
        }
        out
    }

    /// Copy that keeps only the narrowest contiguous window of bins holding
    /// at least `fraction` of the integral.
    ///
    /// The scan starts at the first non-empty bin and steps by
    /// `max(1, span / 100)` bins. Returns `None` for an empty histogram, a
    /// single populated bin, or when no window reaches `fraction`.
    pub fn smallest_window_containing(&self, fraction: f64) -> Option<Histogram> {
        let integral = self.integral();
        if integral == 0.0 {
            return None;
        }
        let first = self.bin_content.iter().position(|&c| c != 0.0)?;
        let last = self.bin_content.iter().rposition(|&c| c != 0.0)?;
        let span = last - first;
        if span == 0 {
            return None;
        }
        let step = (span / 100).max(1);

        let mut best: Option<(usize, usize)> = None;
        let mut smallest = f64::INFINITY;
        for b1 in (first..=last).step_by(step) {
            for b2 in (b1..=last).step_by(step) {
                let pct = self.integral_range(b1, b2) / integral;
                if pct >= fraction {
                    let width = self.bin_up_edge(b2) - self.bin_low_edge(b1);
                    if width < smallest {
                        smallest = width;
                        best = Some((b1, b2));
                    }
                    break;
                }
            }
        }

        let (lo, hi) = best?;
        let mut out = self.clone();
        for i in 0..out.n_bins() {
            if i < lo || i > hi {
                out.bin_content[i] = 0.0;
                out.sumw2[i] = 0.0;
            }
        }
        Some(out)
    }
}
