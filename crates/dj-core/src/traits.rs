//! Core traits for dijetplot
//!
//! [`BinnedDistribution`] is the read-only view of a 1D histogram that the
//! resampler and the comparison builders consume. Keeping it here lets
//! those crates accept any binned container, not only `dj_hist::Histogram`.

use crate::{Error, Result};

/// Read-only view of a 1D binned distribution.
///
/// Implementors provide the raw arrays; axis helpers are derived from them.
/// `bin_edges().len()` must be `n_bins() + 1`.
pub trait BinnedDistribution {
    /// Identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Bin edges (length = number of bins + 1, strictly increasing).
    fn bin_edges(&self) -> &[f64];

    /// Bin contents (under/overflow excluded).
    fn bin_content(&self) -> &[f64];

    /// Sum of squared weights per bin.
    fn sumw2(&self) -> &[f64];

    /// Number of bins.
    fn n_bins(&self) -> usize {
        self.bin_content().len()
    }

    /// Lower edge of bin `i`.
    fn bin_low_edge(&self, i: usize) -> f64 {
        self.bin_edges()[i]
    }

    /// Upper edge of bin `i`.
    fn bin_up_edge(&self, i: usize) -> f64 {
        self.bin_edges()[i + 1]
    }

    /// Centre of bin `i`.
    fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_low_edge(i) + self.bin_up_edge(i))
    }

    /// Width of bin `i`.
    fn bin_width(&self, i: usize) -> f64 {
        self.bin_up_edge(i) - self.bin_low_edge(i)
    }

    /// Content of bin `i`.
    fn content(&self, i: usize) -> f64 {
        self.bin_content()[i]
    }

    /// Statistical uncertainty of bin `i` (`sqrt(sumw2)`).
    fn error(&self, i: usize) -> f64 {
        self.sumw2()[i].max(0.0).sqrt()
    }

    /// Sum of all bin contents.
    fn integral(&self) -> f64 {
        self.bin_content().iter().sum()
    }

    /// `true` if both distributions have bit-identical edge arrays.
    fn same_binning<B: BinnedDistribution + ?Sized>(&self, other: &B) -> bool {
        self.bin_edges() == other.bin_edges()
    }

    /// Fail with [`Error::ShapeMismatch`] unless `other` shares this axis.
    fn check_same_binning<B: BinnedDistribution + ?Sized>(&self, other: &B) -> Result<()> {
        let a = self.bin_edges();
        let b = other.bin_edges();
        if a.len() != b.len() {
            return Err(Error::ShapeMismatch {
                left: self.name().to_string(),
                right: other.name().to_string(),
                detail: format!(
                    "{} bins vs {} bins",
                    a.len().saturating_sub(1),
                    b.len().saturating_sub(1)
                ),
            });
        }
        if let Some(i) = a.iter().zip(b.iter()).position(|(x, y)| x != y) {
            return Err(Error::ShapeMismatch {
                left: self.name().to_string(),
                right: other.name().to_string(),
                detail: format!("edge {i} differs ({} vs {})", a[i], b[i]),
            });
        }
        Ok(())
    }
}
