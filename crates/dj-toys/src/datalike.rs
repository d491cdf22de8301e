//! Data-like histograms from limited-statistics MC.
//!
//! A scaled MC prediction has smooth, weighted bin contents. To see what a
//! real dataset of that size would look like, each bin is resampled from the
//! MC's *effective entries*: `round(n_eff)` trials, each accepted with
//! probability `expected / n_eff`, every acceptance a unit-weight fill at the
//! bin centre.
//!
//! Rules:
//! - only bins with upper edge above [`MASS_THRESHOLD`] and positive
//!   expectation are resampled;
//! - every bin draws from its own generator seeded with
//!   `round(center + job_seed * 1e5)`, so a bin's result does not depend on
//!   any other bin or on call order;
//! - a bin with `n_eff < expected` stays empty and produces a [`BinWarning`];
//! - a histogram with no resampled bin at all is returned as `None`.

use dj_core::{BinnedDistribution, Error, Result};
use dj_hist::Histogram;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

/// Bins must have an upper edge strictly above this value (GeV).
pub const MASS_THRESHOLD: f64 = 1000.0;

/// Job seed used when the caller does not pick one.
pub const DEFAULT_JOB_SEED: u64 = 10;

/// A bin above threshold that could not be resampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinWarning {
    /// Name of the output histogram.
    pub histogram: String,
    /// Bin index (0-based).
    pub bin: usize,
    /// Lower bin edge.
    pub low_edge: f64,
    /// Upper bin edge.
    pub up_edge: f64,
    /// Effective entries available in the bin.
    pub effective_entries: f64,
    /// Scaled expectation requested in the bin.
    pub expected: f64,
}

/// Result of [`data_like_with_report`].
#[derive(Debug, Clone)]
pub struct DataLikeOutcome {
    /// Data-like histogram, `None` if no bin could be resampled.
    pub histogram: Option<Histogram>,
    /// Bins skipped for lack of effective entries.
    pub warnings: Vec<BinWarning>,
}

/// Result of [`data_like_batch_with_report`].
#[derive(Debug, Clone)]
pub struct DataLikeBatchOutcome {
    /// One entry per input, in input order.
    pub histograms: Vec<Option<Histogram>>,
    /// Bins skipped for lack of effective entries, across all targets.
    pub warnings: Vec<BinWarning>,
}

/// Per-bin generator seed.
pub fn bin_seed(bin_center: f64, job_seed: u64) -> u64 {
    (bin_center + job_seed as f64 * 1e5).round() as i64 as u64
}

fn check_finite<B: BinnedDistribution + ?Sized>(h: &B) -> Result<()> {
    if let Some(i) = h.bin_content().iter().position(|c| !c.is_finite()) {
        return Err(Error::Validation(format!(
            "histogram '{}': bin {i} content is not finite",
            h.name()
        )));
    }
    Ok(())
}

fn resample<E, S>(
    effective: &E,
    scaled: &[&S],
    names: &[&str],
    job_seed: u64,
) -> Result<DataLikeBatchOutcome>
where
    E: BinnedDistribution + ?Sized,
    S: BinnedDistribution + ?Sized,
{
    if names.len() != scaled.len() {
        return Err(Error::Validation(format!(
            "{} output names for {} scaled histograms",
            names.len(),
            scaled.len()
        )));
    }
    check_finite(effective)?;
    for s in scaled {
        effective.check_same_binning(*s)?;
        check_finite(*s)?;
    }

    let mut out: Vec<Histogram> = names
        .iter()
        .map(|n| Histogram::new(*n, effective.bin_edges().to_vec()))
        .collect::<Result<_>>()?;
    let mut acceptable = vec![false; scaled.len()];
    let mut thresholds = vec![0.0f64; scaled.len()];
    let mut warnings = Vec::new();

    for bin in 0..effective.n_bins() {
        let up_edge = effective.bin_up_edge(bin);
        if up_edge <= MASS_THRESHOLD {
            continue;
        }
        let nee = effective.content(bin);

        for (k, s) in scaled.iter().enumerate() {
            let expected = s.content(bin);
            thresholds[k] = 0.0;
            if expected > 0.0 && nee >= expected {
                acceptable[k] = true;
                thresholds[k] = expected / nee;
            } else if nee < expected {
                let low_edge = effective.bin_low_edge(bin);
                tracing::warn!(
                    histogram = names[k],
                    bin,
                    low_edge,
                    up_edge,
                    effective_entries = nee,
                    expected,
                    "not enough effective entries, bin left empty"
                );
                warnings.push(BinWarning {
                    histogram: names[k].to_string(),
                    bin,
                    low_edge,
                    up_edge,
                    effective_entries: nee,
                    expected,
                });
            }
        }
        if thresholds.iter().all(|&t| t == 0.0) {
            continue;
        }

        let center = effective.bin_center(bin);
        let seed = bin_seed(center, job_seed);
        let trials = nee.round() as u64;
        tracing::debug!(bin, seed, trials, "resampling bin");

        // One draw per trial, shared by all targets.
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..trials {
            let u: f64 = rng.r#gen();
            for (h, &t) in out.iter_mut().zip(thresholds.iter()) {
                if u < t {
                    h.fill(center);
                }
            }
        }
    }

    let histograms = out.into_iter().zip(acceptable).map(|(h, ok)| ok.then_some(h)).collect();
    Ok(DataLikeBatchOutcome { histograms, warnings })
}

/// Data-like histogram named `name` from `effective` entries and the
/// `scaled` expectation. See the module docs for the rules.
///
/// Returns `Ok(None)` when no bin could be resampled and
/// [`Error::ShapeMismatch`] when the two inputs have different binning.
pub fn data_like<E, S>(effective: &E, scaled: &S, name: &str, job_seed: u64) -> Result<Option<Histogram>>
where
    E: BinnedDistribution + ?Sized,
    S: BinnedDistribution + ?Sized,
{
    Ok(data_like_with_report(effective, scaled, name, job_seed)?.histogram)
}

/// [`data_like`] that also returns the skipped-bin warnings.
pub fn data_like_with_report<E, S>(
    effective: &E,
    scaled: &S,
    name: &str,
    job_seed: u64,
) -> Result<DataLikeOutcome>
where
    E: BinnedDistribution + ?Sized,
    S: BinnedDistribution + ?Sized,
{
    let mut batch = resample(effective, &[scaled], &[name], job_seed)?;
    Ok(DataLikeOutcome { histogram: batch.histograms.pop().flatten(), warnings: batch.warnings })
}

/// Data-like histograms for several scaled predictions sharing one
/// effective-entries histogram.
///
/// Entry `k` of the output equals `data_like(effective, &scaled[k], names[k], job_seed)`.
pub fn data_like_batch<E, S, N>(
    effective: &E,
    scaled: &[S],
    names: &[N],
    job_seed: u64,
) -> Result<Vec<Option<Histogram>>>
where
    E: BinnedDistribution + ?Sized,
    S: BinnedDistribution,
    N: AsRef<str>,
{
    Ok(data_like_batch_with_report(effective, scaled, names, job_seed)?.histograms)
}

/// [`data_like_batch`] that also returns the skipped-bin warnings.
pub fn data_like_batch_with_report<E, S, N>(
    effective: &E,
    scaled: &[S],
    names: &[N],
    job_seed: u64,
) -> Result<DataLikeBatchOutcome>
where
    E: BinnedDistribution + ?Sized,
    S: BinnedDistribution,
    N: AsRef<str>,
{
    let scaled_refs: Vec<&S> = scaled.iter().collect();
    let name_refs: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    resample(effective, &scaled_refs, &name_refs, job_seed)
}

/// Same output as [`data_like_batch`], one Rayon task per scaled histogram.
pub fn data_like_parallel<E, S, N>(
    effective: &E,
    scaled: &[S],
    names: &[N],
    job_seed: u64,
) -> Result<Vec<Option<Histogram>>>
where
    E: BinnedDistribution + Sync + ?Sized,
    S: BinnedDistribution + Sync,
    N: AsRef<str> + Sync,
{
    if names.len() != scaled.len() {
        return Err(Error::Validation(format!(
            "{} output names for {} scaled histograms",
            names.len(),
            scaled.len()
        )));
    }
    scaled
        .par_iter()
        .zip(names.par_iter())
        .map(|(s, n)| data_like(effective, s, n.as_ref(), job_seed))
        .collect()
}
