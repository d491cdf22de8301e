//! Poisson pseudo-data from a binned prediction.
//!
//! The number of events is Poisson-fluctuated around the (floored) integral;
//! each event lands in a bin drawn from the normalized content and at a
//! uniform position inside that bin.

use dj_core::{BinnedDistribution, Error, Result};
use dj_hist::Histogram;
use rand::SeedableRng;
use rand::distributions::{Uniform, WeightedIndex};
use rand_distr::{Distribution, Poisson};
use rayon::prelude::*;

/// Seed used when the caller does not pick one.
pub const DEFAULT_PSEUDO_DATA_SEED: u64 = 1986;

/// One pseudo-dataset named `name`, same binning as `input`.
///
/// Negative bin contents count as zero. A prediction with integral below one
/// event yields an empty histogram.
pub fn pseudo_data<B>(input: &B, name: &str, seed: u64) -> Result<Histogram>
where
    B: BinnedDistribution + ?Sized,
{
    let mut out = Histogram::new(name, input.bin_edges().to_vec())?;
    let weights: Vec<f64> = input.bin_content().iter().map(|&c| c.max(0.0)).collect();
    let total: f64 = weights.iter().sum();
    if !total.is_finite() {
        return Err(Error::Computation(format!(
            "histogram '{}' has a non-finite integral",
            input.name()
        )));
    }

    let lambda = total.floor();
    if lambda <= 0.0 {
        tracing::debug!(histogram = input.name(), total, "prediction below one event");
        return Ok(out);
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let pois = Poisson::new(lambda).map_err(|e| Error::Computation(format!("Poisson({lambda}): {e}")))?;
    let n_events = pois.sample(&mut rng) as u64;

    let pick = WeightedIndex::new(&weights)
        .map_err(|e| Error::Computation(format!("bin weights of '{}': {e}", input.name())))?;
    let edges = input.bin_edges();
    for _ in 0..n_events {
        let bin = pick.sample(&mut rng);
        let x = Uniform::new(edges[bin], edges[bin + 1]).sample(&mut rng);
        out.fill(x);
    }
    tracing::debug!(histogram = name, seed, n_events, "pseudo-data generated");
    Ok(out)
}

/// `n_toys` pseudo-datasets; toy `i` uses seed `seed + i` and is named
/// `"{input name}_toy{i}"`.
pub fn pseudo_data_toys<B>(input: &B, n_toys: usize, seed: u64) -> Result<Vec<Histogram>>
where
    B: BinnedDistribution + Sync + ?Sized,
{
    (0..n_toys)
        .into_par_iter()
        .map(|i| {
            let name = format!("{}_toy{i}", input.name());
            pseudo_data(input, &name, seed.wrapping_add(i as u64))
        })
        .collect()
}
