//! Single-pass histogram filling from value/weight columns.

use dj_core::{BinnedDistribution, Error, Result};

use crate::histogram::{Histogram, validate_edges};

/// Under/overflow handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowPolicy {
    /// Drop entries outside the histogram range (record them in `underflow/overflow`).
    #[default]
    Drop,
    /// Fold underflow into the first bin and overflow into the last bin.
    Fold,
}

/// Negative weight handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeWeightPolicy {
    /// Keep negative weights as-is.
    #[default]
    Allow,
    /// Clamp negative weights to 0.
    ClampToZero,
    /// Error on the first negative weight encountered.
    Error,
}

/// Fill a new histogram from `values`, optionally weighted.
///
/// `weights`, when given, must have the same length as `values`.
pub fn fill_values(
    name: impl Into<String>,
    bin_edges: Vec<f64>,
    values: &[f64],
    weights: Option<&[f64]>,
    flow_policy: FlowPolicy,
    negative_weight_policy: NegativeWeightPolicy,
) -> Result<Histogram> {
    let name = name.into();
    validate_edges(&name, &bin_edges)?;
    if let Some(w) = weights
        && w.len() != values.len()
    {
        return Err(Error::Validation(format!(
            "histogram '{name}': {} weights for {} values",
            w.len(),
            values.len()
        )));
    }

    let mut h = Histogram::new(name, bin_edges)?;
    let last = h.n_bins() - 1;
    let mut negative = 0u64;

    for (entry, &val) in values.iter().enumerate() {
        let mut weight = weights.map(|w| w[entry]).unwrap_or(1.0);
        if weight < 0.0 {
            negative += 1;
            match negative_weight_policy {
                NegativeWeightPolicy::Allow => {}
                NegativeWeightPolicy::ClampToZero => weight = 0.0,
                NegativeWeightPolicy::Error => {
                    return Err(Error::Validation(format!(
                        "negative weight (histogram='{}', entry={entry}, weight={weight})",
                        h.name
                    )));
                }
            }
        }

        if flow_policy == FlowPolicy::Fold {
            if val < h.x_min() {
                h.underflow += weight;
                h.fill_weighted(h.x_min(), weight);
                continue;
            }
            if val >= h.x_max() {
                h.overflow += weight;
                let x = h.bin_center(last);
                h.fill_weighted(x, weight);
                continue;
            }
        }
        h.fill_weighted(val, weight);
    }

    if negative > 0 {
        tracing::debug!(histogram = %h.name, negative, "negative-weight entries filled");
    }
    Ok(h)
}

/// Find the bin index for a value given sorted bin edges.
///
/// Returns `None` for underflow/overflow and NaN.
pub(crate) fn find_bin(edges: &[f64], val: f64) -> Option<usize> {
    if val.is_nan() || val < edges[0] || val >= edges[edges.len() - 1] {
        return None;
    }
    // Number of edges <= val, minus one, is the bin (half-open bins).
    let i = edges.partition_point(|&e| e <= val);
    Some(i - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_simple() {
        let h = fill_values(
            "h",
            vec![0.0, 1.0, 2.0, 3.0],
            &[0.5, 1.5, 2.5, 0.5, -1.0, 3.5],
            None,
            FlowPolicy::Drop,
            NegativeWeightPolicy::Allow,
        )
        .unwrap();
        assert_eq!(h.bin_content(), &[2.0, 1.0, 1.0]);
        assert_eq!(h.underflow, 1.0);
        assert_eq!(h.overflow, 1.0);
    }

    #[test]
    fn fill_with_weight() {
        let h = fill_values(
            "h",
            vec![0.0, 1.0, 2.0],
            &[0.5, 1.5, 0.5],
            Some(&[2.0, 3.0, 1.0]),
            FlowPolicy::Drop,
            NegativeWeightPolicy::Allow,
        )
        .unwrap();
        assert_eq!(h.bin_content(), &[3.0, 3.0]);
        assert_eq!(h.sumw2(), &[5.0, 9.0]);
    }

    #[test]
    fn fill_flow_fold() {
        let h = fill_values(
            "h",
            vec![0.0, 1.0, 2.0],
            &[-1.0, 0.2, 1.2, 3.0],
            None,
            FlowPolicy::Fold,
            NegativeWeightPolicy::Allow,
        )
        .unwrap();
        assert_eq!(h.bin_content(), &[2.0, 2.0]);
        assert_eq!(h.underflow, 1.0);
        assert_eq!(h.overflow, 1.0);
        assert_eq!(h.entries, 4.0);
    }

    #[test]
    fn fill_weight_length_mismatch() {
        let err = fill_values(
            "h",
            vec![0.0, 1.0],
            &[0.5, 0.5],
            Some(&[1.0]),
            FlowPolicy::Drop,
            NegativeWeightPolicy::Allow,
        )
        .unwrap_err();
        assert!(err.to_string().contains("1 weights for 2 values"));
    }

    #[test]
    fn fill_negative_weight_error() {
        let err = fill_values(
            "h",
            vec![0.0, 1.0, 2.0],
            &[0.5],
            Some(&[-1.0]),
            FlowPolicy::Drop,
            NegativeWeightPolicy::Error,
        )
        .unwrap_err();
        assert!(err.to_string().contains("negative weight"));
    }

    #[test]
    fn fill_negative_weight_clamp() {
        let h = fill_values(
            "h",
            vec![0.0, 1.0, 2.0],
            &[0.5, 1.5],
            Some(&[-1.0, 2.0]),
            FlowPolicy::Drop,
            NegativeWeightPolicy::ClampToZero,
        )
        .unwrap();
        assert_eq!(h.bin_content(), &[0.0, 2.0]);
    }

    #[test]
    fn find_bin_edge_cases() {
        let edges = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_bin(&edges, -0.5), None);
        assert_eq!(find_bin(&edges, 3.0), None);
        assert_eq!(find_bin(&edges, f64::NAN), None);
        assert_eq!(find_bin(&edges, 0.0), Some(0));
        assert_eq!(find_bin(&edges, 1.0), Some(1));
        assert_eq!(find_bin(&edges, 2.99), Some(2));
    }
}
