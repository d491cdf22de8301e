use dj_core::{BinnedDistribution, Error, Result, SampleKind};
use dj_hist::Histogram;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::normalize::{Normalization, Sample, lumi_ratio, normalize};

/// Schema identifier written into every artifact.
pub const SCHEMA_VERSION: &str = "dijetplot_comparison_v1";

/// Which series the ratio panel is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioReference {
    /// `(data - mc) / mc` for every simulated series.
    #[default]
    Data,
    /// `(data - bkg) / data` style: sign flipped so an excess over the
    /// background stays positive.
    Background,
}

/// Options for [`build_comparison`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComparisonOptions {
    /// Yield normalization applied before anything else.
    pub normalization: Normalization,
    /// Treat backgrounds as one stack.
    pub stack: bool,
    /// Add a ratio panel against this reference.
    pub ratio: Option<RatioReference>,
}

/// One input file and its content hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputMeta {
    /// Path as given on the command line or in the config.
    pub path: String,
    /// Hex SHA-256 of the file bytes.
    pub sha256: String,
}

/// Provenance block.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonMeta {
    /// Producing tool.
    pub tool: String,
    /// Tool version.
    pub tool_version: String,
    /// Normalization that was applied.
    pub normalization: Normalization,
    /// Whether backgrounds were stacked.
    pub stacked: bool,
    /// Data over background integral before normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lumi_ratio: Option<f64>,
    /// Input files (filled by the caller).
    pub inputs: Vec<InputMeta>,
}

/// A data series with asymmetric error bars.
#[derive(Debug, Clone, Serialize)]
pub struct DataSeries {
    /// Legend name.
    pub name: String,
    /// Bin contents.
    pub y: Vec<f64>,
    /// Downward error.
    pub yerr_lo: Vec<f64>,
    /// Upward error.
    pub yerr_hi: Vec<f64>,
    /// `garwood_poisson_68` or `sqrt_y_fallback`.
    pub error_model: String,
}

/// A simulated series with symmetric errors.
#[derive(Debug, Clone, Serialize)]
pub struct SampleSeries {
    /// Legend name.
    pub name: String,
    /// Bin contents.
    pub y: Vec<f64>,
    /// `sqrt(sumw2)` per bin.
    pub yerr: Vec<f64>,
}

/// One line of the ratio panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioSeries {
    /// Name of the compared series.
    pub name: String,
    /// Relative difference per bin.
    pub y: Vec<f64>,
    /// Propagated error per bin.
    pub yerr: Vec<f64>,
}

/// Ratio panel.
#[derive(Debug, Clone, Serialize)]
pub struct RatioPanel {
    /// Reference kind.
    pub reference: RatioReference,
    /// Name of the reference series.
    pub reference_name: String,
    /// Compared series.
    pub series: Vec<RatioSeries>,
}

/// Everything a renderer needs for a data/MC comparison plot.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonArtifact {
    /// See [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Provenance.
    pub meta: ComparisonMeta,
    /// Common bin edges.
    pub bin_edges: Vec<f64>,
    /// Data series.
    pub data: Vec<DataSeries>,
    /// Backgrounds in stack order (bottom first).
    pub backgrounds: Vec<SampleSeries>,
    /// Sum of all backgrounds (zeros without backgrounds).
    pub background_total: Vec<f64>,
    /// Signal overlays.
    pub signals: Vec<SampleSeries>,
    /// Optional ratio panel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<RatioPanel>,
}

fn is_near_integer_nonneg(x: f64) -> Option<u64> {
    if !(x.is_finite() && x >= 0.0) {
        return None;
    }
    let r = x.round();
    if (x - r).abs() <= 1e-9 { Some(r as u64) } else { None }
}

fn chi2_quantile(dof: f64, p: f64) -> Result<f64> {
    let dist = ChiSquared::new(dof)
        .map_err(|e| Error::Computation(format!("chi-squared({dof}): {e}")))?;
    Ok(dist.inverse_cdf(p))
}

/// Central 68% Poisson interval for `n` observed events, as (down, up) errors.
fn garwood_68_interval(n: u64) -> Result<(f64, f64)> {
    let alpha = 0.31731_f64;
    let nf = n as f64;
    let lo = if n == 0 { 0.0 } else { nf - 0.5 * chi2_quantile(2.0 * nf, alpha / 2.0)? };
    let hi = 0.5 * chi2_quantile(2.0 * (nf + 1.0), 1.0 - alpha / 2.0)? - nf;
    Ok((lo, hi))
}

/// Error bars for observed counts.
///
/// Garwood intervals when every bin holds a non-negative integer, `sqrt(y)`
/// for the bins that do not. Returns (down, up, model name).
pub fn data_errors(y: &[f64]) -> Result<(Vec<f64>, Vec<f64>, &'static str)> {
    let mut lo = Vec::with_capacity(y.len());
    let mut hi = Vec::with_capacity(y.len());
    let mut all_poisson = true;
    for &v in y {
        if let Some(n) = is_near_integer_nonneg(v) {
            let (dl, dh) = garwood_68_interval(n)?;
            lo.push(dl);
            hi.push(dh);
        } else {
            all_poisson = false;
            let e = if v.is_finite() && v > 0.0 { v.sqrt() } else { 0.0 };
            lo.push(e);
            hi.push(e);
        }
    }
    let model = if all_poisson { "garwood_poisson_68" } else { "sqrt_y_fallback" };
    Ok((lo, hi, model))
}

/// `(reference - series) / series` per bin, negated when `flip`.
///
/// Errors follow [`Histogram::add`] then [`Histogram::divide`]: the
/// difference carries both sumw2 terms and is divided as if uncorrelated
/// with the series. Bins where the reference or the series is empty are 0
/// with error 0.
pub fn ratio_series(reference: &Histogram, series: &Histogram, flip: bool) -> Result<RatioSeries> {
    let mut ratio = reference.clone();
    ratio.add(series, -1.0)?;
    ratio.divide(series)?;
    if flip {
        ratio.scale(-1.0);
    }
    let n = ratio.n_bins();
    let mut y = Vec::with_capacity(n);
    let mut yerr = Vec::with_capacity(n);
    for i in 0..n {
        if reference.content(i) == 0.0 {
            y.push(0.0);
            yerr.push(0.0);
        } else {
            y.push(ratio.content(i));
            yerr.push(ratio.error(i));
        }
    }
    Ok(RatioSeries { name: series.name.clone(), y, yerr })
}

fn sample_series(s: &Sample) -> SampleSeries {
    let h = &s.hist;
    SampleSeries {
        name: s.name.clone(),
        y: h.bin_content().to_vec(),
        yerr: (0..h.n_bins()).map(|i| h.error(i)).collect(),
    }
}

fn named(s: &Sample) -> Histogram {
    let mut h = s.hist.clone();
    h.name = s.name.clone();
    h
}

/// Every sample except the reference, in input order. With a stack the
/// backgrounds are replaced by `total` at the position of the first one.
fn compared_series(samples: &[Sample], skip: Option<usize>, total: Option<&Histogram>) -> Vec<Histogram> {
    let mut out = Vec::with_capacity(samples.len());
    let mut stack_done = false;
    for (i, s) in samples.iter().enumerate() {
        if Some(i) == skip {
            continue;
        }
        match total {
            Some(t) if s.kind == SampleKind::Background => {
                if !stack_done {
                    out.push(t.clone());
                    stack_done = true;
                }
            }
            _ => out.push(named(s)),
        }
    }
    out
}

fn ratio_panel(
    kind: RatioReference,
    samples: &[Sample],
    total: Option<&Histogram>,
    stack: bool,
) -> Result<RatioPanel> {
    let stacked = if stack { total } else { None };
    let (reference, compared, flip) = match kind {
        RatioReference::Data => {
            let idx = samples.iter().position(|s| s.kind == SampleKind::Data).ok_or_else(|| {
                Error::Validation("ratio against data needs a data sample".into())
            })?;
            (named(&samples[idx]), compared_series(samples, Some(idx), stacked), false)
        }
        RatioReference::Background => match stacked {
            Some(t) => {
                let others: Vec<Histogram> =
                    samples.iter().filter(|s| s.kind != SampleKind::Background).map(named).collect();
                (t.clone(), others, true)
            }
            None => {
                let idx = samples.iter().position(|s| s.kind == SampleKind::Background).ok_or_else(
                    || Error::Validation("ratio against background needs a background sample".into()),
                )?;
                (named(&samples[idx]), compared_series(samples, Some(idx), None), true)
            }
        },
    };
    let series = compared.iter().map(|h| ratio_series(&reference, h, flip)).collect::<Result<Vec<_>>>()?;
    Ok(RatioPanel { reference: kind, reference_name: reference.name, series })
}

/// Normalize `samples`, stack the backgrounds and assemble the artifact.
///
/// All samples must share one binning. `meta.inputs` is left empty.
pub fn build_comparison(mut samples: Vec<Sample>, options: &ComparisonOptions) -> Result<ComparisonArtifact> {
    let Some(first) = samples.first() else {
        return Err(Error::Validation("comparison needs at least one sample".into()));
    };
    let bin_edges = first.hist.bin_edges().to_vec();
    for s in &samples[1..] {
        first.hist.check_same_binning(&s.hist)?;
    }

    let lumi = lumi_ratio(&samples);
    normalize(&mut samples, options.normalization, options.stack)?;

    let all = &samples;
    let of_kind = move |kind: SampleKind| all.iter().filter(move |s| s.kind == kind);

    let mut data = Vec::new();
    for s in of_kind(SampleKind::Data) {
        let (yerr_lo, yerr_hi, model) = data_errors(s.hist.bin_content())?;
        data.push(DataSeries {
            name: s.name.clone(),
            y: s.hist.bin_content().to_vec(),
            yerr_lo,
            yerr_hi,
            error_model: model.to_string(),
        });
    }
    let backgrounds: Vec<SampleSeries> = of_kind(SampleKind::Background).map(sample_series).collect();
    let signals: Vec<SampleSeries> = of_kind(SampleKind::Signal).map(sample_series).collect();

    let bkg_hists: Vec<Histogram> = of_kind(SampleKind::Background).map(named).collect();
    let total = if bkg_hists.is_empty() {
        None
    } else {
        Some(Histogram::merge("background_total", &bkg_hists)?)
    };
    let background_total = match &total {
        Some(t) => t.bin_content().to_vec(),
        None => vec![0.0; bin_edges.len() - 1],
    };

    let ratio = match options.ratio {
        None => None,
        Some(kind) => Some(ratio_panel(kind, &samples, total.as_ref(), options.stack)?),
    };

    tracing::info!(
        data = data.len(),
        backgrounds = backgrounds.len(),
        signals = signals.len(),
        "comparison artifact built"
    );

    Ok(ComparisonArtifact {
        schema_version: SCHEMA_VERSION.to_string(),
        meta: ComparisonMeta {
            tool: "dijetplot".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            normalization: options.normalization,
            stacked: options.stack,
            lumi_ratio: lumi,
            inputs: Vec::new(),
        },
        bin_edges,
        data,
        backgrounds,
        background_total,
        signals,
        ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(kind: SampleKind, name: &str, content: &[f64]) -> Sample {
        let edges: Vec<f64> = (0..=content.len()).map(|i| 1000.0 + 500.0 * i as f64).collect();
        Sample::new(kind, Histogram::from_parts(name, edges, content.to_vec(), None).unwrap())
    }

    #[test]
    fn test_garwood_known_values() {
        let (lo, hi) = garwood_68_interval(0).unwrap();
        assert_eq!(lo, 0.0);
        assert_relative_eq!(hi, 1.841, epsilon = 1e-3);
        let (lo, hi) = garwood_68_interval(1).unwrap();
        assert_relative_eq!(lo, 0.827, epsilon = 1e-3);
        assert_relative_eq!(hi, 2.299, epsilon = 1e-3);
    }

    #[test]
    fn test_data_errors_model() {
        let (_, _, m) = data_errors(&[0.0, 3.0, 10.0]).unwrap();
        assert_eq!(m, "garwood_poisson_68");
        let (lo, hi, m) = data_errors(&[4.0, 2.5]).unwrap();
        assert_eq!(m, "sqrt_y_fallback");
        assert_relative_eq!(lo[1], 2.5f64.sqrt());
        assert_relative_eq!(hi[1], 2.5f64.sqrt());
    }

    #[test]
    fn test_ratio_series() {
        let r = Histogram::from_parts("data", vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 20.0, 5.0], None).unwrap();
        let s = Histogram::from_parts("mc", vec![0.0, 1.0, 2.0, 3.0], vec![4.0, 10.0, 0.0], None).unwrap();
        let out = ratio_series(&r, &s, false).unwrap();
        assert_eq!(out.name, "mc");
        assert_eq!(out.y[0], 0.0);
        assert_eq!(out.yerr[0], 0.0);
        assert_relative_eq!(out.y[1], 1.0);
        // sumw2 of the difference is 20 + 10, divided by 10 with sumw2 10:
        // (30 * 100 + 10 * 100) / 10^4
        assert_relative_eq!(out.yerr[1], (0.4f64).sqrt(), epsilon = 1e-12);
        assert_eq!(out.y[2], 0.0);
        assert_eq!(out.yerr[2], 0.0);

        let flipped = ratio_series(&r, &s, true).unwrap();
        assert_relative_eq!(flipped.y[1], -1.0);
        assert_relative_eq!(flipped.yerr[1], (0.4f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_ratio_series_weighted_errors() {
        let edges = vec![0.0, 1.0, 2.0];
        let r = Histogram::from_parts("data", edges.clone(), vec![12.0, 6.0], Some(vec![12.0, 6.0])).unwrap();
        let s = Histogram::from_parts("mc", edges, vec![8.0, 6.0], Some(vec![2.0, 0.5])).unwrap();
        let out = ratio_series(&r, &s, false).unwrap();
        assert_relative_eq!(out.y[0], 0.5, epsilon = 1e-12);
        // ((12 + 2) * 64 + 2 * 16) / 8^4
        assert_relative_eq!(out.yerr[0], (928.0f64 / 4096.0).sqrt(), epsilon = 1e-12);
        // Equal contents: only the summed variance over s^2 survives.
        assert_eq!(out.y[1], 0.0);
        assert_relative_eq!(out.yerr[1], (6.5f64 / 36.0).sqrt(), epsilon = 1e-12);
        assert!(out.y.iter().chain(&out.yerr).all(|v| v.is_finite()));
    }

    #[test]
    fn test_ratio_shape_mismatch() {
        let r = Histogram::from_parts("a", vec![0.0, 1.0], vec![1.0], None).unwrap();
        let s = Histogram::from_parts("b", vec![0.0, 2.0], vec![1.0], None).unwrap();
        assert!(matches!(ratio_series(&r, &s, false), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_build_stacked_ratio_to_data() {
        let samples = vec![
            sample(SampleKind::Data, "data", &[60.0, 40.0]),
            sample(SampleKind::Background, "qcd", &[30.0, 10.0]),
            sample(SampleKind::Background, "ttbar", &[5.0, 5.0]),
            sample(SampleKind::Signal, "qstar", &[2.0, 3.0]).with_name("q* 2 TeV"),
        ];
        let opts = ComparisonOptions {
            normalization: Normalization::ToData,
            stack: true,
            ratio: Some(RatioReference::Data),
        };
        let art = build_comparison(samples, &opts).unwrap();
        assert_eq!(art.schema_version, SCHEMA_VERSION);
        assert_relative_eq!(art.meta.lumi_ratio.unwrap(), 2.0);
        assert_eq!(art.bin_edges, vec![1000.0, 1500.0, 2000.0]);
        assert_eq!(art.backgrounds.len(), 2);
        assert_eq!(art.backgrounds[0].name, "qcd");
        assert_relative_eq!(art.background_total[0], 70.0, epsilon = 1e-9);
        assert_relative_eq!(art.background_total[1], 30.0, epsilon = 1e-9);
        assert_eq!(art.data[0].error_model, "garwood_poisson_68");

        let ratio = art.ratio.unwrap();
        assert_eq!(ratio.reference_name, "data");
        let names: Vec<&str> = ratio.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["background_total", "q* 2 TeV"]);
        assert_relative_eq!(ratio.series[0].y[0], 60.0 / 70.0 - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_build_ratio_to_background() {
        let samples = vec![
            sample(SampleKind::Data, "data", &[12.0, 8.0]),
            sample(SampleKind::Background, "qcd", &[10.0, 10.0]),
        ];
        let opts = ComparisonOptions { ratio: Some(RatioReference::Background), ..Default::default() };
        let art = build_comparison(samples, &opts).unwrap();
        let ratio = art.ratio.unwrap();
        assert_eq!(ratio.series.len(), 1);
        // Excess stays positive.
        assert_relative_eq!(ratio.series[0].y[0], -(10.0 / 12.0 - 1.0), epsilon = 1e-12);
        assert!(ratio.series[0].y[0] > 0.0);
        assert!(ratio.series[0].y[1] < 0.0);
    }

    #[test]
    fn test_build_unstacked_ratio_to_first_background() {
        let samples = vec![
            sample(SampleKind::Data, "data", &[12.0, 8.0]),
            sample(SampleKind::Background, "qcd", &[10.0, 10.0]),
            sample(SampleKind::Background, "ttbar", &[5.0, 20.0]),
            sample(SampleKind::Signal, "qstar", &[10.0, 0.0]),
        ];
        let opts = ComparisonOptions { stack: false, ratio: Some(RatioReference::Background), ..Default::default() };
        let art = build_comparison(samples, &opts).unwrap();
        let ratio = art.ratio.unwrap();
        assert_eq!(ratio.reference_name, "qcd");
        let names: Vec<&str> = ratio.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["data", "ttbar", "qstar"]);
        assert_relative_eq!(ratio.series[1].y[0], -(10.0 / 5.0 - 1.0), epsilon = 1e-12);
        assert_eq!(ratio.series[2].y[1], 0.0);
    }

    #[test]
    fn test_build_stacked_ratio_to_background() {
        let samples = vec![
            sample(SampleKind::Data, "data", &[12.0, 8.0]),
            sample(SampleKind::Background, "qcd", &[5.0, 5.0]),
            sample(SampleKind::Background, "ttbar", &[5.0, 5.0]),
        ];
        let opts = ComparisonOptions { stack: true, ratio: Some(RatioReference::Background), ..Default::default() };
        let art = build_comparison(samples, &opts).unwrap();
        let ratio = art.ratio.unwrap();
        assert_eq!(ratio.reference_name, "background_total");
        assert_eq!(ratio.series.len(), 1);
        assert_eq!(ratio.series[0].name, "data");
    }

    #[test]
    fn test_build_errors() {
        assert!(build_comparison(vec![], &ComparisonOptions::default()).is_err());

        let mismatched = vec![
            sample(SampleKind::Data, "data", &[1.0, 2.0]),
            sample(SampleKind::Background, "qcd", &[1.0, 2.0, 3.0]),
        ];
        assert!(matches!(
            build_comparison(mismatched, &ComparisonOptions::default()),
            Err(Error::ShapeMismatch { .. })
        ));

        let no_data = vec![sample(SampleKind::Background, "qcd", &[1.0, 2.0])];
        let opts = ComparisonOptions { ratio: Some(RatioReference::Data), ..Default::default() };
        assert!(build_comparison(no_data, &opts).is_err());
    }

    #[test]
    fn test_artifact_serializes() {
        let samples = vec![sample(SampleKind::Data, "data", &[1.0, 2.0])];
        let art = build_comparison(samples, &ComparisonOptions::default()).unwrap();
        let v = serde_json::to_value(&art).unwrap();
        assert_eq!(v["meta"]["tool"], "dijetplot");
        assert_eq!(v["meta"]["normalization"], "none");
        assert!(v.get("ratio").is_none());
        assert_eq!(v["background_total"], serde_json::json!([0.0, 0.0]));
    }
}
