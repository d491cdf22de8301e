//! `dijetplot compare` plot configuration.

use anyhow::{Context, Result};
use dj_core::SampleKind;
use dj_hist::{Histogram, binning, find_histogram, read_histograms};
use dj_viz::{InputMeta, Normalization, RatioReference, Sample};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct PlotConfig {
    /// Samples in draw order; backgrounds stack bottom-up in this order.
    pub samples: Vec<SampleConfig>,

    #[serde(default)]
    pub normalization: Normalization,

    /// Stack the backgrounds.
    #[serde(default = "default_stack")]
    pub stack: bool,

    /// Ratio panel reference (`data` or `background`); no panel when absent.
    #[serde(default)]
    pub ratio: Option<RatioReference>,

    /// Merge this many consecutive bins.
    #[serde(default)]
    pub rebin: Option<usize>,

    /// Rebin onto a named mass binning instead.
    #[serde(default)]
    pub binning: Option<String>,

    /// Zero the bins whose centre lies outside `[lo, hi)`.
    #[serde(default)]
    pub range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    /// Histogram file, relative to the config file.
    pub file: PathBuf,
    /// Histogram name inside the file.
    pub hist: String,
    pub kind: SampleKind,
    /// Legend label; the histogram name when absent.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_stack() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

pub fn read_plot_config(path: &Path) -> Result<PlotConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: PlotConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        // Default: YAML (serde_yaml_ng).
        serde_yaml_ng::from_slice(&bytes)?
    };
    if cfg.samples.is_empty() {
        anyhow::bail!("plot config {} lists no samples", path.display());
    }
    if cfg.rebin.is_some() && cfg.binning.is_some() {
        anyhow::bail!("plot config {}: set either `rebin` or `binning`, not both", path.display());
    }
    Ok(cfg)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut s = String::with_capacity(64);
    for b in out {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

pub fn input_meta(path: &Path) -> Result<InputMeta> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(InputMeta { path: path.display().to_string(), sha256: sha256_hex(&bytes) })
}

/// Load, rescale and rebin every configured sample.
///
/// Returns the samples plus one [`InputMeta`] per distinct file.
pub fn load_samples(cfg: &PlotConfig, base_dir: &Path) -> Result<(Vec<Sample>, Vec<InputMeta>)> {
    let mut samples = Vec::with_capacity(cfg.samples.len());
    let mut inputs: Vec<InputMeta> = Vec::new();

    for sc in &cfg.samples {
        let path = base_dir.join(&sc.file);
        let hists = read_histograms(&path).with_context(|| format!("loading {}", path.display()))?;
        let mut hist = find_histogram(&hists, &sc.hist)?.clone();
        if sc.scale != 1.0 {
            hist.scale(sc.scale);
        }
        hist = reshape(hist, cfg)?;

        let display = path.display().to_string();
        if !inputs.iter().any(|m| m.path == display) {
            inputs.push(input_meta(&path)?);
        }

        let mut sample = Sample::new(sc.kind, hist);
        if let Some(label) = &sc.label {
            sample = sample.with_name(label.clone());
        }
        tracing::debug!(sample = %sample.name, kind = %sample.kind, "sample loaded");
        samples.push(sample);
    }
    Ok((samples, inputs))
}

fn reshape(hist: Histogram, cfg: &PlotConfig) -> Result<Histogram> {
    let mut hist = match (&cfg.binning, cfg.rebin) {
        (Some(preset), _) => hist.rebin_to(&binning::mass_bins(preset)?)?,
        (None, Some(factor)) => hist.rebin(factor)?,
        (None, None) => hist,
    };
    if let Some((lo, hi)) = cfg.range {
        hist = hist.with_range(lo, hi);
    }
    Ok(hist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_defaults() {
        let cfg: PlotConfig = serde_yaml_ng::from_str(
            "samples:\n  - {file: a.json, hist: mjj, kind: data}\n  - {file: b.json, hist: qcd, kind: bkg, scale: 2.0}\n",
        )
        .unwrap();
        assert!(cfg.stack);
        assert_eq!(cfg.normalization, Normalization::None);
        assert_eq!(cfg.ratio, None);
        assert_eq!(cfg.samples[0].scale, 1.0);
        assert_eq!(cfg.samples[1].kind, SampleKind::Background);
    }

    #[test]
    fn yaml_lumi_normalization() {
        let cfg: PlotConfig = serde_yaml_ng::from_str(
            "normalization: {lumi: 1.5}\nratio: background\nsamples:\n  - {file: a.json, hist: s, kind: signal}\n",
        )
        .unwrap();
        assert_eq!(cfg.normalization, Normalization::Lumi(1.5));
        assert_eq!(cfg.ratio, Some(RatioReference::Background));
    }

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
