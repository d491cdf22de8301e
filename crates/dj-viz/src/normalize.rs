use dj_core::{BinnedDistribution, Error, Result, SampleKind};
use dj_hist::Histogram;
use serde::{Deserialize, Serialize};

/// A histogram tagged with its role in a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Display name (legend entry).
    pub name: String,
    /// Data, background or signal.
    pub kind: SampleKind,
    /// Binned content.
    pub hist: Histogram,
}

impl Sample {
    /// Tag `hist` with a role; the sample takes the histogram's name.
    pub fn new(kind: SampleKind, hist: Histogram) -> Self {
        Self { name: hist.name.clone(), kind, hist }
    }

    /// Override the display name (builder style).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// How sample yields are rescaled before plotting.
///
/// In config files: `none`, `to_data`, `to_background`, `unit`,
/// `differential` or `{lumi: <factor>}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Scale every background by a luminosity factor.
    Lumi(f64),
    /// Match the data integral.
    ToData,
    /// Match the background integral.
    ToBackground,
    /// Every sample to unit area.
    Unit,
    /// Unit area, then divide by bin width.
    Differential,
    /// Leave yields as they are.
    #[default]
    None,
}

fn integral_of(samples: &[Sample], kind: SampleKind) -> Option<f64> {
    let mut it = samples.iter().filter(|s| s.kind == kind).peekable();
    it.peek()?;
    Some(it.map(|s| s.hist.integral()).sum())
}

fn first_of(samples: &[Sample], kind: SampleKind) -> Result<usize> {
    samples.iter().position(|s| s.kind == kind).ok_or_else(|| {
        Error::Validation(format!("normalization needs at least one {kind} sample"))
    })
}

/// Scale `s` so its integral becomes `target`; zero integrals stay put.
fn scale_to(s: &mut Sample, target: f64) -> Option<f64> {
    let current = s.hist.integral();
    if current == 0.0 || !current.is_finite() {
        tracing::debug!(sample = %s.name, "zero integral, not normalized");
        return None;
    }
    let factor = target / current;
    s.hist.scale(factor);
    Some(factor)
}

fn scale_kind(samples: &mut [Sample], kind: SampleKind, factor: f64) {
    for s in samples.iter_mut().filter(|s| s.kind == kind) {
        s.hist.scale(factor);
    }
}

/// Ratio of the summed data integral to the summed background integral.
///
/// `None` without backgrounds or when they integrate to zero.
pub fn lumi_ratio(samples: &[Sample]) -> Option<f64> {
    let bkg = integral_of(samples, SampleKind::Background)?;
    if bkg == 0.0 {
        return None;
    }
    let data = integral_of(samples, SampleKind::Data).unwrap_or(0.0);
    Some(data / bkg)
}

/// Apply `policy` in place.
///
/// With `stack`, backgrounds are treated as one stacked total: `ToData`
/// scales the whole stack (and the signals, by the same factor) to the
/// first data integral and every other data sample to that integral;
/// `ToBackground` scales every non-background sample to the stack total.
/// Nothing is rescaled when the stack total is not positive. `Unit` and
/// `Differential` cannot be combined with a stack.
///
/// Without `stack`, the first data (`ToData`) or background
/// (`ToBackground`) sample is the reference and every other non-signal
/// sample is scaled to it.
pub fn normalize(samples: &mut [Sample], policy: Normalization, stack: bool) -> Result<()> {
    tracing::debug!(?policy, stack, n = samples.len(), "normalizing samples");
    match policy {
        Normalization::None => {}
        Normalization::Lumi(f) => {
            if !f.is_finite() {
                return Err(Error::Validation(format!("luminosity factor must be finite, got {f}")));
            }
            scale_kind(samples, SampleKind::Background, f);
        }
        Normalization::Unit | Normalization::Differential if stack => {
            return Err(Error::Validation(format!(
                "{policy:?} normalization cannot be used with stacked backgrounds"
            )));
        }
        Normalization::Unit | Normalization::Differential => {
            for s in samples.iter_mut() {
                scale_to(s, 1.0);
                if policy == Normalization::Differential {
                    s.hist.scale_by_width(1.0);
                }
            }
        }
        Normalization::ToData | Normalization::ToBackground if stack => {
            let total = integral_of(samples, SampleKind::Background).unwrap_or(0.0);
            if total <= 0.0 || !total.is_finite() {
                tracing::warn!(total, "background stack integral is not positive, not normalized");
                return Ok(());
            }
            if policy == Normalization::ToBackground {
                for s in samples.iter_mut().filter(|s| s.kind != SampleKind::Background) {
                    scale_to(s, total);
                }
                return Ok(());
            }
            let ref_idx = first_of(samples, SampleKind::Data)?;
            let target = samples[ref_idx].hist.integral();
            let factor = target / total;
            for (i, s) in samples.iter_mut().enumerate() {
                match s.kind {
                    SampleKind::Background | SampleKind::Signal => s.hist.scale(factor),
                    SampleKind::Data if i != ref_idx => {
                        scale_to(s, target);
                    }
                    SampleKind::Data => {}
                }
            }
        }
        Normalization::ToData | Normalization::ToBackground => {
            let ref_kind = if policy == Normalization::ToData {
                SampleKind::Data
            } else {
                SampleKind::Background
            };
            let ref_idx = first_of(samples, ref_kind)?;
            let target = samples[ref_idx].hist.integral();
            let n_bkg = samples.iter().filter(|s| s.kind == SampleKind::Background).count();

            let mut bkg_factor = None;
            for (i, s) in samples.iter_mut().enumerate() {
                if i == ref_idx || s.kind == SampleKind::Signal {
                    continue;
                }
                let f = scale_to(s, target);
                if s.kind == SampleKind::Background {
                    bkg_factor = f;
                }
            }
            // A lone background carries its signals along.
            if policy == Normalization::ToData
                && n_bkg == 1
                && let Some(f) = bkg_factor
            {
                scale_kind(samples, SampleKind::Signal, f);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(kind: SampleKind, name: &str, content: &[f64]) -> Sample {
        let edges: Vec<f64> = (0..=content.len()).map(|i| 1000.0 + 500.0 * i as f64).collect();
        Sample::new(kind, Histogram::from_parts(name, edges, content.to_vec(), None).unwrap())
    }

    fn setup() -> Vec<Sample> {
        vec![
            sample(SampleKind::Data, "data", &[60.0, 40.0]),
            sample(SampleKind::Background, "qcd", &[30.0, 10.0]),
            sample(SampleKind::Background, "ttbar", &[5.0, 5.0]),
            sample(SampleKind::Signal, "qstar", &[2.0, 3.0]),
        ]
    }

    #[test]
    fn test_lumi_ratio() {
        let s = setup();
        assert_relative_eq!(lumi_ratio(&s).unwrap(), 2.0);
        assert_eq!(lumi_ratio(&s[..1]), None);
    }

    #[test]
    fn test_lumi_scales_backgrounds_only() {
        let mut s = setup();
        normalize(&mut s, Normalization::Lumi(2.0), false).unwrap();
        assert_eq!(s[0].hist.bin_content(), &[60.0, 40.0]);
        assert_eq!(s[1].hist.bin_content(), &[60.0, 20.0]);
        assert_eq!(s[3].hist.bin_content(), &[2.0, 3.0]);
    }

    #[test]
    fn test_to_data_stacked() {
        let mut s = setup();
        normalize(&mut s, Normalization::ToData, true).unwrap();
        let total = s[1].hist.integral() + s[2].hist.integral();
        assert_relative_eq!(total, 100.0, epsilon = 1e-9);
        // Stack shape and signal follow the same factor (2.0).
        assert_relative_eq!(s[1].hist.content(0), 60.0, epsilon = 1e-9);
        assert_relative_eq!(s[3].hist.integral(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_data_unstacked() {
        let mut s = setup();
        normalize(&mut s, Normalization::ToData, false).unwrap();
        assert_relative_eq!(s[1].hist.integral(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(s[2].hist.integral(), 100.0, epsilon = 1e-9);
        // Two backgrounds: signal untouched.
        assert_relative_eq!(s[3].hist.integral(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_data_single_background_carries_signal() {
        let mut s = setup();
        s.remove(2);
        normalize(&mut s, Normalization::ToData, false).unwrap();
        assert_relative_eq!(s[1].hist.integral(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(s[2].hist.integral(), 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_to_background() {
        let mut s = setup();
        normalize(&mut s, Normalization::ToBackground, true).unwrap();
        assert_relative_eq!(s[0].hist.integral(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(s[1].hist.integral(), 40.0, epsilon = 1e-9);

        let mut s = setup();
        normalize(&mut s, Normalization::ToBackground, false).unwrap();
        assert_relative_eq!(s[0].hist.integral(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(s[2].hist.integral(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_background_stacked_scales_signal() {
        let mut s = setup();
        normalize(&mut s, Normalization::ToBackground, true).unwrap();
        assert_relative_eq!(s[3].hist.integral(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(s[3].hist.content(0), 20.0, epsilon = 1e-9);
        assert_eq!(s[2].hist.bin_content(), &[5.0, 5.0]);
    }

    #[test]
    fn test_to_data_stacked_second_data_sample() {
        let mut s = setup();
        s.insert(1, sample(SampleKind::Data, "data_b", &[10.0, 15.0]));
        normalize(&mut s, Normalization::ToData, true).unwrap();
        assert_eq!(s[0].hist.bin_content(), &[60.0, 40.0]);
        assert_relative_eq!(s[1].hist.integral(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(s[1].hist.content(0), 40.0, epsilon = 1e-9);
        assert_relative_eq!(s[4].hist.integral(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_background_stacked_empty_stack() {
        let mut s = vec![
            sample(SampleKind::Data, "data", &[60.0, 40.0]),
            sample(SampleKind::Background, "qcd", &[0.0, 0.0]),
            sample(SampleKind::Signal, "qstar", &[2.0, 3.0]),
        ];
        normalize(&mut s, Normalization::ToBackground, true).unwrap();
        assert_eq!(s[0].hist.bin_content(), &[60.0, 40.0]);
        assert_eq!(s[2].hist.bin_content(), &[2.0, 3.0]);
    }

    #[test]
    fn test_zero_integral_untouched() {
        let mut s = vec![
            sample(SampleKind::Data, "data", &[6.0, 4.0]),
            sample(SampleKind::Background, "empty", &[0.0, 0.0]),
        ];
        normalize(&mut s, Normalization::ToData, false).unwrap();
        assert_eq!(s[1].hist.bin_content(), &[0.0, 0.0]);
        normalize(&mut s, Normalization::ToData, true).unwrap();
        assert_eq!(s[1].hist.bin_content(), &[0.0, 0.0]);
    }

    #[test]
    fn test_unit_and_differential() {
        let mut s = setup();
        normalize(&mut s, Normalization::Unit, false).unwrap();
        for x in &s {
            assert_relative_eq!(x.hist.integral(), 1.0, epsilon = 1e-12);
        }

        let mut s = setup();
        normalize(&mut s, Normalization::Differential, false).unwrap();
        assert_relative_eq!(s[0].hist.content(0), 0.6 / 500.0, epsilon = 1e-12);

        let mut s = setup();
        assert!(matches!(normalize(&mut s, Normalization::Unit, true), Err(Error::Validation(_))));
        assert!(normalize(&mut s, Normalization::Differential, true).is_err());
    }

    #[test]
    fn test_missing_reference() {
        let mut s = vec![sample(SampleKind::Background, "qcd", &[1.0, 1.0])];
        let err = normalize(&mut s, Normalization::ToData, false).unwrap_err();
        assert!(err.to_string().contains("data sample"));
    }
}
