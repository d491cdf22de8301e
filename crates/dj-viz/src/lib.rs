//! # dj-viz
//!
//! Numbers-first comparison artifacts for dijetplot.
//!
//! Nothing here draws. The crate normalizes and stacks samples, builds ratio
//! panels and data error bars, and emits a plot-friendly JSON structure
//! (arrays instead of nested objects) for an external renderer.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Data/background/signal comparison artifacts.
pub mod comparison;

/// Sample normalization policies.
pub mod normalize;

pub use comparison::{
    ComparisonArtifact, ComparisonMeta, ComparisonOptions, DataSeries, InputMeta, RatioPanel,
    RatioReference, RatioSeries, SampleSeries, build_comparison, data_errors, ratio_series,
};
pub use normalize::{Normalization, Sample, lumi_ratio, normalize};
