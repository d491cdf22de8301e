//! # dj-hist
//!
//! Variable-width 1D histograms for dijetplot.
//!
//! A [`Histogram`] stores bin edges, contents and per-bin sum of squared
//! weights. Beyond filling it supports the bookkeeping the plotting
//! workflow needs: scaling, merging samples, rebinning, ratio building,
//! effective-entries conversion and Poisson error handling.
//!
//! ## Example
//!
//! ```
//! use dj_hist::{BinnedDistribution, Histogram};
//!
//! let mut h = Histogram::new("mjj", vec![1000.0, 1500.0, 2000.0]).unwrap();
//! h.fill(1200.0);
//! h.fill_weighted(1700.0, 0.5);
//! assert_eq!(h.bin_content(), &[1.0, 0.5]);
//! assert_eq!(h.bin_center(0), 1250.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binning;
pub mod filler;
pub mod histogram;
pub mod io;

pub use dj_core::BinnedDistribution;
pub use filler::{FlowPolicy, NegativeWeightPolicy, fill_values};
pub use histogram::{Histogram, PoissonCheck};
pub use io::{find_histogram, histograms_to_json, parse_histograms, read_histograms, write_histograms};
