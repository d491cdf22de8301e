//! # dj-toys
//!
//! Pseudo-experiment generation for dijetplot.
//!
//! - [`datalike`]: turn a scaled MC expectation into a unit-weight,
//!   data-like histogram limited by the MC's effective number of entries.
//! - [`pseudodata`]: Poisson-fluctuated pseudo-data drawn from a shape.
//!
//! Every call owns its random generators; nothing is shared between calls,
//! so independent calls can run concurrently.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod datalike;
pub mod pseudodata;

pub use datalike::{
    BinWarning, DEFAULT_JOB_SEED, DataLikeBatchOutcome, DataLikeOutcome, MASS_THRESHOLD, bin_seed,
    data_like, data_like_batch, data_like_batch_with_report, data_like_parallel,
    data_like_with_report,
};
pub use pseudodata::{DEFAULT_PSEUDO_DATA_SEED, pseudo_data, pseudo_data_toys};
