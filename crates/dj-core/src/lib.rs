//! # dj-core
//!
//! Shared building blocks for the dijetplot workspace: the error type,
//! sample classification, and the [`BinnedDistribution`] trait that the
//! histogram, toy and visualization crates agree on.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::BinnedDistribution;
pub use types::SampleKind;
