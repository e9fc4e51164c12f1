//! Mobility Predict math utilities.

pub mod stable;
pub mod summary;

pub use stable::{log2_ratio, RatioAccumulator, LOG10_2};
pub use summary::{summarize, Summary};
