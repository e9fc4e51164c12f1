//! Mobility Predict core: a variable-order finite-context Markov
//! predictor over 16-bit mobility-trace symbols.
//!
//! A trace pairs each visit as (start-time, location) codes. Training grows
//! a prediction suffix trie of every context up to a configured order, with
//! per-context symbol counts kept in ranked order. Evaluation either ranks
//! the likely successors of a query context ([`Model::predict_next`]) or
//! measures the average log-loss of a held-out stream under the trained
//! model ([`Model::compute_logloss`]), escape-by-escape, exactly as an
//! arithmetic coder would pay for it.
//!
//! The crate splits along that line:
//!
//! - [`buffer`], [`trie`], [`exclusion`], [`model`], [`predictor`]: the
//!   model core; no I/O, one [`model::Model`] aggregate threaded through
//!   every call.
//! - [`driver`], [`report`], [`stats`]: the evaluation adapter, covering
//!   stream framing, WHERE/WHEN reordering, accounting, and the XML run
//!   report.

pub mod buffer;
pub mod config;
pub mod driver;
pub mod exclusion;
pub mod model;
pub mod predictor;
pub mod report;
pub mod stats;
pub mod trie;

pub use buffer::SymbolBuffer;
pub use config::{ModelConfig, MAXIMUM_SCALE, MAX_PREDICTIONS, MAX_STRING_LENGTH};
pub use model::{Interval, Model, ModelError};
pub use predictor::{PredictedSymbol, Prediction};
