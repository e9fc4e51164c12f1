//! Shared types for Mobility Predict.
//!
//! Everything that both the model core and the evaluation drivers need to
//! agree on lives here: the 16-bit trace symbol, the in-band sentinels, the
//! symbol-kind windows, the research-question switch, and the unified
//! adapter error with its stable exit-code mapping.

pub mod error;
pub mod symbol;

pub use error::{Error, Result};
pub use symbol::{
    ResearchQuestion, Symbol, SymbolKind, SymbolRanges, SymbolWindow, DONE, ESCAPE, FLUSH,
};
