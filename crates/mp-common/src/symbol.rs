//! Trace symbols and their classification.
//!
//! A mobility trace is a stream of signed 16-bit symbols. Positive values
//! are alphabet symbols; the value windows below partition the alphabet into
//! start-time, duration, and location codes (the "binbox" layout, one code
//! per one-minute slot or access point). Negative values are in-band
//! sentinels that only ever travel between the model and its caller; they
//! never appear in trace files.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A single trace symbol.
pub type Symbol = i16;

/// End-of-stream sentinel (API boundary only, never on disk).
pub const DONE: Symbol = -1;

/// Model-flush sentinel (API boundary only, never on disk).
pub const FLUSH: Symbol = -2;

/// Escape marker used in interval diagnostics.
pub const ESCAPE: Symbol = -3;

/// An inclusive window of symbol values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolWindow {
    pub lowest: Symbol,
    pub highest: Symbol,
}

impl SymbolWindow {
    pub const fn new(lowest: Symbol, highest: Symbol) -> Self {
        Self { lowest, highest }
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        symbol >= self.lowest && symbol <= self.highest
    }

    /// Number of symbol values in the window.
    pub fn len(&self) -> usize {
        if self.highest < self.lowest {
            0
        } else {
            (self.highest as i32 - self.lowest as i32 + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-based offset of `symbol` within the window.
    pub fn index_of(&self, symbol: Symbol) -> Option<usize> {
        if self.contains(symbol) {
            Some((symbol as i32 - self.lowest as i32) as usize)
        } else {
            None
        }
    }

    /// Iterate every symbol value in the window, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> {
        (self.lowest as i32..=self.highest as i32).map(|v| v as Symbol)
    }
}

/// What a symbol encodes, as a pure function of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// An access-point / location code.
    Location,
    /// A visit start-time code.
    StartTime,
    /// A visit duration code.
    Duration,
    /// Anything outside the three windows; ignored by evaluation.
    Delimiter,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Location => write!(f, "LOC"),
            SymbolKind::StartTime => write!(f, "STRT"),
            SymbolKind::Duration => write!(f, "DUR"),
            SymbolKind::Delimiter => write!(f, "DELIM"),
        }
    }
}

/// The three value windows that give symbols their kind.
///
/// Defaults follow the one-minute-threshold binbox layout of the trace
/// generator: locations in `0x2320..=0x25FF`, start times in
/// `0x2620..=0x2DFF`, durations in `0x2220..=0x22FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRanges {
    #[serde(default = "default_start_time_window")]
    pub start_time: SymbolWindow,
    #[serde(default = "default_duration_window")]
    pub duration: SymbolWindow,
    #[serde(default = "default_location_window")]
    pub location: SymbolWindow,
}

fn default_start_time_window() -> SymbolWindow {
    SymbolWindow::new(0x2620, 0x2DFF)
}

fn default_duration_window() -> SymbolWindow {
    SymbolWindow::new(0x2220, 0x22FF)
}

fn default_location_window() -> SymbolWindow {
    SymbolWindow::new(0x2320, 0x25FF)
}

impl Default for SymbolRanges {
    fn default() -> Self {
        Self {
            start_time: default_start_time_window(),
            duration: default_duration_window(),
            location: default_location_window(),
        }
    }
}

impl SymbolRanges {
    pub fn kind_of(&self, symbol: Symbol) -> SymbolKind {
        if self.start_time.contains(symbol) {
            SymbolKind::StartTime
        } else if self.duration.contains(symbol) {
            SymbolKind::Duration
        } else if self.location.contains(symbol) {
            SymbolKind::Location
        } else {
            SymbolKind::Delimiter
        }
    }
}

/// Which question an evaluation run answers.
///
/// WHERE asks "where will the subject be at time t" (time codes form the
/// context, locations are predicted). WHEN asks "when will the subject be at
/// location l" and requires the time/location pairs to be swapped before
/// they reach the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ResearchQuestion {
    Where,
    When,
}

impl Default for ResearchQuestion {
    fn default() -> Self {
        ResearchQuestion::Where
    }
}

impl std::fmt::Display for ResearchQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchQuestion::Where => write!(f, "WHERE"),
            ResearchQuestion::When => write!(f, "WHEN"),
        }
    }
}
