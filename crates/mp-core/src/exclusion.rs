//! Per-symbol scratch state: the exclusion scoreboard and cumulative totals.
//!
//! While one symbol is being coded, every context table consulted marks the
//! symbols it accounted for; lower-order tables then subtract those counts
//! from their own totals. The scoreboard is that marking, cleared between
//! symbols. The totals buffer is the cumulative-count array rebuilt for each
//! table consulted, with the dynamic escape count in slot 0.

use mp_common::{Symbol, SymbolWindow};

use crate::config::MAXIMUM_SCALE;
use crate::trie::Node;

/// Bitmap of symbols already accounted for in a higher-order context.
pub struct Scoreboard {
    window: SymbolWindow,
    marked: Vec<bool>,
}

impl Scoreboard {
    pub fn new(window: SymbolWindow) -> Self {
        Self {
            window,
            marked: vec![false; window.len()],
        }
    }

    pub fn clear(&mut self) {
        self.marked.fill(false);
    }

    /// Mark a symbol as accounted for. Symbols outside the alphabet window
    /// (bootstrap zeros, control sentinels) are ignored.
    pub fn mark(&mut self, symbol: Symbol) {
        if let Some(i) = self.window.index_of(symbol) {
            self.marked[i] = true;
        }
    }

    pub fn is_marked(&self, symbol: Symbol) -> bool {
        self.window
            .index_of(symbol)
            .map(|i| self.marked[i])
            .unwrap_or(false)
    }
}

/// Cumulative totals for one table, escape count in slot 0.
///
/// After [`TotalsBuffer::build`], slot `i + 1` minus slot `i + 2` is the
/// effective (post-exclusion) count of stat entry `i`, slot 1 is the sum of
/// all effective counts, and slot 0 adds the escape count on top.
#[derive(Default)]
pub struct TotalsBuffer {
    totals: Vec<u32>,
}

impl TotalsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the totals for `node` at `order`.
    ///
    /// Exclusion applies at every order except -2 (the control table plays
    /// by itself). The escape count is the additive rule: the sum of the
    /// effective counts plus the table's highest index, plus one at nonzero
    /// orders. If the grand total reaches [`MAXIMUM_SCALE`], the node is
    /// rescaled and the pass rerun. Finally every nonzero entry scanned
    /// here is marked on the scoreboard.
    pub fn build(&mut self, node: &mut Node, order: i32, scoreboard: &mut Scoreboard) {
        loop {
            let arity = node.arity();
            self.totals.clear();
            self.totals.resize(arity + 2, 0);
            let mut max = 0u32;
            for j in (1..=arity).rev() {
                let entry = node.stats()[j - 1];
                self.totals[j] = self.totals[j + 1];
                if entry.count > 0 && (order == -2 || !scoreboard.is_marked(entry.symbol)) {
                    self.totals[j] += entry.count;
                }
                if entry.count > max {
                    max = entry.count;
                }
            }
            if max == 0 {
                // Nothing usable in this table: escape is the only event.
                self.totals[0] = 1;
            } else {
                let max_index = (arity - 1) as u32;
                self.totals[0] = self.totals[1] + max_index + if order == 0 { 0 } else { 1 };
            }
            if self.totals[0] < MAXIMUM_SCALE {
                break;
            }
            node.rescale();
        }
        for entry in node.stats() {
            if entry.count != 0 {
                scoreboard.mark(entry.symbol);
            }
        }
    }

    /// Cumulative value at slot `i`.
    pub fn get(&self, i: usize) -> u32 {
        self.totals[i]
    }

    /// Grand total including escape; the coding interval denominator.
    pub fn scale(&self) -> u32 {
        self.totals[0]
    }
}
