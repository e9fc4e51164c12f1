//! The model API: training updates, context advancement, and the
//! symbol-to-interval conversion the evaluators are built on.
//!
//! A [`Model`] owns the trie plus all per-symbol scratch state (scoreboard,
//! totals, current order), so callers thread one aggregate through the run
//! and nothing lives in process-wide statics.
//!
//! `current_order` is a small state machine. Training pins it: every
//! [`Model::update`] leaves it at `max_order`. During coding it only moves
//! down: each escape emitted by [`Model::symbol_to_interval`] decrements it,
//! bottoming out at -1 for trace symbols (the uniform null table always
//! matches) or -2 for the FLUSH/DONE sentinels.

use thiserror::Error;

use mp_common::Symbol;

use crate::buffer::SymbolBuffer;
use crate::config::{ModelConfig, MAXIMUM_SCALE};
use crate::exclusion::{Scoreboard, TotalsBuffer};
use crate::trie::ContextTrie;

/// Faults the model core can surface. All of them are caller bugs or
/// resource exhaustion; none are retried.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("context table budget exhausted (limit {limit})")]
    TableBudget { limit: usize },

    #[error("symbol {symbol:#06x} is outside the model alphabet")]
    SymbolOutsideAlphabet { symbol: Symbol },

    #[error("context of {len} symbols exceeds the model order {max_order}")]
    ContextTooLong { len: usize, max_order: usize },

    #[error("escaped past the control table while coding symbol {symbol:#06x}")]
    EscapeExhausted { symbol: Symbol },
}

/// A coding interval: `low..high` out of `scale`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    pub low: u32,
    pub high: u32,
    pub scale: u32,
}

impl Interval {
    /// Probability mass this interval spans.
    pub fn width(&self) -> u32 {
        self.high - self.low
    }
}

/// The variable-order context model.
pub struct Model {
    pub(crate) config: ModelConfig,
    pub(crate) trie: ContextTrie,
    pub(crate) scoreboard: Scoreboard,
    pub(crate) totals: TotalsBuffer,
    pub(crate) current_order: i32,
}

impl Model {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let trie = ContextTrie::new(&config.alphabet, config.max_order, config.max_nodes)?;
        Ok(Self {
            scoreboard: Scoreboard::new(config.alphabet),
            totals: TotalsBuffer::new(),
            current_order: config.max_order as i32,
            trie,
            config,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn max_order(&self) -> usize {
        self.config.max_order
    }

    pub fn current_order(&self) -> i32 {
        self.current_order
    }

    pub fn trie(&self) -> &ContextTrie {
        &self.trie
    }

    /// Number of context tables allocated so far.
    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    /// Reset the coding order to 0; the training drivers do this before
    /// every symbol so the count walk starts at the bottom.
    pub fn clear_current_order(&mut self) {
        self.current_order = 0;
    }

    /// Clear the exclusion scoreboard. Done implicitly by [`Model::update`];
    /// evaluators call it between scored symbols.
    pub fn clear_scoreboard(&mut self) {
        self.scoreboard.clear();
    }

    /// Count `symbol` in the current contexts.
    ///
    /// With update exclusion enabled only the orders that took part in
    /// coding the symbol (current order and up) are credited; otherwise
    /// every order from 0 to k is. Either way the current order is reset to
    /// k and the scoreboard cleared. Sentinels update nothing.
    pub fn update(&mut self, symbol: Symbol) -> Result<(), ModelError> {
        if symbol >= 0 {
            if !self.config.alphabet.contains(symbol) {
                return Err(ModelError::SymbolOutsideAlphabet { symbol });
            }
            let start = if self.config.update_exclusion {
                self.current_order.max(0) as usize
            } else {
                0
            };
            for order in start..=self.config.max_order {
                self.update_table(order, symbol);
            }
        }
        self.current_order = self.config.max_order as i32;
        self.scoreboard.clear();
        Ok(())
    }

    fn update_table(&mut self, order: usize, symbol: Symbol) {
        let leaf = order == self.config.max_order;
        let id = self.trie.current_at(order as i32);
        let node = self.trie.node_mut(id);
        let index = match node.find(symbol) {
            Some(i) => i,
            None => node.push_entry(symbol, !leaf),
        };
        // Move to the front of the equal-count run, then bump: the stats
        // stay sorted by count without ever doing more than one swap.
        let index = node.promote(index);
        node.stats[index].count += 1;
        if node.total_count() + node.arity() as u64 + 1 > MAXIMUM_SCALE as u64 {
            node.rescale();
        }
    }

    /// Advance the current context by one symbol. Sentinels are no-ops.
    pub fn add_character(&mut self, symbol: Symbol) -> Result<(), ModelError> {
        if symbol >= 0 && !self.config.alphabet.contains(symbol) {
            return Err(ModelError::SymbolOutsideAlphabet { symbol });
        }
        self.trie.add_character(symbol)
    }

    /// Convert `symbol` to its coding interval in the current-order table.
    ///
    /// On a hit the interval brackets the symbol's effective count and the
    /// call returns `Ok(false)`. On a miss the escape interval is emitted,
    /// the current order drops by one, and the call returns `Ok(true)` so
    /// the caller retries at the shorter context. A miss in the control
    /// table is unrecoverable.
    pub fn symbol_to_interval(
        &mut self,
        symbol: Symbol,
        interval: &mut Interval,
    ) -> Result<bool, ModelError> {
        let order = self.current_order;
        let id = self.trie.current_at(order);
        let this = &mut *self;
        this.totals
            .build(this.trie.node_mut(id), order, &mut this.scoreboard);
        interval.scale = self.totals.scale();

        // The control table stores its sentinels negated so they can never
        // collide with trace symbols; mirror that on the probe.
        let probe = if order == -2 {
            symbol.wrapping_neg()
        } else {
            symbol
        };
        let node = self.trie.node(id);
        for (i, entry) in node.stats().iter().enumerate() {
            if entry.symbol == probe {
                if entry.count == 0 {
                    break;
                }
                interval.low = self.totals.get(i + 2);
                interval.high = self.totals.get(i + 1);
                return Ok(false);
            }
        }

        if order == -2 {
            return Err(ModelError::EscapeExhausted { symbol });
        }
        interval.low = self.totals.get(1);
        interval.high = self.totals.get(0);
        self.current_order -= 1;
        Ok(true)
    }

    /// Populate only the scale of the current-order table.
    pub fn symbol_scale(&mut self, interval: &mut Interval) {
        let order = self.current_order;
        let id = self.trie.current_at(order);
        let this = &mut *self;
        this.totals
            .build(this.trie.node_mut(id), order, &mut this.scoreboard);
        interval.scale = self.totals.scale();
    }

    /// Position the current contexts on the deepest match for `context`.
    ///
    /// Walks the trie from order 0 along the context symbols. On a miss the
    /// context loses its leading symbol and the walk restarts; when a
    /// single-symbol context still misses, the order lands at -1. The
    /// context buffer is shortened in place so the caller sees what was
    /// actually matched.
    pub fn traverse_context(&mut self, context: &mut SymbolBuffer) -> Result<(), ModelError> {
        if context.len() > self.config.max_order {
            return Err(ModelError::ContextTooLong {
                len: context.len(),
                max_order: self.config.max_order,
            });
        }
        if context.is_empty() {
            self.current_order = 0;
            return Ok(());
        }
        let mut local_order: usize = 0;
        let mut index = 0;
        loop {
            let test = context.get(index);
            let table = self.trie.current_at(local_order as i32);
            let node = self.trie.node(table);
            // A stat entry without a usable child table is as good as a
            // miss: branches near the end of training can be shorter than
            // the full order.
            let hit = node
                .find(test)
                .and_then(|i| node.child(i))
                .filter(|&child| !self.trie.node(child).is_empty());
            match hit {
                None => {
                    if context.len() == 1 {
                        self.current_order = -1;
                        return Ok(());
                    }
                    context.shift_left();
                    index = 0;
                    local_order = 0;
                }
                Some(child) => {
                    index += 1;
                    local_order += 1;
                    self.trie.set_current(local_order as i32, child);
                    if index == context.len() {
                        self.current_order = local_order as i32;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Rescale every table reachable from the root so that recent
    /// statistics dominate the older half.
    pub fn flush(&mut self) {
        self.trie.rescale_all();
    }
}
