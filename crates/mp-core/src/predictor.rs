//! Ranked prediction and log-loss evaluation.
//!
//! Prediction is a pure relative-frequency ranking within the deepest
//! context that matches the query: no escape mass is returned, so each
//! entry's `numerator / denominator` is a lower bound on the true
//! conditional probability. Ties in the counts show up as a contiguous
//! equiprobable prefix of the ranking.
//!
//! Log-loss walks a test stream prequentially through the full coding
//! machinery (escapes, exclusion, the null-table fallback) and reports
//! the negated mean log2 probability per scored symbol.

use tracing::trace;

use mp_common::Symbol;
use mp_math::RatioAccumulator;

use crate::buffer::SymbolBuffer;
use crate::config::MAX_PREDICTIONS;
use crate::model::{Interval, Model, ModelError};

/// One ranked prediction entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictedSymbol {
    pub symbol: Symbol,
    /// Count of the symbol in the matched context; the probability
    /// numerator.
    pub numerator: u32,
}

/// The ranked result of one query.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Context order the ranking was made at.
    pub depth: i32,
    /// Sum of all counts in the matched table.
    pub denominator: u64,
    /// Count-ordered entries, most probable first, capped at
    /// [`MAX_PREDICTIONS`].
    pub symbols: Vec<PredictedSymbol>,
}

impl Prediction {
    pub fn num_predictions(&self) -> usize {
        self.symbols.len()
    }

    /// The most probable entry, if the table had any statistics at all.
    pub fn top(&self) -> Option<&PredictedSymbol> {
        self.symbols.first()
    }

    /// Probability of entry `index`.
    pub fn probability(&self, index: usize) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.symbols[index].numerator as f64 / self.denominator as f64
    }
}

impl Model {
    /// Rank the likely successors of `context`.
    ///
    /// The context buffer is shortened in place to whatever suffix actually
    /// matched. A query that matches nothing ranks from the order-0 table;
    /// prediction never answers from the uniform null table.
    pub fn predict_next(&mut self, context: &mut SymbolBuffer) -> Result<Prediction, ModelError> {
        self.traverse_context(context)?;
        if self.current_order < 0 {
            self.current_order = 0;
        }
        let node = self.trie.node(self.trie.current_at(self.current_order));
        let take = node.arity().min(MAX_PREDICTIONS);
        let mut symbols = Vec::with_capacity(take);
        let mut denominator = 0u64;
        for (i, entry) in node.stats().iter().enumerate() {
            if i < take {
                symbols.push(PredictedSymbol {
                    symbol: entry.symbol,
                    numerator: entry.count,
                });
            }
            denominator += entry.count as u64;
        }
        Ok(Prediction {
            depth: self.current_order,
            denominator,
            symbols,
        })
    }

    /// Probability of `symbol` following `context`.
    ///
    /// Falls back one leading symbol at a time to the deepest context where
    /// the symbol has a nonzero count, and finally to the uniform null
    /// table. A symbol unknown even there gets probability 0. Escape mass
    /// is not included in the denominator.
    pub fn probability(
        &mut self,
        symbol: Symbol,
        context: &mut SymbolBuffer,
    ) -> Result<f64, ModelError> {
        if self.current_order < 0 {
            self.current_order = 0;
        }
        loop {
            if self.current_order >= 0 {
                self.traverse_context(context)?;
            }
            let node = self.trie.node(self.trie.current_at(self.current_order));
            if let Some(i) = node.find(symbol).filter(|&i| node.stats()[i].count > 0) {
                let numerator = node.stats()[i].count as f64;
                return Ok(numerator / node.total_count() as f64);
            }
            if self.current_order > 0 {
                context.shift_left();
            } else if self.current_order == 0 {
                self.current_order = -1;
            } else {
                return Ok(0.0);
            }
        }
    }

    /// Average log-loss (bits per symbol) of `test` under the trained model.
    ///
    /// Each position is coded in its trailing context of up to `max_order`
    /// symbols; escapes multiply further intervals into the symbol's
    /// probability until the symbol resolves or the context cannot shrink
    /// any more. The mean is over the symbols actually scored.
    pub fn compute_logloss(&mut self, test: &SymbolBuffer) -> Result<f64, ModelError> {
        let k = self.config.max_order;
        let mut ctx = SymbolBuffer::new(k);
        let mut acc = RatioAccumulator::new();
        for i in 0..test.len() {
            let n = i.min(k);
            ctx.copy_slice(test, i - n, n);
            let mut numerator = 1.0f64;
            let mut denominator = 1.0f64;
            self.clear_scoreboard();
            loop {
                self.traverse_context(&mut ctx)?;
                let mut interval = Interval::default();
                let escaped = self.symbol_to_interval(test.get(i), &mut interval)?;
                numerator *= interval.width() as f64;
                denominator *= interval.scale as f64;
                if !escaped {
                    break;
                }
                if ctx.len() <= 1 {
                    break;
                }
                ctx.shift_left();
            }
            let log2_prob = acc.observe(numerator, denominator);
            trace!(position = i, log2_prob, "scored test symbol");
        }
        Ok(acc.average_log2_loss().unwrap_or(0.0))
    }
}
