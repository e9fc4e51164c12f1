//! Log-domain helpers for prequential log-loss.
//!
//! Per-symbol probabilities arrive as numerator/denominator ratios (products
//! of coding intervals). Losses are accumulated as base-10 logarithms and
//! converted to bits at the end, so one pass over a long test stream never
//! multiplies itself into underflow.

/// log10(2), the base-10 / base-2 conversion factor.
pub const LOG10_2: f64 = 0.301_029_995_663_981_2;

/// Base-2 logarithm of `numerator / denominator`.
///
/// Returns `NEG_INFINITY` for a zero numerator and `NAN` when either side is
/// negative or the denominator is zero.
pub fn log2_ratio(numerator: f64, denominator: f64) -> f64 {
    if numerator.is_nan() || denominator.is_nan() {
        return f64::NAN;
    }
    if numerator < 0.0 || denominator <= 0.0 {
        return f64::NAN;
    }
    if numerator == 0.0 {
        return f64::NEG_INFINITY;
    }
    (numerator / denominator).log10() / LOG10_2
}

/// Accumulates per-symbol probability ratios and reports the average
/// log-loss in bits.
#[derive(Debug, Clone, Default)]
pub struct RatioAccumulator {
    sum_log10: f64,
    scored: usize,
}

impl RatioAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scored symbol's probability ratio.
    ///
    /// Returns the symbol's own log2 probability for diagnostics.
    pub fn observe(&mut self, numerator: f64, denominator: f64) -> f64 {
        let log10 = if numerator > 0.0 && denominator > 0.0 {
            (numerator / denominator).log10()
        } else {
            f64::NEG_INFINITY
        };
        self.sum_log10 += log10;
        self.scored += 1;
        log10 / LOG10_2
    }

    /// Number of symbols scored so far.
    pub fn scored(&self) -> usize {
        self.scored
    }

    /// Negated mean log2 probability over the scored symbols.
    ///
    /// `None` when nothing has been scored; the average of zero symbols is
    /// not zero loss.
    pub fn average_log2_loss(&self) -> Option<f64> {
        if self.scored == 0 {
            return None;
        }
        Some(-(self.sum_log10 / LOG10_2) / self.scored as f64)
    }
}
