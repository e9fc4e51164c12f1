//! Training and test consumption.
//!
//! These drivers feed raw little-endian symbol streams into the model and
//! account for prediction outcomes. The WHEN question needs its input
//! reordered: trace files pair each visit as (time, location), but asking
//! "when will the subject be at location l" wants the location in the
//! context and the time as the predicted symbol, so pairs are swapped both
//! during training and (by transposition) in the test buffer.

use std::io::{ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;
use tracing::{debug, warn};

use mp_common::{ResearchQuestion, Symbol, SymbolKind};

use crate::buffer::SymbolBuffer;
use crate::config::MAX_STRING_LENGTH;
use crate::model::{Model, ModelError};
use crate::predictor::Prediction;

/// Errors from the stream drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("symbol stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// What a training pass consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainOutcome {
    /// Symbols fed into the model.
    pub trained: usize,
    /// Out-of-alphabet symbols dropped with a warning.
    pub skipped: usize,
}

/// Aggregate prediction accounting across one test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalCounters {
    pub num_tests: usize,
    /// Queries answered from order 0 because no deeper context matched.
    pub fallback_num: usize,
    pub fallback_num_correct: usize,
    /// Hits among the top (tied-for-best) predictions.
    pub most_prob_num_correct: usize,
    /// Queries where more than one prediction tied for best.
    pub most_prob_multiple: usize,
    /// Hits among the remaining, less probable predictions.
    pub less_prob_num_correct: usize,
    /// Queries with more than one less-probable prediction.
    pub less_prob_multiple: usize,
    /// Hits within the confidence-accepted prefix (confidence runs only).
    pub confidence_num_correct: usize,
}

/// Per-query ranking sizes, for the prediction-count side file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCounts {
    /// Predictions tied for the best count.
    pub best: usize,
    /// Remaining predictions.
    pub less: usize,
    /// Entries accepted by the confidence rule, when one was in force.
    pub accepted: Option<usize>,
    pub total: usize,
}

/// Result of one prediction evaluation run.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub counters: EvalCounters,
    pub per_query: Vec<QueryCounts>,
}

fn read_symbol<R: Read>(reader: &mut R) -> Result<Option<Symbol>, DriverError> {
    match reader.read_i16::<LittleEndian>() {
        Ok(symbol) => Ok(Some(symbol)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Train the model from a raw symbol stream until EOF.
///
/// WHERE feeds symbols in stream order. WHEN reads (time, location) pairs
/// and feeds each as location first, time second. Every fed symbol goes
/// through the same reset/update/advance sequence; symbols outside the
/// model alphabet are dropped (WHEN drops the whole pair, keeping the
/// pairing intact).
pub fn train_model<R: Read>(
    model: &mut Model,
    reader: &mut R,
    question: ResearchQuestion,
) -> Result<TrainOutcome, DriverError> {
    let mut outcome = TrainOutcome::default();
    let alphabet = model.config().alphabet;
    match question {
        ResearchQuestion::Where => {
            while let Some(symbol) = read_symbol(reader)? {
                if !alphabet.contains(symbol) {
                    warn!(
                        "skipping out-of-alphabet training symbol {:#06x}",
                        symbol as u16
                    );
                    outcome.skipped += 1;
                    continue;
                }
                model.clear_current_order();
                model.update(symbol)?;
                model.add_character(symbol)?;
                outcome.trained += 1;
            }
        }
        ResearchQuestion::When => loop {
            let Some(time) = read_symbol(reader)? else {
                break;
            };
            let Some(location) = read_symbol(reader)? else {
                warn!("training stream ends mid-pair; final symbol dropped");
                break;
            };
            if !alphabet.contains(time) || !alphabet.contains(location) {
                warn!(
                    "skipping training pair ({:#06x}, {:#06x}) with out-of-alphabet symbol",
                    time as u16, location as u16
                );
                outcome.skipped += 2;
                continue;
            }
            model.clear_current_order();
            model.update(location)?;
            model.add_character(location)?;
            model.clear_current_order();
            model.update(time)?;
            model.add_character(time)?;
            outcome.trained += 2;
        },
    }
    Ok(outcome)
}

/// Read a whole test stream into a buffer.
pub fn read_test_buffer<R: Read>(reader: &mut R) -> Result<SymbolBuffer, DriverError> {
    let mut buffer = SymbolBuffer::new(MAX_STRING_LENGTH);
    let n = buffer.read_from_stream(reader)?;
    if n == MAX_STRING_LENGTH {
        warn!("test stream may exceed {MAX_STRING_LENGTH} symbols and was truncated");
    }
    Ok(buffer)
}

/// Swap each adjacent even/odd pair in place: (t, l) becomes (l, t).
pub fn transpose_pairs(buffer: &mut SymbolBuffer) {
    let mut i = 1;
    while i < buffer.len() {
        let even = buffer.get(i - 1);
        let odd = buffer.get(i);
        buffer.put(i - 1, odd);
        buffer.put(i, even);
        i += 2;
    }
}

/// Run ranked predictions over a test buffer.
///
/// Queries every other position starting at `max_order`, each with the
/// preceding `max_order` symbols as context; a WHEN run transposes the
/// buffer first. `confidence` (0..=100, WHEN runs only) switches
/// correctness accounting to the confidence-accepted prefix of the
/// ranking.
pub fn evaluate(
    model: &mut Model,
    test: &mut SymbolBuffer,
    question: ResearchQuestion,
    confidence: Option<u8>,
) -> Result<Evaluation, DriverError> {
    if question == ResearchQuestion::When {
        transpose_pairs(test);
    }
    let k = model.max_order();
    let mut ctx = SymbolBuffer::new(k);
    let mut eval = Evaluation::default();

    let mut i = k;
    while i < test.len() {
        ctx.copy_slice(test, i - k, k);
        let prediction = model.predict_next(&mut ctx)?;
        let correct = test.get(i);
        let context_symbol = if i > 0 { Some(test.get(i - 1)) } else { None };
        analyze_prediction(
            model,
            &prediction,
            correct,
            context_symbol,
            question,
            confidence,
            &mut eval,
        );
        eval.counters.num_tests += 1;
        i += 2;
    }
    Ok(eval)
}

/// Score one query's ranking against the true symbol.
fn analyze_prediction(
    model: &Model,
    prediction: &Prediction,
    correct: Symbol,
    context_symbol: Option<Symbol>,
    question: ResearchQuestion,
    confidence: Option<u8>,
    eval: &mut Evaluation,
) {
    let n = prediction.num_predictions();
    log_prediction_rows(model, prediction, correct, context_symbol, question);
    if n == 0 {
        return;
    }

    // A depth-0 answer means the model fell all the way back; score it
    // separately and keep it out of the ranked-bucket stats.
    if prediction.depth == 0 {
        eval.counters.fallback_num += 1;
        for entry in &prediction.symbols[1..] {
            if entry.symbol == correct {
                eval.counters.fallback_num_correct += 1;
                break;
            }
        }
        return;
    }

    let best_count = prediction.symbols[0].numerator;
    let mut index_last_best = 0;
    let mut best = 1;
    let mut less = 0;
    let mut multiple_best = false;
    let mut multiple_less = false;
    for j in 1..n {
        if prediction.symbols[j].numerator == best_count {
            multiple_best = true;
            index_last_best = j;
            best += 1;
        } else {
            if j > index_last_best + 1 {
                multiple_less = true;
            }
            less += 1;
        }
    }
    if multiple_best {
        eval.counters.most_prob_multiple += 1;
    }
    if multiple_less {
        eval.counters.less_prob_multiple += 1;
    }

    // The confidence rule only applies to WHEN runs.
    let confidence_level = match (confidence, question) {
        (Some(level), ResearchQuestion::When) => Some(level),
        _ => None,
    };
    if let Some(level) = confidence_level {
        // Accept the smallest top-of-ranking prefix whose cumulative
        // probability reaches the confidence level, then extend it across
        // any numerator tie with the last accepted entry.
        let level = f64::from(level) / 100.0;
        let mut sum = 0.0;
        let mut previous_numerator = 0u32;
        let mut accepted = 0;
        for j in 0..n {
            let numerator = prediction.symbols[j].numerator;
            if numerator == previous_numerator || sum <= level {
                if prediction.symbols[j].symbol == correct {
                    eval.counters.confidence_num_correct += 1;
                }
            }
            sum += prediction.probability(j);
            accepted = j + 1;
            if sum > level && numerator != previous_numerator {
                break;
            }
            previous_numerator = numerator;
        }
        eval.per_query.push(QueryCounts {
            best,
            less,
            accepted: Some(accepted),
            total: n,
        });
    } else {
        eval.per_query.push(QueryCounts {
            best,
            less,
            accepted: None,
            total: n,
        });
        for entry in &prediction.symbols[..=index_last_best] {
            if entry.symbol == correct {
                eval.counters.most_prob_num_correct += 1;
                break;
            }
        }
        for entry in &prediction.symbols[index_last_best + 1..] {
            if entry.symbol == correct {
                eval.counters.less_prob_num_correct += 1;
                break;
            }
        }
    }
}

fn log_prediction_rows(
    model: &Model,
    prediction: &Prediction,
    correct: Symbol,
    context_symbol: Option<Symbol>,
    question: ResearchQuestion,
) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for (j, entry) in prediction.symbols.iter().enumerate() {
        if question == ResearchQuestion::When
            && prediction.depth == 0
            && model.config().ranges.kind_of(entry.symbol) == SymbolKind::Location
        {
            // A depth-0 WHEN answer can surface locations; they are not
            // time predictions, so leave them out of the rows.
            continue;
        }
        let context = match context_symbol {
            Some(symbol) => format!("{:#06x}", symbol as u16),
            None => "-".to_string(),
        };
        debug!(
            "prediction: {context}, {:#06x}, {:#06x}, {}, {}, {:.6}, {}",
            correct as u16,
            entry.symbol as u16,
            prediction.num_predictions(),
            prediction.depth,
            prediction.probability(j),
            if entry.symbol == correct { "CORRECT" } else { "--" }
        );
    }
}
