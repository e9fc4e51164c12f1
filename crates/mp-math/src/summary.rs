//! Summary statistics over integer samples.
//!
//! Used to describe the shape of a trained context trie: the samples are
//! per-table child counts, the report wants max/min/mean/stddev/median.

use serde::Serialize;

/// Five-number-ish summary of a sample set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub median: f64,
}

/// Summarize a sample set; `None` when empty.
pub fn summarize(samples: &[u32]) -> Option<Summary> {
    if samples.is_empty() {
        return None;
    }
    let count = samples.len();
    let min = *samples.iter().min().expect("non-empty");
    let max = *samples.iter().max().expect("non-empty");

    let total: f64 = samples.iter().map(|&v| v as f64).sum();
    let mean = total / count as f64;

    let variance: f64 = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64;
    let std_dev = variance.sqrt();

    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let median = if count % 2 == 1 {
        sorted[count / 2] as f64
    } else {
        (sorted[count / 2 - 1] as f64 + sorted[count / 2] as f64) / 2.0
    };

    Some(Summary {
        count,
        min,
        max,
        mean,
        std_dev,
        median,
    })
}
