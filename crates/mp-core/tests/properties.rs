//! Property tests over arbitrary training streams: the structural
//! invariants of the trie must survive any input.

use proptest::prelude::*;

use mp_common::{Symbol, SymbolWindow};
use mp_core::config::{ModelConfig, MAXIMUM_SCALE};
use mp_core::model::Model;

fn config(max_order: usize) -> ModelConfig {
    ModelConfig {
        max_order,
        alphabet: SymbolWindow::new(0x0100, 0x0107),
        ..ModelConfig::default()
    }
}

fn trained(max_order: usize, stream: &[Symbol]) -> Model {
    let mut model = Model::new(config(max_order)).unwrap();
    for &symbol in stream {
        model.clear_current_order();
        model.update(symbol).unwrap();
        model.add_character(symbol).unwrap();
    }
    model
}

fn stream_strategy() -> impl Strategy<Value = Vec<Symbol>> {
    prop::collection::vec(0x0100i16..0x0108, 0..80)
}

proptest! {
    /// Stat entries are non-increasing in count at every node.
    #[test]
    fn counts_stay_sorted(stream in stream_strategy(), k in 0usize..4) {
        let model = trained(k, &stream);
        for id in model.trie().node_ids() {
            let node = model.trie().node(id);
            for pair in node.stats().windows(2) {
                prop_assert!(
                    pair[0].count >= pair[1].count,
                    "unsorted stats after training"
                );
            }
        }
    }

    /// Count sums always leave room for the dynamic escape count.
    #[test]
    fn totals_leave_escape_slack(stream in stream_strategy(), k in 0usize..4) {
        let model = trained(k, &stream);
        for id in model.trie().node_ids() {
            let node = model.trie().node(id);
            if id == model.trie().null_table() || id == model.trie().control_table() {
                continue;
            }
            prop_assert!(
                node.total_count() + node.arity() as u64 + 1 <= MAXIMUM_SCALE as u64
            );
        }
    }

    /// Every child's suffix link points where the parent's suffix link
    /// leads: child(N, s).lesser == child(N.lesser, s), or the root when N
    /// is the root.
    #[test]
    fn suffix_links_commute_with_children(stream in stream_strategy(), k in 0usize..4) {
        let model = trained(k, &stream);
        let trie = model.trie();
        for id in trie.node_ids() {
            if id == trie.null_table() || id == trie.control_table() {
                continue;
            }
            let node = trie.node(id);
            for (i, entry) in node.stats().iter().enumerate() {
                let Some(child) = node.child(i) else { continue };
                let child_lesser = trie.node(child).lesser();
                if id == trie.root() {
                    prop_assert_eq!(child_lesser, trie.root());
                } else {
                    let lesser = trie.node(node.lesser());
                    let j = lesser.find(entry.symbol);
                    prop_assert!(j.is_some(), "suffix context missing the symbol");
                    prop_assert_eq!(lesser.child(j.unwrap()), Some(child_lesser));
                }
            }
        }
    }

    /// After training a stream that repeats itself, traversing the last k
    /// symbols restores full order: every suffix of the tail was seen with
    /// a successor at least once.
    #[test]
    fn traverse_after_training_reaches_full_order(
        stream in prop::collection::vec(0x0100i16..0x0108, 4..40),
        k in 1usize..4,
    ) {
        let doubled: Vec<Symbol> = stream.iter().chain(stream.iter()).copied().collect();
        let mut model = trained(k, &doubled);
        let tail = &doubled[doubled.len() - k..];
        let mut ctx = mp_core::SymbolBuffer::from_slice(tail);
        model.traverse_context(&mut ctx).unwrap();
        prop_assert_eq!(model.current_order(), k as i32);
    }

    /// Probabilities from the ranked prediction are a distribution bound:
    /// numerators never exceed the denominator, and the ranking is sorted.
    #[test]
    fn predictions_are_ranked_distributions(stream in stream_strategy(), k in 0usize..4) {
        let mut model = trained(k, &stream);
        let n = stream.len().min(k);
        let mut ctx = mp_core::SymbolBuffer::from_slice(&stream[stream.len() - n..]);
        let prediction = model.predict_next(&mut ctx).unwrap();
        let mut previous = u32::MAX;
        let mut numerator_sum = 0u64;
        for entry in &prediction.symbols {
            prop_assert!(entry.numerator <= previous);
            previous = entry.numerator;
            numerator_sum += entry.numerator as u64;
        }
        prop_assert!(numerator_sum <= prediction.denominator || prediction.denominator == 0);
    }

    /// Log-loss of any test stream over the trained alphabet is finite and
    /// non-negative.
    #[test]
    fn logloss_is_finite_and_nonnegative(
        train in stream_strategy(),
        test in stream_strategy(),
        k in 0usize..4,
    ) {
        let mut model = trained(k, &train);
        let test_buffer = mp_core::SymbolBuffer::from_slice(&test);
        let loss = model.compute_logloss(&test_buffer).unwrap();
        prop_assert!(loss.is_finite());
        prop_assert!(loss >= 0.0);
    }
}
