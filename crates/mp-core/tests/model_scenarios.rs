//! End-to-end scenarios for the model core: training, escape fallback,
//! suffix links, rescaling, and log-loss behavior.

use mp_common::{ResearchQuestion, Symbol, SymbolWindow};
use mp_core::config::{ModelConfig, MAXIMUM_SCALE};
use mp_core::driver;
use mp_core::model::{Interval, Model};
use mp_core::SymbolBuffer;

const A: Symbol = 0x3001;
const B: Symbol = 0x3002;
const C: Symbol = 0x3003;
const D: Symbol = 0x3004;
const E: Symbol = 0x3005;

fn config(max_order: usize) -> ModelConfig {
    ModelConfig {
        max_order,
        alphabet: SymbolWindow::new(0x3000, 0x30FF),
        ..ModelConfig::default()
    }
}

fn trained(max_order: usize, stream: &[Symbol]) -> Model {
    let mut model = Model::new(config(max_order)).unwrap();
    train_more(&mut model, stream);
    model
}

fn train_more(model: &mut Model, stream: &[Symbol]) {
    for &symbol in stream {
        model.clear_current_order();
        model.update(symbol).unwrap();
        model.add_character(symbol).unwrap();
    }
}

/// Follow child edges from the root along `context`.
fn node_for_context(model: &Model, context: &[Symbol]) -> mp_core::trie::NodeId {
    let trie = model.trie();
    let mut id = trie.root();
    for &symbol in context {
        let node = trie.node(id);
        let i = node
            .find(symbol)
            .unwrap_or_else(|| panic!("no entry for {symbol:#06x}"));
        id = node
            .child(i)
            .unwrap_or_else(|| panic!("no child for {symbol:#06x}"));
    }
    id
}

#[test]
fn uniform_prediction_from_empty_context() {
    let mut model = trained(0, &[A, B, A, C]);
    let mut ctx = SymbolBuffer::new(0);
    let prediction = model.predict_next(&mut ctx).unwrap();

    assert_eq!(prediction.depth, 0);
    assert_eq!(prediction.denominator, 4);
    assert_eq!(prediction.num_predictions(), 3);
    let ranked: Vec<(Symbol, u32)> = prediction
        .symbols
        .iter()
        .map(|p| (p.symbol, p.numerator))
        .collect();
    assert_eq!(ranked, vec![(A, 2), (B, 1), (C, 1)]);
}

#[test]
fn escape_and_fallback_to_the_null_table() {
    let mut model = trained(2, &[A, B, C, A, B, D]);

    let mut ctx = SymbolBuffer::from_slice(&[A, B]);
    model.clear_scoreboard();
    model.traverse_context(&mut ctx).unwrap();
    assert_eq!(model.current_order(), 2);

    // E is unseen: escapes at orders 2, 1, 0, then the null table answers.
    let mut interval = Interval::default();
    assert!(model.symbol_to_interval(E, &mut interval).unwrap());
    assert_eq!(model.current_order(), 1);
    assert!(model.symbol_to_interval(E, &mut interval).unwrap());
    assert_eq!(model.current_order(), 0);
    assert!(model.symbol_to_interval(E, &mut interval).unwrap());
    assert_eq!(model.current_order(), -1);

    assert!(!model.symbol_to_interval(E, &mut interval).unwrap());
    assert_eq!(interval.width(), 1);
    assert!(interval.low < interval.high);
    assert!(interval.high <= interval.scale);
    assert!(interval.scale <= MAXIMUM_SCALE);
}

#[test]
fn suffix_links_chain_through_shorter_contexts() {
    let model = trained(3, &[A, B, C, D]);
    let trie = model.trie();

    let bcd = node_for_context(&model, &[B, C, D]);
    let cd = node_for_context(&model, &[C, D]);
    let d = node_for_context(&model, &[D]);

    assert_eq!(trie.node(bcd).lesser(), cd);
    assert_eq!(trie.node(cd).lesser(), d);
    assert_eq!(trie.node(d).lesser(), trie.root());
}

#[test]
fn training_position_matches_a_fresh_traversal() {
    let stream = [A, B, C, A, B, C, A, B];
    let mut model = trained(2, &stream);

    let mut ctx = SymbolBuffer::from_slice(&stream[stream.len() - 2..]);
    model.traverse_context(&mut ctx).unwrap();
    assert_eq!(model.current_order(), 2);

    let expected = node_for_context(&model, &stream[stream.len() - 2..]);
    assert_eq!(model.trie().current_at(2), expected);
}

#[test]
fn when_transposition_predicts_the_paired_time() {
    let t = [0x3011, 0x3012, 0x3013];
    let l = [0x3021, 0x3022, 0x3023];
    let mut model = Model::new(config(1)).unwrap();
    // Train WHEN-style: each (t, l) pair arrives swapped as l, t.
    for i in 0..3 {
        train_more(&mut model, &[l[i], t[i]]);
    }

    let mut test = SymbolBuffer::from_slice(&[t[0], l[0], t[1], l[1], t[2], l[2]]);
    driver::transpose_pairs(&mut test);
    assert_eq!(
        test.as_slice(),
        &[l[0], t[0], l[1], t[1], l[2], t[2]]
    );

    let mut ctx = SymbolBuffer::from_slice(&[l[1]]);
    let prediction = model.predict_next(&mut ctx).unwrap();
    assert_eq!(prediction.depth, 1);
    assert_eq!(prediction.top().unwrap().symbol, t[1]);
}

#[test]
fn rescale_fires_on_count_overflow() {
    let mut model = Model::new(config(0)).unwrap();

    // Drive a single count right up to the scale slack.
    for _ in 0..(MAXIMUM_SCALE - 2) as usize {
        model.clear_current_order();
        model.update(A).unwrap();
        model.add_character(A).unwrap();
    }
    let root = model.trie().root();
    assert_eq!(model.trie().node(root).stats()[0].count, MAXIMUM_SCALE - 2);

    // The next update crosses the cap and halves everything.
    model.clear_current_order();
    model.update(A).unwrap();
    assert_eq!(model.trie().node(root).stats()[0].count, MAXIMUM_SCALE / 2);

    for id in model.trie().node_ids() {
        let node = model.trie().node(id);
        if !node.is_leaf() && !node.is_empty() {
            assert!(node.stats()[0].count > 0 || node.total_count() == 0);
        }
    }
}

#[test]
fn logloss_is_finite_and_improves_with_more_training() {
    let stream = [A, B, A, B, A, B, A, B, A, B];
    let test = SymbolBuffer::from_slice(&stream);

    let mut single = trained(1, &stream);
    let loss_single = single.compute_logloss(&test).unwrap();
    assert!(loss_single.is_finite());
    assert!(loss_single > 0.0);

    let doubled: Vec<Symbol> = stream.iter().chain(stream.iter()).copied().collect();
    let mut double = trained(1, &doubled);
    let loss_double = double.compute_logloss(&test).unwrap();
    assert!(
        loss_double < loss_single,
        "doubled training must strictly reduce loss: {loss_single} -> {loss_double}"
    );
}

#[test]
fn where_driver_matches_manual_training() {
    // The WHERE driver must produce the same trie as hand-feeding the
    // stream through the reset/update/advance sequence.
    let stream = [A, B, C, A, B, C];
    let bytes: Vec<u8> = stream.iter().flat_map(|s| s.to_le_bytes()).collect();

    let mut driven = Model::new(config(1)).unwrap();
    driver::train_model(&mut driven, &mut &bytes[..], ResearchQuestion::Where).unwrap();
    let manual = trained(1, &stream);

    assert_eq!(driven.node_count(), manual.node_count());
    let d_root = driven.trie().node(driven.trie().root());
    let m_root = manual.trie().node(manual.trie().root());
    let d_stats: Vec<_> = d_root.stats().to_vec();
    let m_stats: Vec<_> = m_root.stats().to_vec();
    assert_eq!(d_stats, m_stats);
}
