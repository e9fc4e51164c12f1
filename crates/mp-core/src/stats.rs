//! Trie-shape reporting: how bushy did the trained model get.
//!
//! The research-question switch decides which branches count. Answering
//! WHEN means location-keyed children carry the predictions; answering
//! WHERE means start-time-keyed children do. Branches of the other kind are
//! the same trie seen from the opposite question and are left out of the
//! survey.

use mp_common::{ResearchQuestion, SymbolKind};
use mp_math::{summarize, Summary};

use crate::model::Model;
use crate::trie::NodeId;

/// Child-count survey of a trained trie.
#[derive(Debug, Clone)]
pub struct TrieShape {
    /// Number of entries in the order-0 table.
    pub root_children: usize,
    /// Per-table child counts for every surveyed table below the root.
    pub child_counts: Vec<u32>,
    pub summary: Option<Summary>,
}

/// Survey the trie under the root, descending only branches relevant to
/// `question`.
pub fn survey(model: &Model, question: ResearchQuestion) -> TrieShape {
    let mut child_counts = Vec::new();
    walk(model, question, model.trie().root(), 0, &mut child_counts);
    let summary = summarize(&child_counts);
    TrieShape {
        root_children: model.trie().node(model.trie().root()).arity(),
        child_counts,
        summary,
    }
}

fn walk(
    model: &Model,
    question: ResearchQuestion,
    id: NodeId,
    depth: usize,
    child_counts: &mut Vec<u32>,
) {
    let node = model.trie().node(id);
    if node.is_empty() {
        return;
    }
    if depth > 0 {
        child_counts.push(node.arity() as u32);
    }
    if depth >= model.max_order() {
        return;
    }
    let ranges = &model.config().ranges;
    for (i, entry) in node.stats().iter().enumerate() {
        let kind = ranges.kind_of(entry.symbol);
        let relevant = match question {
            ResearchQuestion::When => kind == SymbolKind::Location,
            ResearchQuestion::Where => kind == SymbolKind::StartTime,
        };
        if relevant {
            if let Some(child) = node.child(i) {
                walk(model, question, child, depth + 1, child_counts);
            }
        }
    }
}

/// Indented symbol/count listing of the whole trie, for eyeballing small
/// models at trace verbosity.
pub fn dump(model: &Model) -> String {
    let mut out = String::new();
    dump_table(model, model.trie().root(), 0, &mut out);
    out
}

fn dump_table(model: &Model, id: NodeId, depth: usize, out: &mut String) {
    let node = model.trie().node(id);
    for (i, entry) in node.stats().iter().enumerate() {
        for _ in 0..depth {
            out.push('\t');
        }
        out.push_str(&format!(
            "Symbol: {:#06x}, counts: {}\n",
            entry.symbol as u16, entry.count
        ));
        if depth < model.max_order() {
            if let Some(child) = node.child(i) {
                dump_table(model, child, depth + 1, out);
            }
        }
    }
}
