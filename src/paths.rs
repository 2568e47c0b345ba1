//! Reference normalization and suffix-indexed id resolution.
//!
//! Cross-references are written as loose path fragments (`topic`,
//! `notes/topic`, `../notes/topic.md`) and must deterministically map onto
//! node ids. Resolution is longest-path-suffix matching: the candidate id
//! sharing the greatest number of trailing path segments with the reference
//! wins, ties broken by the first candidate in sorted id order. The match is
//! a pure function of `(reference, id set)` so load order never changes the
//! outcome.

use std::collections::BTreeMap;

use crate::codec::strip_doc_extension;
use crate::properties::NodeId;

/// Normalize a raw reference into comparable path segments: relative-path
/// markers are dropped and the managed extension is stripped from the final
/// segment.
pub fn reference_segments(reference: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = reference
        .split('/')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();
    if let Some(last) = segments.last_mut() {
        *last = strip_doc_extension(last);
    }
    segments
}

/// Lookup structure over a fixed id set, keyed by final path segment.
///
/// Any non-zero suffix overlap requires the final segments to be equal, so
/// bucketing by tail segment preserves exact longest-suffix-wins semantics
/// while avoiding a scan of the whole id set per reference.
#[derive(Debug, Default, Clone)]
pub struct SuffixIndex {
    by_tail: BTreeMap<String, Vec<NodeId>>,
}

impl SuffixIndex {
    /// Build an index from an id set. Candidates are held in sorted id order,
    /// which defines the tie-break.
    pub fn from_ids<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        let mut sorted: Vec<&NodeId> = ids.into_iter().collect();
        sorted.sort();
        let mut by_tail: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for id in sorted {
            let segments = id.segments();
            if let Some(tail) = segments.last() {
                by_tail
                    .entry((*tail).to_string())
                    .or_default()
                    .push(id.clone());
            }
        }
        SuffixIndex { by_tail }
    }

    /// Resolve a raw reference to a node id, or `None` when no candidate
    /// shares any trailing segments with it.
    pub fn resolve(&self, reference: &str) -> Option<NodeId> {
        let ref_segments = reference_segments(reference);
        let tail = ref_segments.last()?;
        let candidates = self.by_tail.get(*tail)?;

        let mut best: Option<(&NodeId, usize)> = None;
        for candidate in candidates {
            let overlap = trailing_overlap(&ref_segments, &candidate.segments());
            if overlap == 0 {
                continue;
            }
            // Strictly-greater keeps the first listed candidate on ties.
            match best {
                Some((_, best_overlap)) if overlap <= best_overlap => {}
                _ => best = Some((candidate, overlap)),
            }
        }
        best.map(|(id, _)| id.clone())
    }
}

fn trailing_overlap(lhs: &[&str], rhs: &[&str]) -> usize {
    lhs.iter()
        .rev()
        .zip(rhs.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}
