//! Secondary indices over a fact store.
//!
//! Three access paths: span order for range scans, a predicate map for
//! O(1) per-predicate lists, and fixed confidence buckets for threshold
//! queries. The index is rebuilt from the store on demand; it never
//! tracks edits on its own.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::base::Span;
use crate::fact::{Confidence, FactId, FactStore, Predicate};

pub const DEFAULT_BUCKETS: usize = 10;

#[derive(Debug)]
pub struct QueryIndex {
    /// Live facts ordered by subject span start.
    by_span: Vec<(Span, FactId)>,
    /// Insertion-ordered so per-predicate iteration is deterministic.
    by_predicate: IndexMap<Predicate, Vec<FactId>>,
    /// `buckets[i]` holds facts with confidence in `[i/n, (i+1)/n)`,
    /// the last bucket closed at 1.0.
    buckets: Vec<Vec<(FactId, Confidence)>>,
    meta: FxHashMap<FactId, (Span, Confidence)>,
    generation: u32,
}

impl QueryIndex {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(buckets: usize) -> Self {
        let buckets = buckets.max(1);
        Self {
            by_span: Vec::new(),
            by_predicate: IndexMap::new(),
            buckets: vec![Vec::new(); buckets],
            meta: FxHashMap::default(),
            generation: 0,
        }
    }

    /// Store generation this index was built against.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of confidence buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Rebuild all three indices from the store's live facts.
    pub fn build(&mut self, store: &FactStore) {
        self.by_span.clear();
        self.by_predicate.clear();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.meta.clear();

        for fact in store.iter_live() {
            let id = fact.id();
            let span = fact.subject();
            let confidence = fact.confidence();
            self.by_span.push((span, id));
            self.by_predicate
                .entry(fact.predicate())
                .or_default()
                .push(id);
            let bucket = self.bucket_of(confidence);
            self.buckets[bucket].push((id, confidence));
            self.meta.insert(id, (span, confidence));
        }
        self.by_span.sort_by_key(|(span, _)| (span.start, span.end));
        self.generation = store.generation();
    }

    pub fn query_by_predicate(&self, predicate: Predicate) -> &[FactId] {
        self.by_predicate
            .get(&predicate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Facts with confidence in `[lo, hi]`.
    pub fn query_by_confidence(&self, lo: f32, hi: f32) -> Vec<FactId> {
        let lo = Confidence::from_f32(lo);
        let hi = Confidence::from_f32(hi);
        let first = self.bucket_of(lo);
        let last = self.bucket_of(hi);
        let mut ids = Vec::new();
        for bucket in &self.buckets[first..=last] {
            for &(id, confidence) in bucket {
                if confidence >= lo && confidence <= hi {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Facts overlapping `span`, in span order.
    pub fn query_by_span(&self, span: Span) -> Vec<FactId> {
        // Spans are sorted by start; everything starting at or past the
        // query's end can be skipped.
        let cut = self.by_span.partition_point(|(s, _)| s.start < span.end);
        self.by_span[..cut]
            .iter()
            .filter(|(s, _)| s.intersects(span))
            .map(|&(_, id)| id)
            .collect()
    }

    /// Intersection of the per-criterion lists. `None` criteria are
    /// unconstrained; with all three absent this returns every fact.
    pub fn query_complex(
        &self,
        predicate: Option<Predicate>,
        span: Option<Span>,
        min_confidence: Option<f32>,
    ) -> Vec<FactId> {
        let min_confidence = min_confidence.map(Confidence::from_f32);
        let matches = |id: FactId| {
            let Some(&(fact_span, confidence)) = self.meta.get(&id) else {
                return false;
            };
            if let Some(span) = span {
                if !fact_span.intersects(span) {
                    return false;
                }
            }
            if let Some(min) = min_confidence {
                if confidence < min {
                    return false;
                }
            }
            true
        };

        match predicate {
            Some(p) => self
                .query_by_predicate(p)
                .iter()
                .copied()
                .filter(|&id| matches(id))
                .collect(),
            None => self
                .by_span
                .iter()
                .map(|&(_, id)| id)
                .filter(|&id| matches(id))
                .collect(),
        }
    }

    fn bucket_of(&self, confidence: Confidence) -> usize {
        let n = self.buckets.len();
        ((confidence.to_f32() * n as f32) as usize).min(n - 1)
    }
}

impl Default for QueryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Fact, Value};

    fn store_with(facts: &[(u32, Span, Predicate, f32)]) -> FactStore {
        let mut store = FactStore::new();
        for &(id, span, predicate, confidence) in facts {
            store.insert(Fact::new(
                FactId::from_u32(id),
                span,
                predicate,
                Value::none(),
                Confidence::from_f32(confidence),
            ));
        }
        store
    }

    fn built(facts: &[(u32, Span, Predicate, f32)]) -> QueryIndex {
        let mut index = QueryIndex::new();
        index.build(&store_with(facts));
        index
    }

    fn ids(raw: &[u32]) -> Vec<FactId> {
        raw.iter().map(|&r| FactId::from_u32(r)).collect()
    }

    #[test]
    fn test_predicate_lookup() {
        let index = built(&[
            (1, Span::new(0, 10), Predicate::IsFunction, 1.0),
            (2, Span::new(10, 20), Predicate::IsStruct, 1.0),
            (3, Span::new(20, 30), Predicate::IsFunction, 1.0),
        ]);
        assert_eq!(index.query_by_predicate(Predicate::IsFunction), ids(&[1, 3]));
        assert!(index.query_by_predicate(Predicate::HasName).is_empty());
    }

    #[test]
    fn test_confidence_range() {
        let index = built(&[
            (1, Span::new(0, 10), Predicate::IsFunction, 0.95),
            (2, Span::new(10, 20), Predicate::IsFunction, 0.55),
            (3, Span::new(20, 30), Predicate::IsFunction, 0.2),
        ]);
        let mut found = index.query_by_confidence(0.5, 1.0);
        found.sort();
        assert_eq!(found, ids(&[1, 2]));
    }

    #[test]
    fn test_bucket_placement_across_the_range() {
        let index = built(&[
            (1, Span::new(0, 10), Predicate::IsFunction, 0.0),
            (2, Span::new(10, 20), Predicate::IsFunction, 0.55),
            (3, Span::new(20, 30), Predicate::IsFunction, 1.0),
        ]);
        // The endpoints land in the first and last buckets.
        assert_eq!(index.query_by_confidence(0.0, 0.05), ids(&[1]));
        assert_eq!(index.query_by_confidence(0.95, 1.0), ids(&[3]));
        assert_eq!(index.query_by_confidence(0.5, 0.6), ids(&[2]));
    }

    #[test]
    fn test_span_overlap_query() {
        let index = built(&[
            (1, Span::new(0, 10), Predicate::IsFunction, 1.0),
            (2, Span::new(8, 20), Predicate::IsBlock, 1.0),
            (3, Span::new(30, 40), Predicate::IsFunction, 1.0),
        ]);
        assert_eq!(index.query_by_span(Span::new(5, 9)), ids(&[1, 2]));
        assert!(index.query_by_span(Span::new(20, 30)).is_empty());
    }

    #[test]
    fn test_complex_intersection() {
        let index = built(&[
            (1, Span::new(0, 10), Predicate::IsFunction, 0.9),
            (2, Span::new(0, 10), Predicate::IsFunction, 0.4),
            (3, Span::new(50, 60), Predicate::IsFunction, 0.9),
            (4, Span::new(0, 10), Predicate::IsBlock, 0.9),
        ]);
        let found = index.query_complex(
            Some(Predicate::IsFunction),
            Some(Span::new(0, 20)),
            Some(0.5),
        );
        assert_eq!(found, ids(&[1]));
    }

    #[test]
    fn test_rebuild_drops_retired() {
        let mut store = store_with(&[
            (1, Span::new(0, 10), Predicate::IsFunction, 1.0),
            (2, Span::new(10, 20), Predicate::IsFunction, 1.0),
        ]);
        let mut index = QueryIndex::new();
        index.build(&store);
        assert_eq!(index.len(), 2);

        store.retire(FactId::from_u32(1));
        index.build(&store);
        assert_eq!(index.query_by_predicate(Predicate::IsFunction), ids(&[2]));
    }
}
