//! Append-only fact storage with generation tagging.
//!
//! Facts enter the store tagged with the generation current at insertion
//! time. Edits bump the generation; facts belonging to boundaries that an
//! edit removed are retired explicitly and physically dropped by
//! [`FactStore::compact`]. Facts of untouched boundaries stay live across
//! generations; the tag exists for cache staleness checks, not liveness.

use rustc_hash::FxHashMap;

use crate::fact::{Fact, FactId, Predicate, Value};

/// Hands out fact ids, monotonically.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> FactId {
        let id = FactId::from_u32(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy)]
struct FactMeta {
    generation: u32,
    retired: bool,
}

/// Append-only sequence of facts plus a monotonic generation counter.
#[derive(Debug, Default)]
pub struct FactStore {
    facts: Vec<Fact>,
    meta: Vec<FactMeta>,
    by_id: FxHashMap<FactId, usize>,
    generation: u32,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Bump the generation, returning the new value.
    ///
    /// Called once per edit-driven bulk update.
    pub fn bump_generation(&mut self) -> u32 {
        self.generation += 1;
        self.generation
    }

    /// Append a fact, tagged with the current generation.
    pub fn insert(&mut self, fact: Fact) {
        self.by_id.insert(fact.id(), self.facts.len());
        self.facts.push(fact);
        self.meta.push(FactMeta {
            generation: self.generation,
            retired: false,
        });
    }

    pub fn extend(&mut self, facts: impl IntoIterator<Item = Fact>) {
        for fact in facts {
            self.insert(fact);
        }
    }

    /// Look up a fact by id. Retired facts are still reachable until
    /// the next `compact`.
    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.by_id.get(&id).map(|&idx| &self.facts[idx])
    }

    /// Generation the fact was inserted at.
    pub fn generation_of(&self, id: FactId) -> Option<u32> {
        self.by_id.get(&id).map(|&idx| self.meta[idx].generation)
    }

    /// Mark a fact as retired; it will be dropped by the next `compact`.
    pub fn retire(&mut self, id: FactId) -> bool {
        match self.by_id.get(&id) {
            Some(&idx) => {
                self.meta[idx].retired = true;
                true
            }
            None => false,
        }
    }

    /// Iterate all facts, retired included.
    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    /// Iterate live (non-retired) facts.
    pub fn iter_live(&self) -> impl Iterator<Item = &Fact> {
        self.facts
            .iter()
            .zip(self.meta.iter())
            .filter(|(_, m)| !m.retired)
            .map(|(f, _)| f)
    }

    /// Total fact count, retired included.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Count of live facts.
    pub fn live_len(&self) -> usize {
        self.meta.iter().filter(|m| !m.retired).count()
    }

    /// Physically remove retired facts and rebuild the id index.
    ///
    /// Returns the number of facts dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.facts.len();
        let mut facts = Vec::with_capacity(before);
        let mut meta = Vec::with_capacity(before);
        for (fact, m) in self.facts.drain(..).zip(self.meta.drain(..)) {
            if !m.retired {
                facts.push(fact);
                meta.push(m);
            }
        }
        self.facts = facts;
        self.meta = meta;
        self.by_id.clear();
        for (idx, fact) in self.facts.iter().enumerate() {
            self.by_id.insert(fact.id(), idx);
        }
        before - self.facts.len()
    }

    /// Re-anchor facts after an edit that changed the buffer length by
    /// `delta` bytes at `threshold`.
    ///
    /// Subject spans starting at or past the threshold move by `delta`;
    /// span-valued payloads (parent references) move the same way. Facts
    /// overlapping the edit itself are expected to have been retired
    /// before this is called.
    pub fn shift_spans(&mut self, threshold: u32, delta: i64) {
        if delta == 0 {
            return;
        }
        for fact in &mut self.facts {
            let subject = fact.subject();
            let moved_subject = subject.start >= threshold;
            let object = if fact.predicate() == Predicate::ChildOf {
                let parent = fact.object().as_span();
                (parent.start >= threshold).then(|| Value::span(parent.shifted(delta)))
            } else {
                None
            };
            if moved_subject || object.is_some() {
                *fact = Fact::new(
                    fact.id(),
                    if moved_subject {
                        subject.shifted(delta)
                    } else {
                        subject
                    },
                    fact.predicate(),
                    object.unwrap_or(fact.object()),
                    fact.confidence(),
                );
            }
        }
    }

    /// Drop everything and reset the generation.
    pub fn clear(&mut self) {
        self.facts.clear();
        self.meta.clear();
        self.by_id.clear();
        self.generation = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Span;
    use crate::fact::{Confidence, Predicate, Value};

    fn fact(id: u32) -> Fact {
        Fact::new(
            FactId::from_u32(id),
            Span::new(0, 10),
            Predicate::IsFunction,
            Value::none(),
            Confidence::FULL,
        )
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = FactStore::new();
        store.insert(fact(1));
        assert_eq!(store.get(FactId::from_u32(1)).unwrap().id().to_u32(), 1);
        assert!(store.get(FactId::from_u32(2)).is_none());
    }

    #[test]
    fn test_generation_tagging() {
        let mut store = FactStore::new();
        store.insert(fact(1));
        store.bump_generation();
        store.insert(fact(2));
        assert_eq!(store.generation_of(FactId::from_u32(1)), Some(0));
        assert_eq!(store.generation_of(FactId::from_u32(2)), Some(1));
    }

    #[test]
    fn test_retire_and_compact() {
        let mut store = FactStore::new();
        store.insert(fact(1));
        store.insert(fact(2));
        store.insert(fact(3));
        assert!(store.retire(FactId::from_u32(2)));
        assert_eq!(store.live_len(), 2);
        assert_eq!(store.len(), 3);

        let dropped = store.compact();
        assert_eq!(dropped, 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(FactId::from_u32(2)).is_none());
        // Survivors remain addressable after the index rebuild.
        assert!(store.get(FactId::from_u32(1)).is_some());
        assert!(store.get(FactId::from_u32(3)).is_some());
    }

    #[test]
    fn test_iter_live_skips_retired() {
        let mut store = FactStore::new();
        store.insert(fact(1));
        store.insert(fact(2));
        store.retire(FactId::from_u32(1));
        let live: Vec<u32> = store.iter_live().map(|f| f.id().to_u32()).collect();
        assert_eq!(live, vec![2]);
    }

    #[test]
    fn test_shift_spans_moves_only_past_threshold() {
        let mut store = FactStore::new();
        store.insert(Fact::new(
            FactId::from_u32(1),
            Span::new(0, 10),
            Predicate::IsFunction,
            Value::none(),
            Confidence::FULL,
        ));
        store.insert(Fact::new(
            FactId::from_u32(2),
            Span::new(20, 30),
            Predicate::IsFunction,
            Value::none(),
            Confidence::FULL,
        ));
        store.insert(Fact::new(
            FactId::from_u32(3),
            Span::new(22, 28),
            Predicate::ChildOf,
            Value::span(Span::new(20, 30)),
            Confidence::FULL,
        ));
        store.shift_spans(15, 5);

        assert_eq!(store.get(FactId::from_u32(1)).unwrap().subject(), Span::new(0, 10));
        assert_eq!(store.get(FactId::from_u32(2)).unwrap().subject(), Span::new(25, 35));
        let child = store.get(FactId::from_u32(3)).unwrap();
        assert_eq!(child.subject(), Span::new(27, 33));
        assert_eq!(child.object().as_span(), Span::new(25, 35));
    }

    #[test]
    fn test_id_allocator_monotonic() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(b > a);
    }
}
