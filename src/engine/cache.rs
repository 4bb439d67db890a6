//! Span-keyed LRU cache of generated facts.
//!
//! Entries live in a slab of pre-linked slots; the LRU order is a doubly
//! linked list threaded through slot indices, so eviction and promotion
//! never allocate. Each entry carries a generation stamp: a `get` against
//! an entry from an older generation counts as a miss, and the stale slot
//! is reclaimed lazily when it is overwritten or evicted.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::base::Span;
use crate::fact::Fact;

const NIL: u32 = u32::MAX;

/// Running cache counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Slot {
    key: Span,
    facts: Vec<Fact>,
    generation: u32,
    prev: u32,
    next: u32,
}

/// Capacity-bounded span-to-facts cache with strict LRU eviction.
#[derive(Debug)]
pub struct BoundaryCache {
    slots: Vec<Slot>,
    index: FxHashMap<Span, u32>,
    free: Vec<u32>,
    /// Most recently used entry.
    head: u32,
    /// Least recently used entry, evicted first.
    tail: u32,
    capacity: usize,
    generation: u32,
    stats: CacheStats,
}

impl BoundaryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
            generation: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Bulk-invalidate every entry by advancing the store generation.
    /// Stale entries stay in place until overwritten or evicted.
    pub fn increment_generation(&mut self) -> u32 {
        self.generation += 1;
        self.generation
    }

    /// Look up the facts cached for `span`, promoting the entry to most
    /// recently used. A stamp from an older generation is a miss.
    pub fn get(&mut self, span: Span) -> Option<&[Fact]> {
        let Some(&idx) = self.index.get(&span) else {
            self.stats.misses += 1;
            return None;
        };
        if self.slots[idx as usize].generation != self.generation {
            self.stats.misses += 1;
            return None;
        }
        self.detach(idx);
        self.push_front(idx);
        self.stats.hits += 1;
        Some(&self.slots[idx as usize].facts)
    }

    /// Insert or overwrite the entry for `span`, stamping it with the
    /// current generation. Evicts the least recently used entry when at
    /// capacity; eviction reuses the victim's slot.
    pub fn put(&mut self, span: Span, facts: Vec<Fact>) {
        self.stats.insertions += 1;
        if let Some(&idx) = self.index.get(&span) {
            let slot = &mut self.slots[idx as usize];
            slot.facts = facts;
            slot.generation = self.generation;
            self.detach(idx);
            self.push_front(idx);
            return;
        }

        let idx = if self.index.len() >= self.capacity {
            let victim = self.tail;
            debug_assert_ne!(victim, NIL);
            self.detach(victim);
            let old_key = self.slots[victim as usize].key;
            self.index.remove(&old_key);
            self.stats.evictions += 1;
            trace!(%old_key, "evicted");
            victim
        } else if let Some(idx) = self.free.pop() {
            idx
        } else {
            self.slots.push(Slot {
                key: span,
                facts: Vec::new(),
                generation: 0,
                prev: NIL,
                next: NIL,
            });
            (self.slots.len() - 1) as u32
        };

        let slot = &mut self.slots[idx as usize];
        slot.key = span;
        slot.facts = facts;
        slot.generation = self.generation;
        self.index.insert(span, idx);
        self.push_front(idx);
    }

    /// Remove the entry for `span`, returning its facts.
    pub fn invalidate(&mut self, span: Span) -> Option<Vec<Fact>> {
        let idx = self.index.remove(&span)?;
        self.detach(idx);
        self.free.push(idx);
        Some(std::mem::take(&mut self.slots[idx as usize].facts))
    }

    /// Remove every entry whose key strictly overlaps `span`. Returns the
    /// number of entries removed.
    pub fn invalidate_overlapping(&mut self, span: Span) -> usize {
        let overlapping: Vec<Span> = self
            .index
            .keys()
            .copied()
            .filter(|key| key.intersects(span))
            .collect();
        for key in &overlapping {
            self.invalidate(*key);
        }
        overlapping.len()
    }

    /// Re-anchor keys and cached subject spans at or past `threshold`
    /// after an edit that changed the buffer length by `delta` bytes.
    pub fn shift_spans(&mut self, threshold: u32, delta: i64) {
        if delta == 0 {
            return;
        }
        let moved: Vec<(Span, u32)> = self
            .index
            .iter()
            .filter(|(key, _)| key.start >= threshold)
            .map(|(key, &idx)| (*key, idx))
            .collect();
        for (old_key, idx) in moved {
            self.index.remove(&old_key);
            let new_key = old_key.shifted(delta);
            let slot = &mut self.slots[idx as usize];
            slot.key = new_key;
            for fact in &mut slot.facts {
                let subject = fact.subject();
                if subject.start >= threshold {
                    *fact = Fact::new(
                        fact.id(),
                        subject.shifted(delta),
                        fact.predicate(),
                        fact.object(),
                        fact.confidence(),
                    );
                }
            }
            self.index.insert(new_key, idx);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    fn detach(&mut self, idx: u32) {
        let (prev, next) = {
            let slot = &self.slots[idx as usize];
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
        let slot = &mut self.slots[idx as usize];
        slot.prev = NIL;
        slot.next = NIL;
    }

    fn push_front(&mut self, idx: u32) {
        let old_head = self.head;
        {
            let slot = &mut self.slots[idx as usize];
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slots[old_head as usize].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }
}
