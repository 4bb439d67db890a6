//! The incremental orchestrator: lexer, structural pass, fact
//! generation, cache and viewport tied together behind one type.
//!
//! `parse` builds the whole document. `process_edit` re-lexes the
//! minimal damaged range, drops only the boundaries that range touches,
//! re-parses the union of their extents, and re-anchors everything after
//! the edit. `parse_viewport` serves facts for the visible range out of
//! the cache, regenerating only on miss. Whole-document facts are
//! available by requesting the full span.

use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::{debug, info};

use crate::base::{AtomTable, Span};
use crate::config::EngineConfig;
use crate::engine::{BoundaryCache, CacheStats, FactGenerator, ViewportManager};
use crate::error::{EngineError, Result};
use crate::fact::{Confidence, Fact, FactId, FactStore, IdAllocator, Predicate, Value};
use crate::lexer::{Edit, LanguageSpec, StreamingLexer, Token};
use crate::query::{Query, QueryExecutor, QueryIndex, QueryResult};
use crate::structure::{ErrorRegion, ParseBoundary, StructuralParser};

/// Outcome of a full parse.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub boundaries: Vec<ParseBoundary>,
    pub error_regions: Vec<ErrorRegion>,
    pub success: bool,
    pub generation: u32,
    pub fact_count: usize,
}

/// Facts added and removed by one edit.
#[derive(Debug, Clone)]
pub struct FactDelta {
    pub added: Vec<FactId>,
    pub removed: Vec<FactId>,
    /// Post-edit coordinates of the re-scanned range.
    pub affected_range: Span,
    pub generation: u32,
}

/// Facts covering one viewport request.
#[derive(Debug, Clone)]
pub struct FactStream {
    pub facts: Vec<Fact>,
    /// How many boundaries were served from the cache.
    pub cache_hits: usize,
    pub generation: u32,
}

/// Result of regenerating a single boundary.
#[derive(Debug, Clone)]
pub struct BoundaryUpdate {
    pub new_facts: Vec<FactId>,
    pub old_facts: Option<Vec<FactId>>,
}

/// One document's parsing context.
///
/// Owns the fact store, cache and indices for exactly one buffer; a host
/// processing several documents keeps one `DetailedParser` per document.
/// All methods are synchronous and driven by explicit calls.
pub struct DetailedParser {
    language: Rc<LanguageSpec>,
    lexer: StreamingLexer,
    structural: StructuralParser,
    generator: FactGenerator,
    atoms: AtomTable,
    ids: IdAllocator,
    store: FactStore,
    cache: BoundaryCache,
    viewport: ViewportManager,
    boundaries: Vec<ParseBoundary>,
    error_regions: Vec<ErrorRegion>,
    /// Generated fact ids per boundary span, parent-link facts included.
    facts_by_boundary: FxHashMap<Span, Vec<FactId>>,
    /// Document-level error facts, one per error region.
    region_facts: Vec<(Span, FactId)>,
    /// Query index over the store, rebuilt lazily on `query`.
    index: QueryIndex,
    index_dirty: bool,
}

impl DetailedParser {
    pub fn new(language: Rc<LanguageSpec>) -> Result<Self> {
        Self::with_config(language, EngineConfig::default())
    }

    pub fn with_config(language: Rc<LanguageSpec>, config: EngineConfig) -> Result<Self> {
        Ok(Self {
            lexer: StreamingLexer::new(Rc::clone(&language)),
            structural: StructuralParser::new(Rc::clone(&language))?,
            generator: FactGenerator::new(Rc::clone(&language)),
            language,
            atoms: AtomTable::new(),
            ids: IdAllocator::new(),
            store: FactStore::new(),
            cache: BoundaryCache::new(config.cache_capacity),
            viewport: ViewportManager::new(config.viewport_margin),
            boundaries: Vec::new(),
            error_regions: Vec::new(),
            facts_by_boundary: FxHashMap::default(),
            region_facts: Vec::new(),
            index: QueryIndex::with_buckets(config.confidence_buckets),
            index_dirty: true,
        })
    }

    pub fn language(&self) -> &LanguageSpec {
        &self.language
    }

    pub fn text(&self) -> &str {
        self.lexer.text()
    }

    pub fn boundaries(&self) -> &[ParseBoundary] {
        &self.boundaries
    }

    pub fn error_regions(&self) -> &[ErrorRegion] {
        &self.error_regions
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Parse a whole document from scratch, replacing any prior state.
    pub fn parse(&mut self, source: &str) -> ParseResult {
        self.store.clear();
        self.cache.clear();
        self.facts_by_boundary.clear();
        self.region_facts.clear();
        self.index_dirty = true;

        self.lexer.tokenize(source);
        let tokens = self.lexer.tokens().to_vec();
        let result = self.structural.parse(&tokens, source, &mut self.ids);

        self.boundaries = result.boundaries;
        self.error_regions = result.error_regions;
        recompute_depths(&mut self.boundaries);

        for fact in &result.facts {
            self.region_facts.push((fact.subject(), fact.id()));
            self.store.insert(*fact);
        }
        for i in 0..self.boundaries.len() {
            self.materialize_boundary(i, &tokens);
        }

        info!(
            boundaries = self.boundaries.len(),
            errors = self.error_regions.len(),
            facts = self.store.len(),
            "full parse"
        );
        ParseResult {
            boundaries: self.boundaries.clone(),
            error_regions: self.error_regions.clone(),
            success: self.error_regions.is_empty(),
            generation: self.store.generation(),
            fact_count: self.store.live_len(),
        }
    }

    /// Apply an edit incrementally.
    ///
    /// Only boundaries overlapping the re-scanned range are regenerated;
    /// everything after the edit is re-anchored in place and cached facts
    /// for untouched boundaries stay valid.
    pub fn process_edit(&mut self, edit: &Edit) -> Result<FactDelta> {
        let delta = self.lexer.process_edit(edit)?;
        let size_delta = edit.size_delta();
        let threshold = edit.range.end;
        let affected = delta.affected_range;
        // The re-scanned range mapped back to pre-edit coordinates.
        let old_affected = Span::new(
            affected.start,
            ((affected.end as i64 - size_delta).max(affected.start as i64)) as u32,
        );

        self.store.bump_generation();
        self.cache.invalidate_overlapping(old_affected);
        self.index_dirty = true;

        let removed = self.drop_damaged(old_affected);
        self.shift_after_edit(threshold, size_delta);

        // Re-parse the union of every dropped extent and the re-scan.
        let window = self
            .boundaries_window(&removed.spans, threshold, size_delta)
            .map_or(affected, |w| w.union(affected));
        let tokens = self.lexer.tokens().to_vec();
        let mut window_indices: Vec<usize> = Vec::new();
        let mut window_tokens: Vec<Token> = Vec::new();
        for (idx, token) in tokens.iter().enumerate() {
            if token.span.intersects(window) {
                window_indices.push(idx);
                window_tokens.push(*token);
            }
        }
        let text = self.lexer.text().to_string();
        let reparsed = self.structural.parse(&window_tokens, &text, &mut self.ids);

        debug!(
            %window,
            dropped = removed.spans.len(),
            reparsed = reparsed.boundaries.len(),
            "incremental re-parse"
        );

        // Recovery points out of the windowed pass index the window
        // slice; translate them to document token indices.
        let to_doc = |point: usize| {
            window_indices.get(point).copied().unwrap_or_else(|| {
                window_indices
                    .last()
                    .map_or(tokens.len(), |&last| last + 1)
            })
        };

        // The window can cover kept boundaries beyond the damage itself;
        // their re-parse is identical, so drop the duplicates.
        let mut added = Vec::new();
        for (mut region, fact) in reparsed.error_regions.into_iter().zip(reparsed.facts) {
            if self.error_regions.iter().any(|r| r.span == region.span) {
                continue;
            }
            for point in &mut region.recovery_points {
                *point = to_doc(*point);
            }
            self.error_regions.push(region);
            self.region_facts.push((fact.subject(), fact.id()));
            self.store.insert(fact);
            added.push(fact.id());
        }

        let mut new_spans = Vec::new();
        for mut boundary in reparsed.boundaries {
            if self.boundaries.iter().any(|k| k.span == boundary.span) {
                continue;
            }
            for point in &mut boundary.recovery_points {
                *point = to_doc(*point);
            }
            new_spans.push(boundary.span);
            self.boundaries.push(boundary);
        }
        self.boundaries.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });
        let depth_changed = recompute_depths(&mut self.boundaries);

        let mut removed_ids = removed.facts;
        for i in 0..self.boundaries.len() {
            let span = self.boundaries[i].span;
            let fresh = new_spans.contains(&span);
            let stale_depth = depth_changed.contains(&span) && !fresh;
            if stale_depth {
                if let Some(old) = self.retire_boundary_facts(span) {
                    removed_ids.extend(old);
                }
                self.cache.invalidate(span);
            }
            if fresh || stale_depth {
                added.extend(self.materialize_boundary(i, &tokens));
            }
        }

        Ok(FactDelta {
            added,
            removed: removed_ids,
            affected_range: affected,
            generation: self.store.generation(),
        })
    }

    /// Serve the facts for every boundary overlapping `viewport`.
    ///
    /// Cached boundaries are returned as-is; misses are refilled from the
    /// store or regenerated, then cached. Repeated calls with no edit in
    /// between are pure cache hits.
    pub fn parse_viewport(&mut self, viewport: Span) -> FactStream {
        self.viewport.set_viewport(viewport);
        let order = self.viewport.prioritize(&self.boundaries);
        let tokens = self.lexer.tokens().to_vec();

        let mut facts = Vec::new();
        let mut cache_hits = 0;
        for i in order {
            let span = self.boundaries[i].span;
            if !self.viewport.is_visible(span) {
                continue;
            }
            if let Some(cached) = self.cache.get(span) {
                cache_hits += 1;
                facts.extend_from_slice(cached);
                continue;
            }
            let refilled = self.refill_from_store(span);
            let regenerated = match refilled {
                Some(f) => f,
                None => {
                    let generated = self.generate_for(i, &tokens);
                    self.store.extend(generated.iter().copied());
                    self.facts_by_boundary
                        .insert(span, generated.iter().map(|f| f.id()).collect());
                    self.index_dirty = true;
                    generated
                }
            };
            facts.extend_from_slice(&regenerated);
            self.cache.put(span, regenerated);
        }
        FactStream {
            facts,
            cache_hits,
            generation: self.store.generation(),
        }
    }

    /// Regenerate one boundary's facts, retiring the previous set.
    pub fn update_boundary(&mut self, boundary: &ParseBoundary) -> BoundaryUpdate {
        let old_facts = self.retire_boundary_facts(boundary.span);
        self.cache.invalidate(boundary.span);
        self.index_dirty = true;

        let tokens = self.lexer.tokens().to_vec();
        let generated = self.generator.from_boundary(
            boundary,
            &tokens,
            self.lexer.text(),
            &mut self.atoms,
            &mut self.ids,
        );
        let new_facts: Vec<FactId> = generated.iter().map(|f| f.id()).collect();
        self.store.extend(generated.iter().copied());
        self.facts_by_boundary
            .insert(boundary.span, new_facts.clone());
        self.cache.put(boundary.span, generated);
        BoundaryUpdate {
            new_facts,
            old_facts,
        }
    }

    /// Run a query against this document's live facts.
    ///
    /// The engine's own index backs the execution; it is rebuilt here
    /// when parsing or editing has changed the live fact set.
    pub fn query(&mut self, query: &Query) -> Result<QueryResult> {
        if self.index_dirty {
            self.index.build(&self.store);
            self.index_dirty = false;
        }
        QueryExecutor::new()
            .bind_store(&self.store)
            .bind_index(&self.index)
            .execute(query)
    }

    /// The query index, as of the last `query` call.
    pub fn index(&self) -> &QueryIndex {
        &self.index
    }

    /// Live facts recorded for the boundary at exactly `span`.
    ///
    /// Unlike the cache, this is an authoritative lookup: an unknown
    /// span is an error, not a miss.
    pub fn facts_for(&self, span: Span) -> Result<Vec<Fact>> {
        let ids = self
            .facts_by_boundary
            .get(&span)
            .ok_or(EngineError::SpanNotFound(span))?;
        Ok(ids
            .iter()
            .filter_map(|id| self.store.get(*id))
            .copied()
            .collect())
    }

    /// Drop retired facts from the store. Returns the number dropped.
    pub fn compact(&mut self) -> usize {
        self.store.compact()
    }

    /// Generate, store, cache and link facts for boundary `i`.
    /// Returns the new fact ids.
    fn materialize_boundary(&mut self, i: usize, tokens: &[Token]) -> Vec<FactId> {
        let span = self.boundaries[i].span;
        let generated = self.generate_for(i, tokens);
        let mut ids: Vec<FactId> = generated.iter().map(|f| f.id()).collect();
        self.store.extend(generated.iter().copied());
        self.cache.put(span, generated);

        // Parent links live in the store only; the cache holds just the
        // boundary's own facts so a parent change cannot stale them.
        if let Some(parent) = self.parent_of(i) {
            let fact = Fact::new(
                self.ids.allocate(),
                span,
                Predicate::ChildOf,
                Value::span(parent),
                Confidence::FULL,
            );
            ids.push(fact.id());
            self.store.insert(fact);
        }
        self.facts_by_boundary.insert(span, ids.clone());
        ids
    }

    fn generate_for(&mut self, i: usize, tokens: &[Token]) -> Vec<Fact> {
        let text = self.lexer.text().to_string();
        self.generator.from_boundary(
            &self.boundaries[i],
            tokens,
            &text,
            &mut self.atoms,
            &mut self.ids,
        )
    }

    /// Tightest strictly-containing boundary, if any.
    fn parent_of(&self, i: usize) -> Option<Span> {
        let span = self.boundaries[i].span;
        self.boundaries[..i]
            .iter()
            .rev()
            .map(|b| b.span)
            .find(|outer| outer.contains_span(span) && *outer != span)
    }

    fn retire_boundary_facts(&mut self, span: Span) -> Option<Vec<FactId>> {
        let ids = self.facts_by_boundary.remove(&span)?;
        for &id in &ids {
            self.store.retire(id);
        }
        Some(ids)
    }

    /// Remove boundaries, regions and facts damaged by the edit.
    ///
    /// Clean boundaries are damaged only by strict overlap. Boundaries
    /// and regions carrying errors are damaged already when the edit
    /// touches them: their extent ends wherever scanning gave up, so an
    /// insertion right at that point (say, the missing close brace) must
    /// re-parse them.
    fn drop_damaged(&mut self, old_affected: Span) -> Damaged {
        fn touches(span: Span, range: Span) -> bool {
            span.start <= range.end && range.start <= span.end
        }

        let mut damaged = Damaged::default();
        let mut kept = Vec::with_capacity(self.boundaries.len());
        for boundary in self.boundaries.drain(..) {
            let hit = if boundary.has_errors {
                touches(boundary.span, old_affected)
            } else if old_affected.is_empty() {
                // Pure insertion at a token boundary: a clean boundary
                // strictly around the insertion point grows and must
                // re-parse, even with no byte of old text re-scanned.
                boundary.span.start < old_affected.start
                    && old_affected.start < boundary.span.end
            } else {
                boundary.span.intersects(old_affected)
            };
            if hit {
                damaged.spans.push(boundary.span);
            } else {
                kept.push(boundary);
            }
        }
        self.boundaries = kept;
        for span in &damaged.spans {
            self.cache.invalidate(*span);
            if let Some(ids) = self.facts_by_boundary.remove(span) {
                for &id in &ids {
                    self.store.retire(id);
                }
                damaged.facts.extend(ids);
            }
        }

        self.error_regions
            .retain(|r| !touches(r.span, old_affected));
        let mut kept_regions = Vec::with_capacity(self.region_facts.len());
        for (span, id) in self.region_facts.drain(..) {
            if touches(span, old_affected) {
                self.store.retire(id);
                damaged.facts.push(id);
            } else {
                kept_regions.push((span, id));
            }
        }
        self.region_facts = kept_regions;

        damaged
    }

    /// Re-anchor every surviving span past the edit point.
    fn shift_after_edit(&mut self, threshold: u32, size_delta: i64) {
        if size_delta == 0 {
            return;
        }
        self.store.shift_spans(threshold, size_delta);
        self.cache.shift_spans(threshold, size_delta);
        for boundary in &mut self.boundaries {
            if boundary.span.start >= threshold {
                boundary.span = boundary.span.shifted(size_delta);
            }
        }
        for region in &mut self.error_regions {
            if region.span.start >= threshold {
                region.span = region.span.shifted(size_delta);
            }
        }
        for (span, _) in &mut self.region_facts {
            if span.start >= threshold {
                *span = span.shifted(size_delta);
            }
        }
        let moved: Vec<(Span, Vec<FactId>)> = {
            let keys: Vec<Span> = self
                .facts_by_boundary
                .keys()
                .copied()
                .filter(|k| k.start >= threshold)
                .collect();
            keys.into_iter()
                .filter_map(|k| self.facts_by_boundary.remove(&k).map(|v| (k, v)))
                .collect()
        };
        for (old_key, ids) in moved {
            self.facts_by_boundary
                .insert(old_key.shifted(size_delta), ids);
        }
    }

    /// Union of dropped extents, mapped to post-edit coordinates.
    fn boundaries_window(
        &self,
        extents: &[Span],
        threshold: u32,
        size_delta: i64,
    ) -> Option<Span> {
        extents
            .iter()
            .map(|span| {
                let start = if span.start >= threshold {
                    (span.start as i64 + size_delta).max(0) as u32
                } else {
                    span.start
                };
                let end = if span.end >= threshold {
                    (span.end as i64 + size_delta).max(start as i64) as u32
                } else {
                    span.end
                };
                Span::new(start, end)
            })
            .reduce(|a, b| a.union(b))
    }

    /// Re-cache a boundary's facts from the store without regenerating.
    /// Parent links are left out, matching what generation caches.
    fn refill_from_store(&mut self, span: Span) -> Option<Vec<Fact>> {
        let ids = self.facts_by_boundary.get(&span)?;
        let mut facts = Vec::with_capacity(ids.len());
        for &id in ids {
            let fact = self.store.get(id)?;
            if fact.predicate() != Predicate::ChildOf {
                facts.push(*fact);
            }
        }
        Some(facts)
    }
}

/// Recompute nesting depths over the sorted boundary list.
/// Returns the spans whose depth changed.
fn recompute_depths(boundaries: &mut [ParseBoundary]) -> Vec<Span> {
    let mut changed = Vec::new();
    let mut stack: Vec<Span> = Vec::new();
    for boundary in boundaries.iter_mut() {
        while let Some(&top) = stack.last() {
            if top.contains_span(boundary.span) && top != boundary.span {
                break;
            }
            stack.pop();
        }
        let depth = stack.len() as u16;
        if boundary.depth != depth {
            boundary.depth = depth;
            changed.push(boundary.span);
        }
        stack.push(boundary.span);
    }
    changed
}

#[derive(Default)]
struct Damaged {
    spans: Vec<Span>,
    facts: Vec<FactId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DetailedParser {
        DetailedParser::new(Rc::new(LanguageSpec::c_like())).unwrap()
    }

    #[test]
    fn test_full_parse_builds_facts() {
        let mut p = parser();
        let result = p.parse("fn one(){} fn two(){}");
        assert!(result.success);
        assert_eq!(result.boundaries.len(), 2);
        assert!(result.fact_count > 0);
        // Each boundary has a kind fact in the store.
        let kinds = p
            .store()
            .iter_live()
            .filter(|f| f.predicate() == Predicate::IsFunction)
            .count();
        assert_eq!(kinds, 2);
    }

    #[test]
    fn test_parent_links_follow_nesting() {
        let mut p = parser();
        p.parse("mod outer { fn inner() {} }");
        let child = p
            .store()
            .iter_live()
            .find(|f| f.predicate() == Predicate::ChildOf)
            .unwrap();
        assert_eq!(child.subject(), Span::new(12, 25));
        assert_eq!(child.object().as_span(), Span::new(0, 27));
    }

    #[test]
    fn test_edit_keeps_untouched_boundary_cached() {
        let mut p = parser();
        p.parse("fn one(){} fn two(){}");
        let evictions_before = p.cache_stats().evictions;

        let delta = p
            .process_edit(&Edit::new(Span::new(14, 17), "three"))
            .unwrap();
        assert_eq!(delta.affected_range, Span::new(14, 19));
        assert!(!delta.added.is_empty());
        assert!(!delta.removed.is_empty());

        // `one` was neither evicted nor regenerated.
        assert_eq!(p.cache_stats().evictions, evictions_before);
        let one = Span::new(0, 10);
        assert!(p.boundaries().iter().any(|b| b.span == one));
        let stream = p.parse_viewport(one);
        assert!(stream.cache_hits >= 1);

        // The renamed function is fully re-described.
        let two = p
            .boundaries()
            .iter()
            .find(|b| b.span.start == 11)
            .unwrap();
        assert_eq!(two.span, Span::new(11, 23));
    }

    #[test]
    fn test_edit_shifts_following_facts() {
        let mut p = parser();
        p.parse("fn one(){} fn two(){}");
        p.process_edit(&Edit::new(Span::new(3, 6), "first"))
            .unwrap();

        // `two` moved right by 2 and kept its facts.
        let two_span = Span::new(13, 23);
        assert!(p.boundaries().iter().any(|b| b.span == two_span));
        assert!(
            p.store()
                .iter_live()
                .any(|f| f.predicate() == Predicate::IsFunction && f.subject() == two_span)
        );
    }

    #[test]
    fn test_viewport_idempotent_and_hits_cache() {
        let mut p = parser();
        p.parse("fn one(){} fn two(){}");
        let viewport = Span::new(0, 10);

        let first = p.parse_viewport(viewport);
        let hits_after_first = p.cache_stats().hits;
        let second = p.parse_viewport(viewport);

        assert_eq!(first.facts, second.facts);
        assert!(p.cache_stats().hits > hits_after_first);
        // Both boundaries sit inside the default margin.
        assert_eq!(second.cache_hits, 2);
    }

    #[test]
    fn test_viewport_excludes_far_boundaries() {
        let config = EngineConfig {
            viewport_margin: 0,
            ..EngineConfig::default()
        };
        let mut p = DetailedParser::with_config(Rc::new(LanguageSpec::c_like()), config).unwrap();
        p.parse("fn one(){} fn two(){}");
        let stream = p.parse_viewport(Span::new(0, 10));
        // Only `one`'s facts: all subjects inside its span.
        assert!(!stream.facts.is_empty());
        assert!(stream.facts.iter().all(|f| f.subject().end <= 10));
    }

    #[test]
    fn test_update_boundary_swaps_fact_set() {
        let mut p = parser();
        p.parse("fn one(){}");
        let boundary = p.boundaries()[0].clone();
        let update = p.update_boundary(&boundary);
        assert!(!update.new_facts.is_empty());
        let old = update.old_facts.unwrap();
        assert!(!old.is_empty());
        // Old ids are retired, new ids live.
        p.compact();
        assert!(p.store().get(old[0]).is_none());
        assert!(p.store().get(update.new_facts[0]).is_some());
    }

    #[test]
    fn test_facts_for_requires_a_known_span() {
        let mut p = parser();
        p.parse("fn one(){}");
        let facts = p.facts_for(Span::new(0, 10)).unwrap();
        assert!(facts.iter().any(|f| f.predicate() == Predicate::IsFunction));

        let err = p.facts_for(Span::new(1, 9)).unwrap_err();
        assert!(matches!(err, EngineError::SpanNotFound(_)));
    }

    #[test]
    fn test_insertion_inside_boundary_regrows_it() {
        let mut p = parser();
        p.parse("fn one(){}");
        // Insert at a token seam inside the body; no old byte is
        // re-scanned, yet the enclosing boundary must grow.
        p.process_edit(&Edit::new(Span::empty(9), "x")).unwrap();
        assert_eq!(p.boundaries().len(), 1);
        assert_eq!(p.boundaries()[0].span, Span::new(0, 11));
    }

    #[test]
    fn test_config_buckets_reach_the_query_index() {
        let config = EngineConfig {
            confidence_buckets: 4,
            ..EngineConfig::default()
        };
        let mut p = DetailedParser::with_config(Rc::new(LanguageSpec::c_like()), config).unwrap();
        p.parse("fn one(){}");
        let result = p.query(&Query::predicates([Predicate::IsFunction])).unwrap();
        assert!(result.stats.used_index);
        assert_eq!(p.index().bucket_count(), 4);
    }

    #[test]
    fn test_incremental_recovery_points_use_document_indices() {
        let mut p = parser();
        p.parse("fn a(){} struct S{} fn b(){}");
        // Deleting the struct name makes its header malformed, so the
        // windowed re-parse emits an error region.
        p.process_edit(&Edit::new(Span::new(16, 17), "")).unwrap();
        assert!(!p.error_regions().is_empty());

        let tokens = p.lexer.tokens();
        for region in p.error_regions() {
            for &point in &region.recovery_points {
                assert!(point <= tokens.len());
                // A resolvable point must land at or after the region.
                if let Some(token) = tokens.get(point) {
                    assert!(token.span.start >= region.span.start);
                }
            }
        }
    }

    #[test]
    fn test_edit_out_of_bounds_is_rejected() {
        let mut p = parser();
        p.parse("fn one(){}");
        let err = p.process_edit(&Edit::new(Span::new(50, 60), "x"));
        assert!(err.is_err());
        // Document state is untouched.
        assert_eq!(p.boundaries().len(), 1);
    }

    #[test]
    fn test_edit_into_error_and_back() {
        let mut p = parser();
        p.parse("fn one(){}");
        // Delete the closing brace.
        let delta = p.process_edit(&Edit::new(Span::new(9, 10), "")).unwrap();
        assert!(!delta.added.is_empty());
        assert!(!p.error_regions().is_empty());

        // Restore it.
        p.process_edit(&Edit::new(Span::new(9, 9), "}")).unwrap();
        let complete = p
            .boundaries()
            .iter()
            .find(|b| b.kind == crate::structure::BoundaryKind::Function)
            .unwrap();
        assert!(!complete.has_errors);
        assert_eq!(complete.span, Span::new(0, 10));
    }
}
