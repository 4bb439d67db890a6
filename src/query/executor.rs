//! Query model and evaluation over a fact store.
//!
//! Evaluation is fixed-order: base selection (through the index when one
//! is bound and the query is predicate-shaped), WHERE filtering with
//! short-circuit AND/OR, a stable ORDER BY sort, then OFFSET/LIMIT
//! slicing. Every execution reports stats alongside its rows.

use std::time::{Duration, Instant};

use crate::error::{EngineError, Result};
use crate::fact::{Fact, FactStore, Predicate};
use crate::query::QueryIndex;

/// A field of a fact that conditions and ordering can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    SpanStart,
    SpanEnd,
    SpanLength,
    Predicate,
    /// Raw payload bits, compared without payload context.
    Object,
    Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A comparable field value. Mixed int/float comparisons promote the
/// integer side to float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}

impl FieldValue {
    fn compare(self, other: FieldValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(&b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(&b),
            (FieldValue::Int(a), FieldValue::Float(b)) => (a as f64).partial_cmp(&b),
            (FieldValue::Float(a), FieldValue::Int(b)) => a.partial_cmp(&(b as f64)),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<Predicate> for FieldValue {
    fn from(p: Predicate) -> Self {
        FieldValue::Int(p.to_u16() as i64)
    }
}

/// WHERE clause tree.
#[derive(Debug, Clone)]
pub enum Condition {
    Cmp {
        field: Field,
        op: CmpOp,
        value: FieldValue,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn field(field: Field, op: CmpOp, value: impl Into<FieldValue>) -> Self {
        Condition::Cmp {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    fn eval(&self, fact: &Fact) -> bool {
        match self {
            Condition::Cmp { field, op, value } => {
                let Some(ordering) = extract(fact, *field).compare(*value) else {
                    return false;
                };
                match op {
                    CmpOp::Eq => ordering.is_eq(),
                    CmpOp::Ne => ordering.is_ne(),
                    CmpOp::Lt => ordering.is_lt(),
                    CmpOp::Le => ordering.is_le(),
                    CmpOp::Gt => ordering.is_gt(),
                    CmpOp::Ge => ordering.is_ge(),
                }
            }
            Condition::And(a, b) => a.eval(fact) && b.eval(fact),
            Condition::Or(a, b) => a.eval(fact) || b.eval(fact),
            Condition::Not(inner) => !inner.eval(fact),
        }
    }
}

fn extract(fact: &Fact, field: Field) -> FieldValue {
    match field {
        Field::Id => FieldValue::Int(fact.id().to_u32() as i64),
        Field::SpanStart => FieldValue::Int(fact.subject().start as i64),
        Field::SpanEnd => FieldValue::Int(fact.subject().end as i64),
        Field::SpanLength => FieldValue::Int(fact.subject().len() as i64),
        Field::Predicate => FieldValue::Int(fact.predicate().to_u16() as i64),
        Field::Object => FieldValue::Int(fact.object().raw() as i64),
        Field::Confidence => FieldValue::Float(fact.confidence().to_f32() as f64),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Base fact set a query starts from.
///
/// `Fields` selects every live fact but projects the named fields into
/// [`QueryResult::rows`] instead of leaving callers to re-extract them.
#[derive(Debug, Clone, Default)]
pub enum Select {
    #[default]
    All,
    Predicates(Vec<Predicate>),
    Fields(Vec<Field>),
}

/// A declarative query over the fact store.
#[derive(Debug, Clone, Default)]
pub struct Query {
    select: Select,
    filter: Option<Condition>,
    order_by: Option<(Field, Direction)>,
    limit: Option<usize>,
    offset: usize,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn predicates(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            select: Select::Predicates(predicates.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            select: Select::Fields(fields.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, field: Field, direction: Direction) -> Self {
        self.order_by = Some((field, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub elapsed: Duration,
    pub rows_examined: usize,
    pub rows_returned: usize,
    pub used_index: bool,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub facts: Vec<Fact>,
    /// Field projections, one row per fact. Empty unless the query
    /// selected [`Select::Fields`].
    pub rows: Vec<Vec<FieldValue>>,
    pub stats: QueryStats,
}

/// Executes queries against a bound store, optionally through an index.
///
/// The executor owns a scratch buffer reused across executions, so
/// steady-state querying does not grow the heap.
#[derive(Debug, Default)]
pub struct QueryExecutor<'a> {
    store: Option<&'a FactStore>,
    index: Option<&'a QueryIndex>,
    scratch: Vec<Fact>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_store(mut self, store: &'a FactStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn bind_index(mut self, index: &'a QueryIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Run one query. Errors if no store is bound.
    pub fn execute(&mut self, query: &Query) -> Result<QueryResult> {
        let store = self.store.ok_or(EngineError::NoFactStore)?;
        let start = Instant::now();
        let mut rows_examined = 0;
        let mut used_index = false;
        self.scratch.clear();

        let passes = |fact: &Fact| match &query.filter {
            Some(condition) => condition.eval(fact),
            None => true,
        };

        match (&query.select, self.index) {
            (Select::Predicates(predicates), Some(index)) => {
                used_index = true;
                for &predicate in predicates {
                    for &id in index.query_by_predicate(predicate) {
                        rows_examined += 1;
                        if let Some(fact) = store.get(id) {
                            if passes(fact) {
                                self.scratch.push(*fact);
                            }
                        }
                    }
                }
            }
            (Select::Predicates(predicates), None) => {
                for fact in store.iter_live() {
                    rows_examined += 1;
                    if predicates.contains(&fact.predicate()) && passes(fact) {
                        self.scratch.push(*fact);
                    }
                }
            }
            (Select::All, _) | (Select::Fields(_), _) => {
                for fact in store.iter_live() {
                    rows_examined += 1;
                    if passes(fact) {
                        self.scratch.push(*fact);
                    }
                }
            }
        }

        if let Some((field, direction)) = query.order_by {
            self.scratch.sort_by(|a, b| {
                let ordering = extract(a, field)
                    .compare(extract(b, field))
                    .unwrap_or(std::cmp::Ordering::Equal);
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        let end = match query.limit {
            Some(limit) => (query.offset + limit).min(self.scratch.len()),
            None => self.scratch.len(),
        };
        let offset = query.offset.min(self.scratch.len());
        let facts: Vec<Fact> = self.scratch[offset..end.max(offset)].to_vec();

        let rows = match &query.select {
            Select::Fields(fields) => facts
                .iter()
                .map(|fact| fields.iter().map(|&field| extract(fact, field)).collect())
                .collect(),
            _ => Vec::new(),
        };

        let stats = QueryStats {
            elapsed: start.elapsed(),
            rows_examined,
            rows_returned: facts.len(),
            used_index,
        };
        Ok(QueryResult { facts, rows, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Span;
    use crate::fact::{Confidence, FactId, Value};

    fn store() -> FactStore {
        let mut store = FactStore::new();
        for (id, confidence, predicate) in [
            (1, 0.9, Predicate::IsFunction),
            (2, 0.4, Predicate::IsFunction),
            (3, 0.95, Predicate::IsStruct),
        ] {
            store.insert(Fact::new(
                FactId::from_u32(id),
                Span::new(id * 10, id * 10 + 5),
                predicate,
                Value::none(),
                Confidence::from_f32(confidence),
            ));
        }
        store
    }

    fn result_ids(result: &QueryResult) -> Vec<u32> {
        result.facts.iter().map(|f| f.id().to_u32()).collect()
    }

    #[test]
    fn test_no_store_is_an_error() {
        let err = QueryExecutor::new().execute(&Query::all()).unwrap_err();
        assert!(matches!(err, EngineError::NoFactStore));
    }

    #[test]
    fn test_predicate_and_confidence_filter() {
        let store = store();
        let query = Query::all()
            .filter(Condition::field(
                Field::Predicate,
                CmpOp::Eq,
                Predicate::IsFunction,
            ))
            .filter(Condition::field(Field::Confidence, CmpOp::Ge, 0.5))
            .order_by(Field::Confidence, Direction::Descending);
        let result = QueryExecutor::new()
            .bind_store(&store)
            .execute(&query)
            .unwrap();
        assert_eq!(result_ids(&result), vec![1]);
        assert_eq!(result.stats.rows_examined, 3);
        assert_eq!(result.stats.rows_returned, 1);
        assert!(!result.stats.used_index);
    }

    #[test]
    fn test_or_and_not() {
        let store = store();
        let query = Query::all().filter(
            Condition::field(Field::Confidence, CmpOp::Ge, 0.9)
                .or(Condition::field(Field::Id, CmpOp::Eq, 2i64))
                .and(Condition::field(Field::Predicate, CmpOp::Eq, Predicate::IsStruct).not()),
        );
        let result = QueryExecutor::new()
            .bind_store(&store)
            .execute(&query)
            .unwrap();
        assert_eq!(result_ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_order_limit_offset() {
        let store = store();
        let query = Query::all()
            .order_by(Field::Confidence, Direction::Descending)
            .offset(1)
            .limit(1);
        let result = QueryExecutor::new()
            .bind_store(&store)
            .execute(&query)
            .unwrap();
        assert_eq!(result_ids(&result), vec![1]);
    }

    #[test]
    fn test_index_backed_selection() {
        let store = store();
        let mut index = QueryIndex::new();
        index.build(&store);
        let query = Query::predicates([Predicate::IsFunction]);
        let result = QueryExecutor::new()
            .bind_store(&store)
            .bind_index(&index)
            .execute(&query)
            .unwrap();
        assert_eq!(result_ids(&result), vec![1, 2]);
        assert!(result.stats.used_index);
        assert_eq!(result.stats.rows_examined, 2);
    }

    #[test]
    fn test_span_fields() {
        let store = store();
        let query = Query::all().filter(Condition::field(Field::SpanStart, CmpOp::Ge, 20i64));
        let result = QueryExecutor::new()
            .bind_store(&store)
            .execute(&query)
            .unwrap();
        assert_eq!(result_ids(&result), vec![2, 3]);
    }

    #[test]
    fn test_field_projection() {
        let store = store();
        let query = Query::fields([Field::Id, Field::SpanStart])
            .filter(Condition::field(Field::Predicate, CmpOp::Eq, Predicate::IsStruct));
        let result = QueryExecutor::new()
            .bind_store(&store)
            .execute(&query)
            .unwrap();
        assert_eq!(
            result.rows,
            vec![vec![FieldValue::Int(3), FieldValue::Int(30)]]
        );
        assert_eq!(result_ids(&result), vec![3]);
    }

    #[test]
    fn test_executor_reuses_scratch() {
        let store = store();
        let mut executor = QueryExecutor::new().bind_store(&store);
        let a = executor.execute(&Query::all()).unwrap();
        let b = executor.execute(&Query::all()).unwrap();
        assert_eq!(a.facts, b.facts);
    }
}
