//! Query DSL tree sent to the engine.

use crate::filter::{FuzzyFilter, RangeFilter, RegexFilter, WildcardFilter};
use serde_json::{Map, Value, json};

/// Query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Match all documents.
    MatchAll,
    /// `match` on one field.
    Match(MatchQuery),
    /// `fuzzy` on one field.
    Fuzzy(FuzzyQuery),
    /// `regexp` on one field.
    Regexp(RegexpQuery),
    /// `wildcard` on one field.
    Wildcard(WildcardQuery),
    /// `range` over one or more fields.
    Range(RangeQuery),
    /// `exists` on one field.
    Exists(ExistsQuery),
    /// Boolean combination.
    Bool(BoolQuery),
}

impl Query {
    /// Convert query to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match(q) => q.to_json(),
            Query::Fuzzy(q) => q.to_json(),
            Query::Regexp(q) => q.to_json(),
            Query::Wildcard(q) => q.to_json(),
            Query::Range(q) => q.to_json(),
            Query::Exists(q) => q.to_json(),
            Query::Bool(q) => q.to_json(),
        }
    }

    /// Replace a bool query without any clause by `match_all`.
    pub fn or_match_all(self) -> Query {
        match self {
            Query::Bool(b) if b.is_empty() => Query::MatchAll,
            other => other,
        }
    }
}

/// `{"match": {field: value}}`
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    /// Field name, possibly a `.keyword` sub-field.
    pub field: String,
    /// Value to match.
    pub value: Value,
}

impl MatchQuery {
    /// Create a match query.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({ "match": { &self.field: self.value } })
    }
}

/// `{"fuzzy": {field: {value, fuzziness, ...}}}`
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyQuery {
    /// Field name.
    pub field: String,
    /// Term and options.
    pub options: FuzzyFilter,
}

impl FuzzyQuery {
    fn to_json(&self) -> Value {
        json!({ "fuzzy": { &self.field: self.options } })
    }
}

/// `{"regexp": {field: {value, flags, ...}}}`
#[derive(Debug, Clone, PartialEq)]
pub struct RegexpQuery {
    /// Field name.
    pub field: String,
    /// Pattern and options.
    pub options: RegexFilter,
}

impl RegexpQuery {
    fn to_json(&self) -> Value {
        json!({ "regexp": { &self.field: self.options } })
    }
}

/// `{"wildcard": {field: {value, boost, ...}}}`
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardQuery {
    /// Field name.
    pub field: String,
    /// Pattern and options.
    pub options: WildcardFilter,
}

impl WildcardQuery {
    fn to_json(&self) -> Value {
        json!({ "wildcard": { &self.field: self.options } })
    }
}

/// `{"range": {field: {gte, lt, ...}, ...}}` with one entry per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQuery {
    /// Bounds per field, in insertion order.
    pub fields: Vec<(String, RangeFilter)>,
}

impl RangeQuery {
    /// Empty range query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the bounds of `field`.
    pub fn field(mut self, field: impl Into<String>, bounds: RangeFilter) -> Self {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = bounds,
            None => self.fields.push((field, bounds)),
        }
        self
    }

    /// Whether no field has bounds.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn to_json(&self) -> Value {
        let mut range = Map::new();
        for (field, bounds) in &self.fields {
            range.insert(field.clone(), json!(bounds));
        }
        json!({ "range": range })
    }
}

/// `{"exists": {"field": field}}`
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsQuery {
    /// Field name.
    pub field: String,
}

impl ExistsQuery {
    /// Create an exists query.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({ "exists": { "field": self.field } })
    }
}

/// Bool query for combining multiple queries.
///
/// `must` is always rendered, even when empty; the other lists only when
/// they have clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    /// Must match (AND).
    pub must: Vec<Query>,
    /// Should match (OR).
    pub should: Vec<Query>,
    /// Must not match (NOT).
    pub must_not: Vec<Query>,
    /// Filter (non-scoring).
    pub filter: Vec<Query>,
}

impl BoolQuery {
    /// Create a new bool query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause.
    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    /// Add a should clause.
    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    /// Add a must_not clause.
    pub fn must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    /// Add a filter clause.
    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    /// Whether the query has no clause at all.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }

    fn to_json(&self) -> Value {
        fn render(clauses: &[Query]) -> Value {
            Value::Array(clauses.iter().map(Query::to_json).collect())
        }

        let mut bool_query = Map::new();
        bool_query.insert("must".to_string(), render(&self.must));

        if !self.should.is_empty() {
            bool_query.insert("should".to_string(), render(&self.should));
        }
        if !self.must_not.is_empty() {
            bool_query.insert("must_not".to_string(), render(&self.must_not));
        }
        if !self.filter.is_empty() {
            bool_query.insert("filter".to_string(), render(&self.filter));
        }

        json!({ "bool": bool_query })
    }
}
