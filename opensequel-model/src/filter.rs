//! Where-clause filter expressions.
//!
//! A [`Where`] maps field names to [`Filter`]s. Filters are a closed set:
//! anything arriving as untyped JSON is parsed into one of the variants or
//! rejected with [`ModelError::UnsupportedFilter`].

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Plain scalar compared for equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer value, matched on the bare field.
    Integer(i64),
    /// Integer above `i64::MAX`, matched on the bare field.
    Unsigned(u64),
    /// Floating point value, matched on the bare field.
    Float(f64),
    /// String value, matched on the `.keyword` sub-field.
    Text(String),
}

impl Literal {
    /// JSON form of the literal.
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Integer(n) => json!(n),
            Literal::Unsigned(n) => json!(n),
            Literal::Float(n) => json!(n),
            Literal::Text(s) => json!(s),
        }
    }

    /// Whether the literal can be sent: NaN and infinities have no JSON form.
    pub fn is_finite(&self) -> bool {
        match self {
            Literal::Float(n) => n.is_finite(),
            _ => true,
        }
    }
}

macro_rules! literal_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Literal {
                fn from(value: $source) -> Self {
                    Literal::$variant(value as $target)
                }
            }

            impl From<$source> for Filter {
                fn from(value: $source) -> Self {
                    Filter::Literal(Literal::from(value))
                }
            }
        )+
    };
}

literal_from!(Integer as i64: i8, i16, i32, i64, u8, u16, u32);
literal_from!(Unsigned as u64: u64);
literal_from!(Float as f64: f64);

// Widened through the shortest decimal form, so `0.1f32` stays `0.1`.
impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Literal::Float(value.to_string().parse().unwrap_or(f64::from(value)))
    }
}

impl From<f32> for Filter {
    fn from(value: f32) -> Self {
        Filter::Literal(Literal::from(value))
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::Literal(value.into())
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Filter::Literal(value.into())
    }
}

/// Edit distance allowed by a fuzzy match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fuzziness {
    /// Fixed number of edits.
    Edits(u8),
    /// Engine expression such as `AUTO` or `AUTO:3,6`.
    Expr(String),
}

impl Fuzziness {
    /// `AUTO`: edit distance derived from term length.
    pub fn auto() -> Self {
        Fuzziness::Expr("AUTO".to_string())
    }
}

/// Approximate text match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct FuzzyFilter {
    /// Term to match.
    pub value: String,
    /// Allowed edit distance; `AUTO` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<Fuzziness>,
    /// Maximum number of term variations.
    #[serde(default, alias = "max_expansions", skip_serializing_if = "Option::is_none")]
    pub max_expansions: Option<u32>,
    /// Leading characters that must match exactly.
    #[serde(default, alias = "prefix_length", skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u32>,
    /// Multi-term rewrite method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
    /// Whether swapping two adjacent characters counts as one edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpositions: Option<bool>,
}

impl FuzzyFilter {
    /// Fuzzy match on `value` with engine defaults.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            fuzziness: None,
            max_expansions: None,
            prefix_length: None,
            rewrite: None,
            transpositions: None,
        }
    }

    /// Set fuzziness.
    pub fn fuzziness(mut self, fuzziness: Fuzziness) -> Self {
        self.fuzziness = Some(fuzziness);
        self
    }

    /// Set the maximum number of expansions.
    pub fn max_expansions(mut self, max: u32) -> Self {
        self.max_expansions = Some(max);
        self
    }

    /// Set the exact-match prefix length.
    pub fn prefix_length(mut self, len: u32) -> Self {
        self.prefix_length = Some(len);
        self
    }

    /// Set the rewrite method.
    pub fn rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }

    /// Allow or forbid transpositions.
    pub fn transpositions(mut self, enabled: bool) -> Self {
        self.transpositions = Some(enabled);
        self
    }
}

/// Regular expression (Lucene syntax) against the keyword form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct RegexFilter {
    /// Pattern.
    pub value: String,
    /// Case-insensitive matching.
    #[serde(default, alias = "case_insensitive", skip_serializing_if = "Option::is_none")]
    pub case_insensitive: Option<bool>,
    /// Enabled operators, e.g. `ALL` or `COMPLEMENT|INTERVAL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    /// Automaton state limit.
    #[serde(
        default,
        alias = "max_determinized_states",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_determinized_states: Option<u32>,
    /// Multi-term rewrite method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

impl RegexFilter {
    /// Match `pattern`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            value: pattern.into(),
            case_insensitive: None,
            flags: None,
            max_determinized_states: None,
            rewrite: None,
        }
    }

    /// Ignore case.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = Some(enabled);
        self
    }

    /// Set operator flags.
    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    /// Set the automaton state limit.
    pub fn max_determinized_states(mut self, max: u32) -> Self {
        self.max_determinized_states = Some(max);
        self
    }

    /// Set the rewrite method.
    pub fn rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }
}

/// Glob-style pattern (`*`, `?`) against the keyword form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct WildcardFilter {
    /// Pattern.
    pub value: String,
    /// Case-insensitive matching.
    #[serde(default, alias = "case_insensitive", skip_serializing_if = "Option::is_none")]
    pub case_insensitive: Option<bool>,
    /// Relevance boost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
    /// Multi-term rewrite method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

impl WildcardFilter {
    /// Match `pattern`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            value: pattern.into(),
            case_insensitive: None,
            boost: None,
            rewrite: None,
        }
    }

    /// Ignore case.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = Some(enabled);
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Set the rewrite method.
    pub fn rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }
}

/// How a range query treats range-typed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RangeRelation {
    /// Field range overlaps the query range.
    Intersects,
    /// Field range contains the query range.
    Contains,
    /// Field range lies inside the query range.
    Within,
}

/// Numeric or date interval. Bounds are numbers or date strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct RangeFilter {
    /// Greater than.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Greater than or equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Less than.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Less than or equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    /// Date format of string bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Relation for range-typed fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RangeRelation>,
    /// Relevance boost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
    /// Time zone applied to date bounds.
    #[serde(default, alias = "time_zone", alias = "timezone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RangeFilter {
    /// Unbounded range; add bounds with the builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set greater than.
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// Set greater than or equal.
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// Set less than.
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// Set less than or equal.
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    /// Set date format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set relation.
    pub fn relation(mut self, relation: RangeRelation) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Set time zone.
    pub fn time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }

    /// Whether at least one of `gt`, `gte`, `lt`, `lte` is set.
    pub fn has_bounds(&self) -> bool {
        self.gt.is_some() || self.gte.is_some() || self.lt.is_some() || self.lte.is_some()
    }
}

/// Filter attached to one field of a where-clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Implicit equality.
    Literal(Literal),
    /// Exact match on the keyword form.
    Exact(String),
    /// Approximate text match.
    Fuzzy(FuzzyFilter),
    /// Regular expression on the keyword form.
    Regex(RegexFilter),
    /// Glob pattern on the keyword form.
    Wildcard(WildcardFilter),
    /// Interval on a numeric or date field.
    Range(RangeFilter),
    /// Field has a value.
    Exists,
}

impl Filter {
    /// Exact match.
    pub fn exact(value: impl Into<String>) -> Self {
        Filter::Exact(value.into())
    }

    /// Fuzzy match with default options.
    pub fn fuzzy(value: impl Into<String>) -> Self {
        Filter::Fuzzy(FuzzyFilter::new(value))
    }

    /// Regular expression with default options.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Filter::Regex(RegexFilter::new(pattern))
    }

    /// Wildcard with default options.
    pub fn wildcard(pattern: impl Into<String>) -> Self {
        Filter::Wildcard(WildcardFilter::new(pattern))
    }

    /// Existence check.
    pub fn exists() -> Self {
        Filter::Exists
    }

    /// Parse the JSON form of a filter attached to `field`.
    ///
    /// Strings and numbers are literals; objects carry a `type` of `exact`,
    /// `fuzzy`, `regex`, `wildcard`, `range` or `exists`.
    pub fn from_json(field: &str, value: &Value) -> Result<Self> {
        let unsupported = |reason: String| ModelError::UnsupportedFilter {
            field: field.to_string(),
            reason,
        };

        match value {
            Value::String(s) => Ok(Filter::Literal(Literal::Text(s.clone()))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Filter::Literal(Literal::Integer(i)))
                } else if let Some(u) = n.as_u64() {
                    Ok(Filter::Literal(Literal::Unsigned(u)))
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| Filter::Literal(Literal::Float(f)))
                        .ok_or_else(|| unsupported(format!("number {} is out of range", n)))
                }
            }
            Value::Object(map) => {
                if !map.get("type").is_some_and(Value::is_string) {
                    return Err(unsupported("object filter needs a string `type`".to_string()));
                }
                let tagged: TaggedFilter = serde_json::from_value(value.clone())
                    .map_err(|e| unsupported(e.to_string()))?;
                Ok(tagged.into())
            }
            Value::Bool(_) => Err(unsupported("boolean values are not a filter".to_string())),
            Value::Null => Err(unsupported("null is not a filter".to_string())),
            Value::Array(_) => Err(unsupported("arrays are not a filter".to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedFilter {
    Exact { value: String },
    Fuzzy(FuzzyFilter),
    #[serde(alias = "regexp")]
    Regex(RegexFilter),
    Wildcard(WildcardFilter),
    Range(RangeFilter),
    Exists,
}

impl From<TaggedFilter> for Filter {
    fn from(tagged: TaggedFilter) -> Self {
        match tagged {
            TaggedFilter::Exact { value } => Filter::Exact(value),
            TaggedFilter::Fuzzy(f) => Filter::Fuzzy(f),
            TaggedFilter::Regex(f) => Filter::Regex(f),
            TaggedFilter::Wildcard(f) => Filter::Wildcard(f),
            TaggedFilter::Range(f) => Filter::Range(f),
            TaggedFilter::Exists => Filter::Exists,
        }
    }
}

impl From<Literal> for Filter {
    fn from(value: Literal) -> Self {
        Filter::Literal(value)
    }
}

impl From<FuzzyFilter> for Filter {
    fn from(value: FuzzyFilter) -> Self {
        Filter::Fuzzy(value)
    }
}

impl From<RegexFilter> for Filter {
    fn from(value: RegexFilter) -> Self {
        Filter::Regex(value)
    }
}

impl From<WildcardFilter> for Filter {
    fn from(value: WildcardFilter) -> Self {
        Filter::Wildcard(value)
    }
}

impl From<RangeFilter> for Filter {
    fn from(value: RangeFilter) -> Self {
        Filter::Range(value)
    }
}

/// Ordered field → filter mapping. Each field appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    fields: Vec<(String, Filter)>,
}

impl Where {
    /// Empty where-clause (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter `field`. A second filter on the same field replaces the first
    /// in place.
    pub fn field(mut self, field: impl Into<String>, filter: impl Into<Filter>) -> Self {
        let field = field.into();
        let filter = filter.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = filter,
            None => self.fields.push((field, filter)),
        }
        self
    }

    /// Parse a JSON object of field → filter.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(ModelError::UnsupportedFilter {
                    field: String::new(),
                    reason: format!("where-clause must be an object, got {}", other),
                });
            }
        };

        map.iter().try_fold(Self::new(), |acc, (field, filter)| {
            Ok(acc.field(field.clone(), Filter::from_json(field, filter)?))
        })
    }

    /// Check every filter can be rendered. Float literals must be finite.
    pub fn validate(&self) -> Result<()> {
        for (field, filter) in &self.fields {
            if let Filter::Literal(literal) = filter {
                if !literal.is_finite() {
                    return Err(ModelError::UnsupportedFilter {
                        field: field.clone(),
                        reason: format!("{:?} is not a finite number", literal),
                    });
                }
            }
        }
        Ok(())
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.fields.iter().map(|(name, filter)| (name.as_str(), filter))
    }

    /// Number of filtered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is filtered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, F: Into<Filter>> FromIterator<(K, F)> for Where {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |acc, (field, filter)| acc.field(field, filter))
    }
}
