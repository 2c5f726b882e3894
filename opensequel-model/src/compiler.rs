//! Where-clause → query DSL compilation.
//!
//! Every filtered field contributes one clause to a single `bool.must`, in
//! the order the fields were added. Range filters are the exception: their
//! bounds are gathered into one `range` clause with a key per field, placed
//! after all other clauses. A range without any bound contributes nothing.
//!
//! | filter                | clause                                   |
//! |-----------------------|------------------------------------------|
//! | number                | `match` on `field`                       |
//! | string / `exact`      | `match` on `field.keyword`               |
//! | `fuzzy`               | `fuzzy` on `field`, `fuzziness: AUTO`    |
//! | `regex`               | `regexp` on `field.keyword`              |
//! | `wildcard`            | `wildcard` on `field.keyword`            |
//! | `range`               | shared `range`, key `field`              |
//! | `exists`              | `exists` on `field`                      |

use crate::{
    error::Result,
    filter::{Filter, Fuzziness, Literal, Where},
    query::{BoolQuery, ExistsQuery, FuzzyQuery, MatchQuery, Query, RangeQuery, RegexpQuery, WildcardQuery},
};
use serde_json::Value;

const KEYWORD_SUFFIX: &str = ".keyword";

fn keyword(field: &str) -> String {
    format!("{}{}", field, KEYWORD_SUFFIX)
}

/// Compile a where-clause into a `bool` query.
///
/// Never fails; an empty where-clause yields a `bool` with an empty `must`
/// (see [`Query::or_match_all`]).
pub fn compile(filters: &Where) -> Query {
    let mut must = Vec::with_capacity(filters.len());
    let mut ranges = RangeQuery::new();

    for (field, filter) in filters.iter() {
        match filter {
            Filter::Literal(Literal::Text(value)) => {
                must.push(Query::Match(MatchQuery::new(keyword(field), value.as_str())));
            }
            Filter::Literal(number) => {
                must.push(Query::Match(MatchQuery::new(field, number.to_value())));
            }
            Filter::Exact(value) => {
                must.push(Query::Match(MatchQuery::new(keyword(field), value.as_str())));
            }
            Filter::Fuzzy(fuzzy) => {
                let mut options = fuzzy.clone();
                options.fuzziness.get_or_insert_with(Fuzziness::auto);
                must.push(Query::Fuzzy(FuzzyQuery {
                    field: field.to_string(),
                    options,
                }));
            }
            Filter::Regex(regex) => {
                must.push(Query::Regexp(RegexpQuery {
                    field: keyword(field),
                    options: regex.clone(),
                }));
            }
            Filter::Wildcard(wildcard) => {
                must.push(Query::Wildcard(WildcardQuery {
                    field: keyword(field),
                    options: wildcard.clone(),
                }));
            }
            Filter::Range(range) => {
                if range.has_bounds() {
                    ranges = ranges.field(field, range.clone());
                }
            }
            Filter::Exists => {
                must.push(Query::Exists(ExistsQuery::new(field)));
            }
        }
    }

    if !ranges.is_empty() {
        must.push(Query::Range(ranges));
    }

    Query::Bool(BoolQuery {
        must,
        ..BoolQuery::default()
    })
}

/// Parse a JSON where-clause and compile it.
///
/// Fails with [`ModelError::UnsupportedFilter`](crate::ModelError::UnsupportedFilter)
/// when a field carries a value that is not a known filter shape.
pub fn compile_json(filters: &Value) -> Result<Query> {
    Ok(compile(&Where::from_json(filters)?))
}
