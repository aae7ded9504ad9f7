use serde_json::{Value, json};

use crate::{condition::Condition, error::Error, meta::ParameterMeta};

/// Strategy selector declared on a mapped method. Every variant maps to
/// exactly one builder strategy through the fixed [`QueryType::factory`]
/// table; [`QueryType::Auto`] is the default when a method declares no
/// explicit type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryType {
    #[default]
    Auto,
    /// Single-field match query.
    Match,
    /// Multi-clause boolean query; every condition field becomes a
    /// `must` clause.
    Bool,
    /// The condition document is used verbatim as the query expression.
    Raw,
}

impl QueryType {
    /// Fixed type-to-strategy table. Exhaustive by construction, so a
    /// declared type can never be left without a strategy.
    pub fn factory(self) -> &'static dyn QueryBuilderFactory {
        match self {
            QueryType::Auto => &AutoQueryBuilderFactory,
            QueryType::Match => &MatchQueryBuilderFactory,
            QueryType::Bool => &BoolQueryBuilderFactory,
            QueryType::Raw => &RawQueryBuilderFactory,
        }
    }
}

/// Backend-native representation of "what to match".
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    MatchAll,
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Match { field: String, value: Value },
    Bool { must: Vec<QueryExpression> },
    Raw(Value),
}

impl QueryExpression {
    pub fn to_value(&self) -> Value {
        match self {
            QueryExpression::MatchAll => json!({ "match_all": {} }),
            QueryExpression::Term { field, value } => {
                Self::keyed("term", field.clone(), value.clone())
            }
            QueryExpression::Terms { field, values } => {
                Self::keyed("terms", field.clone(), json!(values))
            }
            QueryExpression::Match { field, value } => {
                Self::keyed("match", field.clone(), value.clone())
            }
            QueryExpression::Bool { must } => {
                let must: Vec<Value> = must.iter().map(QueryExpression::to_value).collect();
                json!({ "bool": { "must": must } })
            }
            QueryExpression::Raw(value) => value.clone(),
        }
    }

    fn keyed(kind: &str, field: String, value: Value) -> Value {
        let mut inner = serde_json::Map::new();
        inner.insert(field, value);
        let mut outer = serde_json::Map::new();
        outer.insert(kind.to_string(), Value::Object(inner));
        Value::Object(outer)
    }

    /// The natural clause for one condition field: text matches, arrays
    /// become a terms lookup, everything else filters by exact term.
    fn clause(field: String, value: Value) -> QueryExpression {
        match value {
            Value::String(_) => QueryExpression::Match { field, value },
            Value::Array(values) => QueryExpression::Terms { field, values },
            value => QueryExpression::Term { field, value },
        }
    }
}

/// A query-building strategy: a pure function from a condition value to
/// a query expression. Must yield a valid (match-all) expression when
/// the condition is absent.
pub trait QueryBuilderFactory: Send + Sync {
    fn create(
        &self,
        parameter: Option<&ParameterMeta>,
        condition: Option<&dyn Condition>,
    ) -> Result<QueryExpression, Error>;
}

fn document_of(
    condition: Option<&dyn Condition>,
) -> Result<serde_json::Map<String, Value>, Error> {
    match condition {
        Some(condition) => condition.document(),
        None => Ok(serde_json::Map::new()),
    }
}

/// Default strategy: match-all for an empty condition, a single natural
/// clause for one field, a boolean `must` of natural clauses otherwise.
pub struct AutoQueryBuilderFactory;

impl QueryBuilderFactory for AutoQueryBuilderFactory {
    fn create(
        &self,
        _parameter: Option<&ParameterMeta>,
        condition: Option<&dyn Condition>,
    ) -> Result<QueryExpression, Error> {
        let doc = document_of(condition)?;
        if doc.len() > 1 {
            return Ok(QueryExpression::Bool {
                must: doc
                    .into_iter()
                    .map(|(field, value)| QueryExpression::clause(field, value))
                    .collect(),
            });
        }
        match doc.into_iter().next() {
            Some((field, value)) => Ok(QueryExpression::clause(field, value)),
            None => Ok(QueryExpression::MatchAll),
        }
    }
}

/// Single-field match strategy. Rejects multi-field conditions instead
/// of guessing which field was meant.
pub struct MatchQueryBuilderFactory;

impl QueryBuilderFactory for MatchQueryBuilderFactory {
    fn create(
        &self,
        _parameter: Option<&ParameterMeta>,
        condition: Option<&dyn Condition>,
    ) -> Result<QueryExpression, Error> {
        let doc = document_of(condition)?;
        if doc.len() > 1 {
            return Err(Error::QueryBuild(format!(
                "match strategy expects a single-field condition, got {} fields",
                doc.len()
            )));
        }
        match doc.into_iter().next() {
            Some((field, value)) => Ok(QueryExpression::Match { field, value }),
            None => Ok(QueryExpression::MatchAll),
        }
    }
}

/// Boolean strategy: every condition field becomes a `must` clause, in
/// document order.
pub struct BoolQueryBuilderFactory;

impl QueryBuilderFactory for BoolQueryBuilderFactory {
    fn create(
        &self,
        _parameter: Option<&ParameterMeta>,
        condition: Option<&dyn Condition>,
    ) -> Result<QueryExpression, Error> {
        let doc = document_of(condition)?;
        if doc.is_empty() {
            return Ok(QueryExpression::MatchAll);
        }
        Ok(QueryExpression::Bool {
            must: doc
                .into_iter()
                .map(|(field, value)| QueryExpression::clause(field, value))
                .collect(),
        })
    }
}

/// Pass-through strategy: the condition document already is the query
/// expression.
pub struct RawQueryBuilderFactory;

impl QueryBuilderFactory for RawQueryBuilderFactory {
    fn create(
        &self,
        _parameter: Option<&ParameterMeta>,
        condition: Option<&dyn Condition>,
    ) -> Result<QueryExpression, Error> {
        let doc = document_of(condition)?;
        if doc.is_empty() {
            return Ok(QueryExpression::MatchAll);
        }
        Ok(QueryExpression::Raw(Value::Object(doc)))
    }
}
