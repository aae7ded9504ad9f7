use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    domain::{Collapse, Pageable, ScriptField, Sort, SourceFilter},
    error::Error,
};

/// A caller-supplied value encoding query intent.
///
/// The engine treats conditions opaquely: it only ever asks for the
/// flattened [`document`](Condition::document) (consumed by the query
/// builder strategies and by routing expressions) and for the four
/// optional capability accessors. Each accessor has an empty default, so
/// a plain condition implements nothing beyond `document`:
///
/// ```rust,ignore
/// #[derive(Serialize)]
/// struct ByAuthor { author: String }
///
/// impl Condition for ByAuthor {
///     fn document(&self) -> Result<Map<String, Value>, Error> {
///         condition::to_document(self)
///     }
/// }
/// ```
pub trait Condition: Send + Sync {
    /// Flattens the condition into field/value pairs. Strategies derive
    /// their clauses from this projection; `None`-valued fields must not
    /// appear in it (see [`to_document`]).
    fn document(&self) -> Result<Map<String, Value>, Error>;

    /// Named computed fields to add to the request body. Applied only
    /// when non-empty.
    fn script_fields(&self) -> &[ScriptField] {
        &[]
    }

    /// Sort clauses, appended to the body in declared order. Applied
    /// only when non-empty.
    fn sorts(&self) -> &[Sort] {
        &[]
    }

    /// Field projection for the response `_source` section.
    fn source_filter(&self) -> Option<&SourceFilter> {
        None
    }

    /// Field-collapse clause; `None` leaves the request uncollapsed.
    fn collapse(&self) -> Option<&Collapse> {
        None
    }

    /// Concrete type name, used to attribute augmentation errors.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Serde bridge for [`Condition::document`]: serializes the condition to
/// a JSON object and drops null fields so unset optionals do not become
/// query clauses.
pub fn to_document<T: Serialize + ?Sized>(condition: &T) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(condition).map_err(|e| Error::Serialize(e.to_string()))? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(Error::Serialize(format!(
            "condition must serialize to an object, got `{}`",
            value_kind(other)
        ))),
    }
}

fn value_kind(value: Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One runtime argument of a mapped-method call, in declaration order.
/// The variant must agree with the [`ParameterRole`] declared at the
/// same position.
///
/// [`ParameterRole`]: crate::meta::ParameterRole
pub enum Arg<'a> {
    /// A plain value the engine passes through without inspection.
    Value(Value),
    Condition(&'a dyn Condition),
    Pageable(Pageable),
}

impl std::fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Condition(c) => f.debug_tuple("Condition").field(&c.type_name()).finish(),
            Arg::Pageable(p) => f.debug_tuple("Pageable").field(p).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct ByAuthor {
        author: String,
        year: Option<u32>,
    }

    #[test]
    fn to_document_drops_null_fields() {
        let doc = to_document(&ByAuthor {
            author: "melville".to_string(),
            year: None,
        })
        .unwrap();

        assert_eq!(doc.len(), 1);
        assert_eq!(doc["author"], json!("melville"));
    }

    #[test]
    fn to_document_rejects_non_objects() {
        let err = to_document(&42u32).unwrap_err();
        assert!(matches!(err, Error::Serialize(_)));
    }
}
