use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Zero-based pagination window, copied verbatim into the outgoing
/// request body and mirrored into the request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub from: u64,
    pub size: u64,
}

impl Pageable {
    pub fn new(from: u64, size: u64) -> Self {
        Self { from, size }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One sort clause. Clauses are appended to the body in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut clause = serde_json::Map::new();
        clause.insert(self.field.clone(), json!({ "order": self.order }));
        Value::Object(clause)
    }
}

/// Backend-native script payload. `source` must be non-blank; this is
/// checked when the script is applied to a request body so a malformed
/// script aborts that construction instead of producing a bad request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub params: BTreeMap<String, Value>,
}

impl Script {
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lang: None,
            params: BTreeMap::new(),
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("script source is blank".to_string());
        }
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        let mut script = serde_json::Map::new();
        script.insert("source".to_string(), Value::String(self.source.clone()));
        if let Some(lang) = &self.lang {
            script.insert("lang".to_string(), Value::String(lang.clone()));
        }
        if !self.params.is_empty() {
            script.insert(
                "params".to_string(),
                Value::Object(self.params.clone().into_iter().collect()),
            );
        }
        Value::Object(script)
    }
}

/// A named computed field backed by a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptField {
    pub name: String,
    pub script: Script,
}

impl ScriptField {
    pub fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }
}

/// Field projection for the `_source` section. An absent or empty side
/// means "no restriction" for that side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,
}

impl SourceFilter {
    pub fn includes(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            includes: Some(fields.into_iter().map(Into::into).collect()),
            excludes: None,
        }
    }

    pub fn excludes(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excludes = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    fn side(fields: &Option<Vec<String>>) -> Option<&[String]> {
        fields.as_deref().filter(|f| !f.is_empty())
    }

    /// Renders the `_source` value, or `None` when neither side
    /// restricts anything.
    pub fn to_value(&self) -> Option<Value> {
        let includes = Self::side(&self.includes);
        let excludes = Self::side(&self.excludes);
        if includes.is_none() && excludes.is_none() {
            return None;
        }

        let mut source = serde_json::Map::new();
        if let Some(includes) = includes {
            source.insert("includes".to_string(), json!(includes));
        }
        if let Some(excludes) = excludes {
            source.insert("excludes".to_string(), json!(excludes));
        }
        Some(Value::Object(source))
    }
}

/// Field collapse clause: at most one hit per distinct value of `field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collapse {
    pub field: String,
}

impl Collapse {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "field": &self.field })
    }
}

/// Search execution mode forwarded to the backend unchanged. The serde
/// form is the backend's wire name (`query_then_fetch`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    QueryThenFetch,
    DfsQueryThenFetch,
}
