use std::collections::BTreeMap;

use serde_json::Value;
use tracing::trace;

use crate::{
    builder::QueryExpression,
    condition::{Arg, Condition},
    context,
    domain::{Collapse, ScriptField, SearchType, Sort, SourceFilter},
    error::Error,
    meta::MethodMeta,
};

/// The query body of a search request: the compiled query expression
/// plus pagination and the optional capability augmentations.
#[derive(Debug, Clone, Default)]
pub struct SearchSource {
    pub query: Option<QueryExpression>,
    pub from: Option<u64>,
    pub size: Option<u64>,
    pub sorts: Vec<Sort>,
    pub script_fields: BTreeMap<String, ScriptField>,
    pub source_filter: Option<SourceFilter>,
    pub collapse: Option<Collapse>,
}

impl SearchSource {
    pub fn set_query(&mut self, query: QueryExpression) -> &mut Self {
        self.query = Some(query);
        self
    }

    pub fn set_window(&mut self, from: u64, size: u64) -> &mut Self {
        self.from = Some(from);
        self.size = Some(size);
        self
    }

    pub fn add_sort(&mut self, sort: Sort) -> &mut Self {
        self.sorts.push(sort);
        self
    }

    pub fn add_script_field(&mut self, field: ScriptField) -> &mut Self {
        self.script_fields.insert(field.name.clone(), field);
        self
    }

    pub fn set_source_filter(&mut self, filter: SourceFilter) -> &mut Self {
        self.source_filter = Some(filter);
        self
    }

    pub fn set_collapse(&mut self, collapse: Collapse) -> &mut Self {
        self.collapse = Some(collapse);
        self
    }

    /// Renders the backend-native JSON body. Sections that were never
    /// set are omitted rather than serialized empty.
    pub fn to_value(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(query) = &self.query {
            body.insert("query".to_string(), query.to_value());
        }
        if let Some(from) = self.from {
            body.insert("from".to_string(), from.into());
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), size.into());
        }
        if !self.sorts.is_empty() {
            let sorts: Vec<Value> = self.sorts.iter().map(Sort::to_value).collect();
            body.insert("sort".to_string(), Value::Array(sorts));
        }
        if !self.script_fields.is_empty() {
            let mut fields = serde_json::Map::new();
            for (name, field) in &self.script_fields {
                let mut wrapper = serde_json::Map::new();
                wrapper.insert("script".to_string(), field.script.to_value());
                fields.insert(name.clone(), Value::Object(wrapper));
            }
            body.insert("script_fields".to_string(), Value::Object(fields));
        }
        if let Some(source) = self.source_filter.as_ref().and_then(SourceFilter::to_value) {
            body.insert("_source".to_string(), source);
        }
        if let Some(collapse) = &self.collapse {
            body.insert("collapse".to_string(), collapse.to_value());
        }
        Value::Object(body)
    }
}

/// A fully-formed search request, ready for the transport layer.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub indices: Vec<String>,
    pub routing: Option<String>,
    pub preference: Option<String>,
    pub search_type: SearchType,
    pub source: SearchSource,
}

impl SearchRequest {
    pub fn new(indices: Vec<String>) -> Self {
        Self {
            indices,
            ..Self::default()
        }
    }

    /// The JSON body shipped to the backend.
    pub fn body(&self) -> Value {
        self.source.to_value()
    }
}

/// Compiles a method's metadata plus one call's arguments into a
/// [`SearchRequest`].
pub struct SearchRequestFactory;

impl SearchRequestFactory {
    /// Orchestration happens in a fixed order: condition resolution,
    /// base request, annotation metadata, strategy-built query,
    /// pagination (mirrored into the request context), capability
    /// augmentations, body attachment. Any failure aborts the whole
    /// construction; no partially built request is returned.
    pub fn create(meta: &MethodMeta, args: &[Arg<'_>]) -> Result<SearchRequest, Error> {
        context::clear();

        let condition_meta = meta.find_condition_parameter();
        let condition: Option<&dyn Condition> = match condition_meta {
            Some(parameter) => Some(parameter.condition_value(meta.name(), args)?),
            None => None,
        };

        let mut request = SearchRequest::new(meta.indices().to_vec());

        if let Some(search) = meta.find_search() {
            if let Some(expr) = &search.routing {
                request.routing = resolve_routing(expr, condition)?;
            }
            request.preference = search
                .preference
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            request.search_type = search.search_type;
        }

        let factory = meta.query_builder_factory();
        let query = factory.create(condition_meta, condition)?;

        let mut source = SearchSource::default();
        source.set_query(query);

        if let Some(parameter) = meta.find_pageable_parameter() {
            let pageable = parameter.pageable_value(meta.name(), args)?;
            context::set_pageable(pageable);
            source.set_window(pageable.from, pageable.size);
        }

        if let Some(condition) = condition {
            apply_providers(condition, &mut source)?;
        }

        trace!(method = %meta.name(), indices = ?request.indices, "assembled search request");

        request.source = source;
        Ok(request)
    }
}

/// Applies the four optional capability augmentations carried by the
/// condition object. Each check is independent and applies at most
/// once; a condition carrying none of them leaves the body untouched.
fn apply_providers(condition: &dyn Condition, source: &mut SearchSource) -> Result<(), Error> {
    for field in condition.script_fields() {
        field.script.validate().map_err(|reason| Error::Augmentation {
            capability: "script_fields",
            condition: condition.type_name(),
            reason,
        })?;
        source.add_script_field(field.clone());
    }

    for sort in condition.sorts() {
        source.add_sort(sort.clone());
    }

    if let Some(filter) = condition.source_filter() {
        source.set_source_filter(filter.clone());
    }

    if let Some(collapse) = condition.collapse() {
        source.set_collapse(collapse.clone());
    }

    Ok(())
}

/// Resolves a declared routing expression against the condition. A
/// `#{field}` placeholder reads the field from the condition document;
/// anything else routes verbatim. Blank expressions and unresolvable
/// placeholders normalize to "no routing".
fn resolve_routing(
    expr: &str,
    condition: Option<&dyn Condition>,
) -> Result<Option<String>, Error> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(None);
    }

    let Some(field) = expr
        .strip_prefix("#{")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Ok(Some(expr.to_string()));
    };

    let Some(condition) = condition else {
        return Ok(None);
    };

    let doc = condition.document()?;
    Ok(doc.get(field.trim()).and_then(routing_value))
}

fn routing_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::{Map, json};

    use super::*;
    use crate::{
        builder::QueryType,
        condition,
        domain::{Pageable, Script},
        meta::SearchAnnotation,
    };

    #[derive(Serialize)]
    struct ByAuthor {
        author: String,
    }

    impl Condition for ByAuthor {
        fn document(&self) -> Result<Map<String, Value>, Error> {
            condition::to_document(self)
        }
    }

    /// A condition carrying every capability at once.
    #[derive(Serialize)]
    struct Dressed {
        author: String,
        #[serde(skip)]
        sorts: Vec<Sort>,
        #[serde(skip)]
        script_fields: Vec<ScriptField>,
        #[serde(skip)]
        source_filter: Option<SourceFilter>,
        #[serde(skip)]
        collapse: Option<Collapse>,
    }

    impl Dressed {
        fn bare(author: &str) -> Self {
            Self {
                author: author.to_string(),
                sorts: Vec::new(),
                script_fields: Vec::new(),
                source_filter: None,
                collapse: None,
            }
        }
    }

    impl Condition for Dressed {
        fn document(&self) -> Result<Map<String, Value>, Error> {
            condition::to_document(self)
        }

        fn script_fields(&self) -> &[ScriptField] {
            &self.script_fields
        }

        fn sorts(&self) -> &[Sort] {
            &self.sorts
        }

        fn source_filter(&self) -> Option<&SourceFilter> {
            self.source_filter.as_ref()
        }

        fn collapse(&self) -> Option<&Collapse> {
            self.collapse.as_ref()
        }
    }

    fn search_meta() -> MethodMeta {
        MethodMeta::builder("BookMapper.search")
            .index("books")
            .condition_parameter()
            .pageable_parameter()
            .build()
            .unwrap()
    }

    #[test]
    fn unconditioned_method_builds_a_match_all_request() {
        let meta = MethodMeta::builder("BookMapper.all")
            .index("books")
            .build()
            .unwrap();

        let request = SearchRequestFactory::create(&meta, &[]).unwrap();
        assert_eq!(request.indices, vec!["books"]);
        assert_eq!(request.body(), json!({ "query": { "match_all": {} } }));
    }

    #[test]
    fn pageable_is_copied_into_body_and_context() {
        let cond = ByAuthor {
            author: "melville".to_string(),
        };
        let args = [
            Arg::Condition(&cond),
            Arg::Pageable(Pageable::new(20, 10)),
        ];

        let request = SearchRequestFactory::create(&search_meta(), &args).unwrap();
        assert_eq!(request.source.from, Some(20));
        assert_eq!(request.source.size, Some(10));

        assert_eq!(
            context::get_and_clear_pageable(),
            Some(Pageable::new(20, 10))
        );
        assert_eq!(context::get_and_clear_pageable(), None);
    }

    #[test]
    fn unpaginated_request_clears_a_stale_context_window() {
        let cond = ByAuthor {
            author: "melville".to_string(),
        };
        let args = [
            Arg::Condition(&cond),
            Arg::Pageable(Pageable::new(20, 10)),
        ];
        SearchRequestFactory::create(&search_meta(), &args).unwrap();

        let meta = MethodMeta::builder("BookMapper.all")
            .index("books")
            .build()
            .unwrap();
        SearchRequestFactory::create(&meta, &[]).unwrap();

        assert_eq!(context::get_and_clear_pageable(), None);
    }

    #[test]
    fn sorts_are_appended_in_declared_order() {
        let mut cond = Dressed::bare("melville");
        cond.sorts = vec![Sort::desc("ts"), Sort::asc("id")];
        let args = [Arg::Condition(&cond), Arg::Pageable(Pageable::new(0, 10))];

        let request = SearchRequestFactory::create(&search_meta(), &args).unwrap();
        assert_eq!(
            request.body()["sort"],
            json!([
                { "ts": { "order": "desc" } },
                { "id": { "order": "asc" } }
            ])
        );
    }

    #[test]
    fn source_filter_projects_exactly_the_includes() {
        let mut cond = Dressed::bare("melville");
        cond.source_filter = Some(SourceFilter::includes(["a", "b"]).excludes(Vec::<String>::new()));
        let args = [Arg::Condition(&cond), Arg::Pageable(Pageable::new(0, 10))];

        let request = SearchRequestFactory::create(&search_meta(), &args).unwrap();
        assert_eq!(request.body()["_source"], json!({ "includes": ["a", "b"] }));
    }

    #[test]
    fn null_collapse_leaves_the_clause_unset() {
        let cond = Dressed::bare("melville");
        let args = [Arg::Condition(&cond), Arg::Pageable(Pageable::new(0, 10))];

        let request = SearchRequestFactory::create(&search_meta(), &args).unwrap();
        assert!(request.source.collapse.is_none());
        assert!(request.body().get("collapse").is_none());
    }

    #[test]
    fn collapse_sets_a_single_field_clause() {
        let mut cond = Dressed::bare("melville");
        cond.collapse = Some(Collapse::new("isbn"));
        let args = [Arg::Condition(&cond), Arg::Pageable(Pageable::new(0, 10))];

        let request = SearchRequestFactory::create(&search_meta(), &args).unwrap();
        assert_eq!(request.body()["collapse"], json!({ "field": "isbn" }));
    }

    #[test]
    fn capability_free_condition_yields_only_the_strategy_query() {
        let cond = ByAuthor {
            author: "melville".to_string(),
        };
        let meta = MethodMeta::builder("BookMapper.by_author")
            .index("books")
            .condition_parameter()
            .build()
            .unwrap();

        let request = SearchRequestFactory::create(&meta, &[Arg::Condition(&cond)]).unwrap();
        let expected = meta
            .query_builder_factory()
            .create(meta.find_condition_parameter(), Some(&cond))
            .unwrap();
        assert_eq!(
            request.body(),
            json!({ "query": expected.to_value() })
        );
    }

    #[test]
    fn malformed_script_aborts_construction_naming_the_capability() {
        let mut cond = Dressed::bare("melville");
        cond.script_fields = vec![ScriptField::new("discounted", Script::inline("  "))];
        let args = [Arg::Condition(&cond), Arg::Pageable(Pageable::new(0, 10))];

        let err = SearchRequestFactory::create(&search_meta(), &args).unwrap_err();
        match err {
            Error::Augmentation {
                capability,
                condition,
                ..
            } => {
                assert_eq!(capability, "script_fields");
                assert!(condition.contains("Dressed"));
            }
            other => panic!("expected augmentation error, got {other}"),
        }
    }

    #[test]
    fn script_fields_are_rendered_under_their_names() {
        let mut cond = Dressed::bare("melville");
        cond.script_fields = vec![ScriptField::new(
            "discounted",
            Script::inline("doc['price'].value * 0.9"),
        )];
        let args = [Arg::Condition(&cond), Arg::Pageable(Pageable::new(0, 10))];

        let request = SearchRequestFactory::create(&search_meta(), &args).unwrap();
        assert_eq!(
            request.body()["script_fields"],
            json!({
                "discounted": { "script": { "source": "doc['price'].value * 0.9" } }
            })
        );
    }

    #[test]
    fn annotation_metadata_is_applied_to_the_request() {
        let meta = MethodMeta::builder("BookMapper.routed")
            .index("books")
            .search(SearchAnnotation {
                routing: Some("#{author}".to_string()),
                preference: Some("  _local  ".to_string()),
                search_type: SearchType::DfsQueryThenFetch,
                query_type: Some(QueryType::Match),
            })
            .condition_parameter()
            .build()
            .unwrap();

        let cond = ByAuthor {
            author: "melville".to_string(),
        };
        let request = SearchRequestFactory::create(&meta, &[Arg::Condition(&cond)]).unwrap();

        assert_eq!(request.routing.as_deref(), Some("melville"));
        assert_eq!(request.preference.as_deref(), Some("_local"));
        assert_eq!(request.search_type, SearchType::DfsQueryThenFetch);
        assert_eq!(
            request.body()["query"],
            json!({ "match": { "author": "melville" } })
        );
    }

    #[test]
    fn blank_routing_normalizes_to_none() {
        let meta = MethodMeta::builder("BookMapper.routed")
            .index("books")
            .search(SearchAnnotation {
                routing: Some("   ".to_string()),
                ..SearchAnnotation::default()
            })
            .build()
            .unwrap();

        let request = SearchRequestFactory::create(&meta, &[]).unwrap();
        assert_eq!(request.routing, None);
    }

    #[test]
    fn literal_routing_passes_through() {
        let meta = MethodMeta::builder("BookMapper.routed")
            .index("books")
            .search(SearchAnnotation {
                routing: Some("shard-7".to_string()),
                ..SearchAnnotation::default()
            })
            .build()
            .unwrap();

        let request = SearchRequestFactory::create(&meta, &[]).unwrap();
        assert_eq!(request.routing.as_deref(), Some("shard-7"));
    }

    #[test]
    fn missing_condition_argument_is_a_mismatch() {
        let err = SearchRequestFactory::create(&search_meta(), &[]).unwrap_err();
        assert!(matches!(err, Error::ArgumentMismatch { position: 0, .. }));
    }
}
