pub mod annotation;
pub mod parameter;

pub use annotation::*;
use once_cell::sync::OnceCell;
pub use parameter::*;
use tracing::debug;

use crate::{
    builder::{QueryBuilderFactory, QueryType},
    error::Error,
};

/// Immutable description of one mapped method: its unique id, target
/// indices, declared annotations, and ordered parameter metadata.
///
/// Built once per method via [`MethodMetaBuilder`], validated at build
/// time, and cached by the mapper registry for the process lifetime. The
/// resolved query type is memoized inside the meta itself; concurrent
/// first use races benignly on a `OnceCell` and every caller observes
/// the same fully-built value.
#[derive(Debug)]
pub struct MethodMeta {
    name: String,
    indices: Vec<String>,
    annotations: Vec<Annotation>,
    parameters: Vec<ParameterMeta>,
    resolved_query_type: OnceCell<QueryType>,
}

impl MethodMeta {
    pub fn builder(name: impl Into<String>) -> MethodMetaBuilder {
        MethodMetaBuilder::new(name)
    }

    /// Unique method id, e.g. `"UserMapper.search"`. Registry cache key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target collection names. Never empty.
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    pub fn parameters(&self) -> &[ParameterMeta] {
        &self.parameters
    }

    pub fn find_annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.kind() == kind)
    }

    pub fn find_search(&self) -> Option<&SearchAnnotation> {
        self.annotations.iter().find_map(Annotation::as_search)
    }

    pub fn find_multi_search(&self) -> Option<&MultiSearchAnnotation> {
        self.annotations.iter().find_map(Annotation::as_multi_search)
    }

    /// The single condition parameter, if the method declares one.
    pub fn find_condition_parameter(&self) -> Option<&ParameterMeta> {
        self.parameters
            .iter()
            .find(|p| p.role() == ParameterRole::Condition)
    }

    /// The single pagination parameter, if the method declares one.
    pub fn find_pageable_parameter(&self) -> Option<&ParameterMeta> {
        self.parameters
            .iter()
            .find(|p| p.role() == ParameterRole::Pageable)
    }

    /// Resolved query type for this method, memoized on first use.
    ///
    /// Precedence: the single-search annotation's explicit type, else
    /// the multi-search annotation's explicit type, else [`QueryType::Auto`].
    /// Resolution is a pure function of the (immutable) annotations, so
    /// racing initializers always converge on the same value.
    pub fn resolved_query_type(&self) -> QueryType {
        *self.resolved_query_type.get_or_init(|| {
            let resolved = self
                .find_search()
                .and_then(|s| s.query_type)
                .or_else(|| self.find_multi_search().and_then(|m| m.query_type))
                .unwrap_or(QueryType::Auto);
            debug!(method = %self.name, query_type = ?resolved, "resolved query builder strategy");
            resolved
        })
    }

    /// The builder strategy for this method, via the fixed
    /// type-to-strategy table.
    pub fn query_builder_factory(&self) -> &'static dyn QueryBuilderFactory {
        self.resolved_query_type().factory()
    }
}

/// Builder for [`MethodMeta`]. Declaration problems (duplicate condition
/// or pagination roles, empty indices) surface here, at metadata-build
/// time, never at call time.
#[derive(Debug, Default)]
pub struct MethodMetaBuilder {
    name: String,
    indices: Vec<String>,
    annotations: Vec<Annotation>,
    roles: Vec<ParameterRole>,
}

impl MethodMetaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn indices(mut self, indices: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.indices.extend(indices.into_iter().map(Into::into));
        self
    }

    pub fn search(self, annotation: SearchAnnotation) -> Self {
        self.annotation(Annotation::Search(annotation))
    }

    pub fn multi_search(self, annotation: MultiSearchAnnotation) -> Self {
        self.annotation(Annotation::MultiSearch(annotation))
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Appends one formal parameter; position is declaration order.
    pub fn parameter(mut self, role: ParameterRole) -> Self {
        self.roles.push(role);
        self
    }

    pub fn condition_parameter(self) -> Self {
        self.parameter(ParameterRole::Condition)
    }

    pub fn pageable_parameter(self) -> Self {
        self.parameter(ParameterRole::Pageable)
    }

    pub fn build(self) -> Result<MethodMeta, Error> {
        if self.indices.is_empty() {
            return Err(Error::Config(format!(
                "method `{}` declares no target index",
                self.name
            )));
        }

        let conditions = self.count_role(ParameterRole::Condition);
        if conditions > 1 {
            return Err(Error::Config(format!(
                "method `{}` declares {} condition parameters, at most one is allowed",
                self.name, conditions
            )));
        }

        let pageables = self.count_role(ParameterRole::Pageable);
        if pageables > 1 {
            return Err(Error::Config(format!(
                "method `{}` declares {} pageable parameters, at most one is allowed",
                self.name, pageables
            )));
        }

        let parameters = self
            .roles
            .into_iter()
            .enumerate()
            .map(|(position, role)| ParameterMeta::new(position, role))
            .collect();

        Ok(MethodMeta {
            name: self.name,
            indices: self.indices,
            annotations: self.annotations,
            parameters,
            resolved_query_type: OnceCell::new(),
        })
    }

    fn count_role(&self, role: ParameterRole) -> usize {
        self.roles.iter().filter(|r| **r == role).count()
    }
}
