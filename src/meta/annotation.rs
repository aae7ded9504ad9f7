use crate::{builder::QueryType, domain::SearchType};

/// Declared metadata for a single-search mapped method: per-request
/// routing/preference/search-mode plus an optional explicit query type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchAnnotation {
    /// Routing expression. A literal string routes verbatim; a
    /// `#{field}` placeholder resolves against the condition document.
    /// Blank normalizes to "no routing".
    pub routing: Option<String>,
    /// Blank normalizes to "no preference".
    pub preference: Option<String>,
    pub search_type: SearchType,
    pub query_type: Option<QueryType>,
}

impl SearchAnnotation {
    pub fn query_type(query_type: QueryType) -> Self {
        Self {
            query_type: Some(query_type),
            ..Self::default()
        }
    }
}

/// Declared metadata for a multi-search mapped method. Only consulted
/// for strategy resolution when no single-search annotation names an
/// explicit query type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSearchAnnotation {
    pub query_type: Option<QueryType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Search(SearchAnnotation),
    MultiSearch(MultiSearchAnnotation),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Search(_) => AnnotationKind::Search,
            Annotation::MultiSearch(_) => AnnotationKind::MultiSearch,
        }
    }

    pub fn as_search(&self) -> Option<&SearchAnnotation> {
        match self {
            Annotation::Search(search) => Some(search),
            _ => None,
        }
    }

    pub fn as_multi_search(&self) -> Option<&MultiSearchAnnotation> {
        match self {
            Annotation::MultiSearch(multi) => Some(multi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Search,
    MultiSearch,
}
