//! # Zetesis
//!
//! *ζήτησις — Ancient Greek for "search" or "inquiry".*
//!
//! Zetesis is a declarative search-request mapper. A caller declares,
//! per mapped method, the shape of a search query — target indices,
//! routing, preference, search mode, query-type hint, and which
//! parameters carry the condition object and the pagination window —
//! and the engine compiles those declarations plus runtime arguments
//! into a fully-formed request for a document-oriented search backend.
//!
//! ## How a request is compiled
//!
//! 1. The method's [`MethodMeta`] names the condition parameter; its
//!    value is extracted from the argument list (absent is legal and
//!    means "broadest valid query").
//! 2. A base request is addressed at the method's indices, and the
//!    declared routing/preference/search-mode are applied.
//! 3. The method's [`QueryType`] — explicit on its annotation, or
//!    `Auto` — selects a builder strategy through a fixed table,
//!    memoized per method, and the strategy compiles the condition into
//!    a [`QueryExpression`].
//! 4. A present pagination parameter is copied into the body's
//!    from/size and mirrored into the [`context`] for the
//!    response-pagination stage.
//! 5. The condition's optional capabilities (script fields, sorts,
//!    source filtering, collapsing) each augment the body at most once.
//!
//! ```rust,ignore
//! let meta = MethodMeta::builder("BookMapper.search")
//!     .index("books")
//!     .condition_parameter()
//!     .pageable_parameter()
//!     .build()?;
//!
//! let mapper = Mapper::new(Box::new(transport));
//! mapper.register(meta)?;
//!
//! let hits = mapper
//!     .search("BookMapper.search", &[
//!         Arg::Condition(&by_author),
//!         Arg::Pageable(Pageable::new(0, 20)),
//!     ])
//!     .await?;
//! ```
//!
//! Authentication, cluster topology, index management, and response
//! deserialization are out of scope; they belong to the [`Transport`]
//! implementation and to the caller.

pub mod builder;
pub mod condition;
pub mod context;
pub mod domain;
pub mod error;
pub mod meta;
pub mod request;
pub mod transport;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Instant,
};

use metrics::histogram;
use serde_json::Value;
use tracing::debug;

pub use crate::builder::{QueryBuilderFactory, QueryExpression, QueryType};
pub use crate::condition::{Arg, Condition};
pub use crate::domain::*;
pub use crate::error::Error;
pub use crate::meta::{
    Annotation, AnnotationKind, MethodMeta, MethodMetaBuilder, MultiSearchAnnotation,
    ParameterMeta, ParameterRole, SearchAnnotation,
};
pub use crate::request::{SearchRequest, SearchRequestFactory, SearchSource};
pub use crate::transport::Transport;

/// The Mapper is the primary interface for dispatching mapped search
/// methods. It owns the method registry and the transport, and is cheap
/// to clone and share across tasks.
#[derive(Clone)]
pub struct Mapper {
    inner: Arc<Zetesis>,
}

struct Zetesis {
    transport: Box<dyn Transport>,
    // Read-mostly: written during startup registration, read per call.
    methods: RwLock<HashMap<String, Arc<MethodMeta>>>,
}

impl Mapper {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Zetesis {
                transport,
                methods: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Registers a mapped method. Intended to run once per method at
    /// wiring time, so declaration defects surface at startup rather
    /// than on the first call. A duplicate id is a configuration error.
    pub fn register(&self, meta: MethodMeta) -> Result<Arc<MethodMeta>, Error> {
        let meta = Arc::new(meta);
        let mut methods = self
            .inner
            .methods
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if methods.contains_key(meta.name()) {
            return Err(Error::Config(format!(
                "method `{}` is already registered",
                meta.name()
            )));
        }

        debug!(method = %meta.name(), indices = ?meta.indices(), "registered mapped method");
        methods.insert(meta.name().to_string(), Arc::clone(&meta));
        Ok(meta)
    }

    /// Looks up a registered method's metadata.
    pub fn method(&self, name: &str) -> Option<Arc<MethodMeta>> {
        self.inner
            .methods
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Compiles a request for a registered method without dispatching
    /// it. The pagination window, if any, is mirrored into [`context`].
    pub fn create_request(&self, name: &str, args: &[Arg<'_>]) -> Result<SearchRequest, Error> {
        let meta = self.method(name).ok_or_else(|| {
            Error::Config(format!("method `{}` is not registered", name))
        })?;
        SearchRequestFactory::create(&meta, args)
    }

    /// Compiles and dispatches a mapped search call, returning the raw
    /// backend reply.
    ///
    /// The pagination context is thread-local and the task may resume
    /// on a different thread after the transport await, so the window
    /// travels with the call: it is taken off the constructing thread
    /// here and re-seeded on whichever thread hands the reply back,
    /// where the response-pagination collaborator will read it.
    pub async fn search(&self, name: &str, args: &[Arg<'_>]) -> Result<Value, Error> {
        let request = self.create_request(name, args)?;
        let window = context::get_and_clear_pageable();

        let start = Instant::now();
        let reply = self.inner.transport.search(request).await;
        histogram!("zetesis.search.duration_ms",
            "method" => name.to_string()
        )
        .record(start.elapsed().as_millis() as f64);

        if let Some(window) = window {
            context::set_pageable(window);
        }
        reply
    }
}
