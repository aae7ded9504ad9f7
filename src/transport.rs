use async_trait::async_trait;
use serde_json::Value;

use crate::{error::Error, request::SearchRequest};

/// The network boundary. The engine hands a fully-formed
/// [`SearchRequest`] to an implementation and receives the raw backend
/// reply; response parsing and pagination live on the caller's side of
/// this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<Value, Error>;
}
