use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use super::{FetchError, Transport};

/// A [`Transport`] serving documents from a map, keyed by exact location.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    documents: HashMap<String, Bytes>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `contents` under `location`, replacing any previous document.
    pub fn insert(&mut self, location: impl Into<String>, contents: impl Into<Bytes>) {
        self.documents.insert(location.into(), contents.into());
    }

    pub fn with(mut self, location: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        self.insert(location, contents);
        self
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, location: &str) -> Result<Bytes, FetchError> {
        self.documents
            .get(location)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}
