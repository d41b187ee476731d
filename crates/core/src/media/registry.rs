//! Lookup of media sources by id.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::MediaSource;
use super::types::MediaSourceError;

/// Media sources available to the engines, keyed by media source id.
#[derive(Default, Clone)]
pub struct MediaSourceRegistry {
    sources: HashMap<i64, Arc<dyn MediaSource>>,
}

impl MediaSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source, replacing any previous source with the same id.
    pub fn register(&mut self, id: i64, source: Arc<dyn MediaSource>) {
        self.sources.insert(id, source);
    }

    pub fn with_source(mut self, id: i64, source: Arc<dyn MediaSource>) -> Self {
        self.register(id, source);
        self
    }

    pub fn get(&self, id: i64) -> Result<Arc<dyn MediaSource>, MediaSourceError> {
        self.sources
            .get(&id)
            .cloned()
            .ok_or(MediaSourceError::UnknownSource(id))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
