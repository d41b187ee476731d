//! Lookup of codecs by template kind.

use std::collections::HashMap;
use std::sync::Arc;

use super::native::NativeJsonCodec;
use super::traits::AnnotationCodec;

/// Holds the codecs available to the pipeline, keyed by kind.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn AnnotationCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in codecs.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NativeJsonCodec));
        registry
    }

    /// Register a codec, replacing any codec of the same kind.
    pub fn register(&mut self, codec: Arc<dyn AnnotationCodec>) {
        self.codecs.insert(codec.kind().to_string(), codec);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn AnnotationCodec>> {
        self.codecs.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCodec;

    #[test]
    fn test_builtin_registry() {
        let registry = CodecRegistry::with_builtin();
        assert!(registry.get("native").is_some());
        assert!(registry.get("coco").is_none());
        assert_eq!(registry.kinds(), vec!["native"]);
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mock = Arc::new(MockCodec::with_kind("native"));
        let mut registry = CodecRegistry::with_builtin();
        registry.register(mock.clone());
        registry.register(Arc::new(MockCodec::new()));

        assert_eq!(registry.kinds(), vec!["mock", "native"]);
        registry
            .get("native")
            .unwrap()
            .parse(&serde_json::json!({}))
            .unwrap();
        assert_eq!(mock.parse_calls().len(), 1);
    }
}
