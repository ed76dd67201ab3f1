use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use moka::future::Cache;

use crate::libxml2::XmlSchemaPtr;

/// Default number of compiled schemas kept in memory
pub const DEFAULT_MAX_PARSED_SCHEMAS: u64 = 16;

/// In-memory cache of compiled schemas, keyed by schema text.
///
/// Re-validating after every keystroke in the instance pane would otherwise
/// recompile the same XSD each time. `moka` coalesces concurrent loads of the
/// same key, so a schema is compiled once even when several passes ask for it.
#[derive(Clone)]
pub struct ParsedSchemaCache {
    cache: Cache<String, Arc<XmlSchemaPtr>>,
}

impl ParsedSchemaCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();

        Self { cache }
    }

    /// Cache key for a schema text
    pub fn key_for(schema_text: &str) -> String {
        let mut hasher = DefaultHasher::new();
        schema_text.hash(&mut hasher);
        format!("{:016x}-{}", hasher.finish(), schema_text.len())
    }

    /// Get a compiled schema from the cache, or compile it if missing.
    ///
    /// The `loader` future only runs on a miss. Failed loads are not cached,
    /// so fixing the schema text and retrying compiles again.
    pub async fn get_or_load<F, Fut, E>(&self, key: String, loader: F) -> Result<Arc<XmlSchemaPtr>, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Arc<XmlSchemaPtr>, E>>,
        E: Send + Sync + Clone + 'static,
    {
        self.cache
            .try_get_with(key, loader())
            .await
            .map_err(|e| (*e).clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }
}

impl Default for ParsedSchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARSED_SCHEMAS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibXml2Error;
    use crate::libxml2::LibXml2Wrapper;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root" type="xs:string"/>
</xs:schema>"#;

    #[test]
    fn test_key_for_is_stable_and_distinct() {
        assert_eq!(
            ParsedSchemaCache::key_for(XSD),
            ParsedSchemaCache::key_for(XSD)
        );
        assert_ne!(
            ParsedSchemaCache::key_for(XSD),
            ParsedSchemaCache::key_for("<other/>")
        );
    }

    #[tokio::test]
    async fn test_loader_runs_once_per_key() {
        let cache = ParsedSchemaCache::new(4);
        let wrapper = LibXml2Wrapper::new();
        let loads = AtomicUsize::new(0);
        let key = ParsedSchemaCache::key_for(XSD);

        for _ in 0..3 {
            let schema = cache
                .get_or_load(key.clone(), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    wrapper
                        .parse_schema_from_memory(XSD.as_bytes())
                        .map(Arc::new)
                })
                .await
                .unwrap();
            assert!(schema.is_valid());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&key));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = ParsedSchemaCache::default();
        let key = ParsedSchemaCache::key_for("broken");

        let result = cache
            .get_or_load(key.clone(), || async {
                Err::<Arc<XmlSchemaPtr>, _>(LibXml2Error::MemoryAllocation)
            })
            .await;

        assert_eq!(result.unwrap_err(), LibXml2Error::MemoryAllocation);
        assert!(!cache.contains(&key));
    }
}
