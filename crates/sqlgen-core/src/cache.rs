use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Key for a generation result: digest of the question and the exact schema
/// text the generation saw. Any schema change invalidates prior entries.
pub fn cache_key(question: &str, schema: &str) -> String {
    let mut h = Sha256::new();
    h.update(question.as_bytes());
    h.update(b"\n");
    h.update(schema.as_bytes());
    format!("{:x}", h.finalize())
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, String>,
    /// LRU order: least recently used at the front, most recent at the back.
    /// Always a permutation of `map`'s key set.
    order: VecDeque<String>,
    enabled: bool,
}

/// Bounded LRU cache of validated (or error-annotated) SQL strings.
///
/// One mutex guards both the map and the access order so get+touch and
/// evict+insert cannot interleave with other cache operations. Disabling
/// the cache makes `get` always miss and `set` a no-op without clearing
/// existing entries; re-enabling resumes serving them. A capacity of zero
/// stores nothing.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Mutex<CacheInner>>,
    max_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub enabled: bool,
}

impl ResultCache {
    pub fn new(max_size: usize, enabled: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                enabled,
                ..CacheInner::default()
            })),
            max_size,
        }
    }

    pub fn get(&self, question: &str, schema: &str) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.enabled {
            return None;
        }
        let key = cache_key(question, schema);
        if !inner.map.contains_key(&key) {
            return None;
        }
        if let Some(pos) = inner.order.iter().position(|k| *k == key) {
            inner.order.remove(pos);
        }
        inner.order.push_back(key.clone());
        tracing::debug!("cache hit");
        inner.map.get(&key).cloned()
    }

    pub fn set(&self, question: &str, schema: &str, sql: &str) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.enabled || self.max_size == 0 {
            return;
        }
        let key = cache_key(question, schema);
        if !inner.map.contains_key(&key) && inner.map.len() >= self.max_size {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
                tracing::debug!("evicted least recently used cache entry");
            }
        }
        inner.map.insert(key.clone(), sql.to_string());
        if !inner.order.contains(&key) {
            inner.order.push_back(key);
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().enabled = enabled;
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.clear();
        inner.order.clear();
        tracing::info!("cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            size: inner.map.len(),
            max_size: self.max_size,
            enabled: inner.enabled,
        }
    }
}
