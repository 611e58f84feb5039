// crates/server/src/documents.rs
//! Uploaded document bytes.
//!
//! Held in memory under two limits, a document count and a total byte
//! budget. The least recently used documents are evicted to make room;
//! an evicted document's job keeps running, only its PDF is gone.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use glassbox_core::JobId;
use lru::LruCache;

struct Inner {
    cache: LruCache<JobId, Bytes>,
    bytes: usize,
}

pub struct DocumentStore {
    inner: Mutex<Inner>,
    max_bytes: usize,
}

impl DocumentStore {
    /// A zero `max_documents` is treated as one.
    pub fn new(max_documents: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(max_documents).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                cache: LruCache::new(capacity),
                bytes: 0,
            }),
            max_bytes,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::error!("document store mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Store `bytes` for `job_id`, evicting old documents as needed.
    /// Returns `false` when the document alone exceeds the byte budget and
    /// was not kept.
    pub fn insert(&self, job_id: JobId, bytes: Bytes) -> bool {
        let size = bytes.len();
        if size > self.max_bytes {
            tracing::warn!(job_id = %job_id, size, max_bytes = self.max_bytes, "document too large to keep");
            return false;
        }

        let mut inner = self.inner();
        if let Some(old) = inner.cache.pop(&job_id) {
            inner.bytes -= old.len();
        }
        while inner.bytes + size > self.max_bytes {
            match inner.cache.pop_lru() {
                Some((evicted, old)) => {
                    inner.bytes -= old.len();
                    tracing::debug!(job_id = %evicted, size = old.len(), "document evicted");
                }
                None => break,
            }
        }
        // At the count limit, `push` hands back the entry it displaced.
        if let Some((evicted, old)) = inner.cache.push(job_id, bytes) {
            inner.bytes -= old.len();
            tracing::debug!(job_id = %evicted, size = old.len(), "document evicted");
        }
        inner.bytes += size;

        metrics::gauge!("glassbox_documents_bytes").set(inner.bytes as f64);
        true
    }

    pub fn get(&self, job_id: &JobId) -> Option<Bytes> {
        self.inner().cache.get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held.
    pub fn total_bytes(&self) -> usize {
        self.inner().bytes
    }
}
