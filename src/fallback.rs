//! # Fallback Executor
//!
//! Cache-then-fallback failover around a primary operation. Successful
//! results are cached under an opaque key; when the primary fails, a fresh
//! cache entry is served before the fallback operation is ever invoked.
//!
//! Entries are never proactively evicted - staleness is judged only at read
//! time against the TTL. Under long-running processes with many distinct
//! keys the cache grows without bound; this mirrors the reference behavior
//! and is documented rather than silently changed.

use crate::error::{ErrorCategory, ErrorSeverity, FallbackError};
use crate::recorder::ErrorRecorder;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One cached result. Last-write-wins; no merging.
#[derive(Debug, Clone)]
pub struct FallbackCacheEntry {
    pub data: serde_json::Value,
    pub written_at: DateTime<Utc>,
}

/// Wraps primary operations with cache-then-fallback failover.
#[derive(Debug)]
pub struct FallbackExecutor {
    cache: DashMap<String, FallbackCacheEntry>,
    cache_ttl: chrono::Duration,
    recorder: Arc<ErrorRecorder>,
}

impl FallbackExecutor {
    pub fn new(cache_ttl: Duration, recorder: Arc<ErrorRecorder>) -> Self {
        Self {
            cache: DashMap::new(),
            cache_ttl: chrono::Duration::from_std(cache_ttl)
                .unwrap_or_else(|_| chrono::Duration::MAX),
            recorder,
        }
    }

    /// Run `primary`, failing over to the cache and then to `fallback`.
    ///
    /// - Primary success: cache the result under `key` (when `cache_result`)
    ///   and return it.
    /// - Primary failure: record it (PROCESSING, MEDIUM), then serve a cache
    ///   entry younger than the TTL without invoking `fallback`; otherwise
    ///   invoke `fallback`, caching and returning its result. Either recovery
    ///   path counts as one fallback activation.
    /// - Both failed: record the fallback failure (PROCESSING, HIGH) and
    ///   raise [`FallbackError::Exhausted`] naming both causes. No cache
    ///   write occurs.
    pub async fn with_fallback<T, E, P, PF, F, FF>(
        &self,
        key: &str,
        primary: P,
        fallback: F,
        cache_result: bool,
    ) -> Result<T, FallbackError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        P: FnOnce() -> PF,
        PF: Future<Output = Result<T, E>>,
        F: FnOnce() -> FF,
        FF: Future<Output = Result<T, E>>,
    {
        let primary_err = match primary().await {
            Ok(value) => {
                if cache_result {
                    self.store(key, &value);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let mut context = serde_json::Map::new();
        context.insert("key".to_string(), serde_json::json!(key));
        self.recorder.log_error(
            &primary_err,
            ErrorCategory::Processing,
            ErrorSeverity::Medium,
            context,
        );

        if let Some(cached) = self.fresh_cached::<T>(key) {
            self.recorder.record_fallback_activation();
            info!(key = %key, "🟡 Primary failed, serving cached result");
            return Ok(cached);
        }

        match fallback().await {
            Ok(value) => {
                self.store(key, &value);
                self.recorder.record_fallback_activation();
                info!(key = %key, "🟡 Primary failed, fallback succeeded");
                Ok(value)
            }
            Err(fallback_err) => {
                let mut context = serde_json::Map::new();
                context.insert("key".to_string(), serde_json::json!(key));
                self.recorder.log_error(
                    &fallback_err,
                    ErrorCategory::Processing,
                    ErrorSeverity::High,
                    context,
                );
                Err(FallbackError::Exhausted {
                    key: key.to_string(),
                    primary: primary_err,
                    fallback: fallback_err,
                })
            }
        }
    }

    /// Number of keys currently cached.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Raw cache entry for a key, fresh or stale.
    pub fn cache_entry(&self, key: &str) -> Option<FallbackCacheEntry> {
        self.cache.get(key).map(|e| e.value().clone())
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(data) => {
                self.cache.insert(
                    key.to_string(),
                    FallbackCacheEntry {
                        data,
                        written_at: Utc::now(),
                    },
                );
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to serialize result for fallback cache");
            }
        }
    }

    fn fresh_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.cache.get(key)?;
        let age = Utc::now().signed_duration_since(entry.written_at);
        if age >= self.cache_ttl {
            debug!(key = %key, age_seconds = age.num_seconds(), "Cache entry stale");
            return None;
        }

        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %key, error = %err, "Cached value no longer deserializes; treating as miss");
                None
            }
        }
    }
}
