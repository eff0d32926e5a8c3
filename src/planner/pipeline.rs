//! Shared resilience pipeline
//!
//! CACHE? → BREAKER GATE → CALL (or MOCK) → VALIDATE → CACHE WRITE → RETURN
//!                     └──────── any failure ────────→ FALLBACK (or error)
//!
//! Request validation happens in the adapters before anything here runs.

use crate::breaker::{BreakerSnapshot, CircuitBreaker, Clock, SystemClock};
use crate::cache::CacheStore;
use crate::config::ServiceConfig;
use crate::error::{PlanningError, UpstreamError, ValidationError};
use crate::models::PlanSource;
use crate::upstream::unwrap_envelope;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-call parameters of the pipeline
pub struct Operation<T> {
    pub name: &'static str,
    pub cache_key: String,
    pub ttl_secs: u64,
    pub parse: fn(&Value) -> std::result::Result<T, ValidationError>,
}

pub struct ResiliencePipeline {
    service: String,
    config: ServiceConfig,
    breaker: CircuitBreaker,
    cache: Arc<dyn CacheStore>,
}

impl ResiliencePipeline {
    pub fn new(service: impl Into<String>, config: ServiceConfig, cache: Arc<dyn CacheStore>) -> Self {
        Self::with_clock(service, config, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        service: impl Into<String>,
        config: ServiceConfig,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let service = service.into();
        let breaker = CircuitBreaker::with_clock(service.clone(), &config.breaker, clock);

        Self {
            service,
            config,
            breaker,
            cache,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Run one operation through the pipeline.
    ///
    /// `call` is only polled when a live call is actually made. `mock` replaces it in
    /// mock mode. `fallback` is used whenever the breaker refuses or the call fails,
    /// unless the breaker feature is disabled, in which case the failure is returned.
    pub async fn execute<T, C, M, F>(&self, op: Operation<T>, call: C, mock: M, fallback: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        C: Future<Output = std::result::Result<Value, UpstreamError>>,
        M: FnOnce() -> Value,
        F: FnOnce() -> T,
    {
        let features = &self.config.features;

        // === CACHE ===
        if features.enable_caching {
            if let Some(hit) = self.read_cache::<T>(&op).await {
                self.log_source(&op, PlanSource::Cache);
                return Ok(hit);
            }
        }

        // === GATE ===
        if features.enable_circuit_breaker && !self.breaker.can_make_request() {
            info!(
                service = %self.service,
                operation = op.name,
                "Circuit open, skipping upstream call"
            );
            self.log_source(&op, PlanSource::Fallback);
            return Ok(fallback());
        }

        // === CALL ===
        let (raw, source) = if features.mock_mode {
            (Ok(mock()), PlanSource::Mock)
        } else {
            (self.call_with_timeout(call).await, PlanSource::Upstream)
        };

        // === VALIDATE ===
        let outcome = raw.and_then(|value| {
            (op.parse)(&unwrap_envelope(value)).map_err(UpstreamError::InvalidResponse)
        });

        match outcome {
            Ok(payload) => {
                if features.enable_caching {
                    self.write_cache(&op, &payload).await;
                }
                if source == PlanSource::Upstream {
                    self.breaker.record_success();
                }
                self.log_source(&op, source);
                Ok(payload)
            }
            Err(e) => {
                if source == PlanSource::Upstream {
                    self.breaker.record_failure();
                }

                warn!(
                    service = %self.service,
                    operation = op.name,
                    source = %source,
                    error = %e,
                    failure_count = self.breaker.failure_count(),
                    "Planning call failed"
                );

                if features.enable_circuit_breaker {
                    self.log_source(&op, PlanSource::Fallback);
                    Ok(fallback())
                } else {
                    Err(PlanningError::Upstream(e))
                }
            }
        }
    }

    async fn call_with_timeout<C>(&self, call: C) -> std::result::Result<Value, UpstreamError>
    where
        C: Future<Output = std::result::Result<Value, UpstreamError>>,
    {
        let started = Instant::now();

        let result = match tokio::time::timeout(self.config.timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                service: self.service.clone(),
                timeout_ms: self.config.timeout_ms,
            }),
        };

        debug!(
            service = %self.service,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Upstream call finished"
        );

        result
    }

    async fn read_cache<T: DeserializeOwned>(&self, op: &Operation<T>) -> Option<T> {
        match self.cache.get(&op.cache_key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(
                        service = %self.service,
                        cache_key = %op.cache_key,
                        "Ignoring unreadable cache entry: {}",
                        e
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(
                    service = %self.service,
                    cache_key = %op.cache_key,
                    "Cache read failed, treating as miss: {}",
                    e
                );
                None
            }
        }
    }

    async fn write_cache<T: Serialize>(&self, op: &Operation<T>, payload: &T) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(service = %self.service, cache_key = %op.cache_key, "Skipping cache write: {}", e);
                return;
            }
        };

        if let Err(e) = self.cache.set(&op.cache_key, &value, op.ttl_secs).await {
            warn!(
                service = %self.service,
                cache_key = %op.cache_key,
                "Cache write failed: {}",
                e
            );
        }
    }

    fn log_source<T>(&self, op: &Operation<T>, source: PlanSource) {
        info!(
            service = %self.service,
            operation = op.name,
            cache_key = %op.cache_key,
            source = %source,
            "Serving planning response"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{CircuitState, ManualClock};
    use crate::cache::InMemoryCacheStore;
    use crate::error::CacheError;
    use crate::cache::CacheResult;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Payload {
        value: u32,
    }

    fn parse(value: &Value) -> std::result::Result<Payload, ValidationError> {
        let n = value
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| ValidationError::new("value", "is required"))?;
        Ok(Payload { value: n as u32 })
    }

    fn op() -> Operation<Payload> {
        Operation {
            name: "test",
            cache_key: "test:op:key".to_string(),
            ttl_secs: 60,
            parse,
        }
    }

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::mock("test");
        config.features.mock_mode = false;
        config.breaker.failure_threshold = 2;
        config.timeout_ms = 50;
        config
    }

    fn pipeline(config: ServiceConfig) -> ResiliencePipeline {
        ResiliencePipeline::with_clock(
            "test",
            config,
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    fn failing_call() -> impl Future<Output = std::result::Result<Value, UpstreamError>> {
        async {
            Err(UpstreamError::Network {
                service: "test".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    struct BrokenCache;

    #[async_trait::async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<Value>> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn set(&self, _key: &str, _value: &Value, _ttl_secs: u64) -> CacheResult<()> {
            Err(CacheError::Backend("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let pipeline = pipeline(config());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = pipeline
                .execute(
                    op(),
                    async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(json!({"data": {"value": 7}}))
                    },
                    || json!({}),
                    || Payload { value: 0 },
                )
                .await
                .unwrap();
            assert_eq!(result, Payload { value: 7 });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_counts() {
        let pipeline = pipeline(config());

        let result = pipeline
            .execute(op(), failing_call(), || json!({}), || Payload { value: 99 })
            .await
            .unwrap();

        assert_eq!(result, Payload { value: 99 });
        assert_eq!(pipeline.breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_response_is_failure() {
        let pipeline = pipeline(config());

        let result = pipeline
            .execute(
                op(),
                async { Ok(json!({"unexpected": true})) },
                || json!({}),
                || Payload { value: 1 },
            )
            .await
            .unwrap();

        assert_eq!(result, Payload { value: 1 });
        assert_eq!(pipeline.breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let pipeline = pipeline(config());

        let result = pipeline
            .execute(
                op(),
                async {
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    Ok(json!({"value": 1}))
                },
                || json!({}),
                || Payload { value: 2 },
            )
            .await
            .unwrap();

        assert_eq!(result, Payload { value: 2 });
        assert_eq!(pipeline.breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_call() {
        let pipeline = pipeline(config());
        for _ in 0..2 {
            pipeline
                .execute(op(), failing_call(), || json!({}), || Payload { value: 0 })
                .await
                .unwrap();
        }
        assert_eq!(pipeline.breaker().state(), CircuitState::Open);

        let calls = AtomicUsize::new(0);
        let result = pipeline
            .execute(
                op(),
                async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"value": 5}))
                },
                || json!({}),
                || Payload { value: 3 },
            )
            .await
            .unwrap();

        assert_eq!(result, Payload { value: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_breaker_disabled_propagates_errors() {
        let mut config = config();
        config.features.enable_circuit_breaker = false;
        let pipeline = pipeline(config);

        let err = pipeline
            .execute(op(), failing_call(), || json!({}), || Payload { value: 0 })
            .await
            .unwrap_err();

        assert!(matches!(err, PlanningError::Upstream(UpstreamError::Network { .. })));
    }

    #[tokio::test]
    async fn test_mock_mode_skips_breaker_bookkeeping() {
        let mut config = config();
        config.features.mock_mode = true;
        let pipeline = pipeline(config);

        let bad = pipeline
            .execute(op(), failing_call(), || json!({"nope": 1}), || Payload { value: 4 })
            .await
            .unwrap();
        assert_eq!(bad, Payload { value: 4 });
        assert_eq!(pipeline.breaker().failure_count(), 0);

        let good = pipeline
            .execute(op(), failing_call(), || json!({"value": 8}), || Payload { value: 4 })
            .await
            .unwrap();
        assert_eq!(good, Payload { value: 8 });

        // Mock responses are cached like real ones
        let cached = pipeline
            .execute(op(), failing_call(), || json!({"value": 9}), || Payload { value: 4 })
            .await
            .unwrap();
        assert_eq!(cached, Payload { value: 8 });
    }

    #[tokio::test]
    async fn test_broken_cache_is_ignored() {
        let pipeline = ResiliencePipeline::with_clock(
            "test",
            config(),
            Arc::new(BrokenCache),
            Arc::new(ManualClock::new(Utc::now())),
        );

        let result = pipeline
            .execute(op(), async { Ok(json!({"value": 6})) }, || json!({}), || Payload { value: 0 })
            .await
            .unwrap();

        assert_eq!(result, Payload { value: 6 });
    }
}
