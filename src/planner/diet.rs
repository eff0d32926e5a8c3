//! Diet-planning service adapter
//!
//! Every request carries `X-API-Key` and `X-Signature`, the hex HMAC-SHA256 of
//! the serialized body under the shared secret. The body is serialized once and
//! the same bytes are signed and sent.

use super::fallback::{fallback_diet_plan, mock_diet_payload};
use super::pipeline::{Operation, ResiliencePipeline};
use super::{normalize_list, PlanningAdapter};
use crate::breaker::BreakerSnapshot;
use crate::cache::{cache_key, fingerprint, CacheStore};
use crate::config::ServiceConfig;
use crate::error::UpstreamError;
use crate::models::{DietPlan, DietPlanRequest, UserProfile};
use crate::upstream::{sign_body, HttpTransport, Transport, UpstreamRequest};
use crate::validation::{parse_diet_plan, validate_diet_request};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub const SERVICE_NAME: &str = "diet-planning";
pub const DIET_PLANS_PATH: &str = "/v1/diet-plans";
pub const API_KEY_HEADER: &str = "X-API-Key";
pub const SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Serialize)]
struct PlanKey<'a> {
    profile: &'a UserProfile,
    diet_type: Option<String>,
    meals_per_day: u8,
    duration_days: u16,
    allergies: Vec<String>,
}

pub struct DietPlanningAdapter {
    pipeline: ResiliencePipeline,
    transport: Arc<dyn Transport>,
}

impl DietPlanningAdapter {
    pub fn new(config: ServiceConfig, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let transport = HttpTransport::new(SERVICE_NAME, &config)?;
        let pipeline = ResiliencePipeline::new(SERVICE_NAME, config, cache);
        Ok(Self::with_parts(pipeline, Arc::new(transport)))
    }

    pub fn with_parts(pipeline: ResiliencePipeline, transport: Arc<dyn Transport>) -> Self {
        Self {
            pipeline,
            transport,
        }
    }

    pub fn pipeline(&self) -> &ResiliencePipeline {
        &self.pipeline
    }

    fn config(&self) -> &ServiceConfig {
        self.pipeline.config()
    }

    fn plan_cache_key(&self, request: &DietPlanRequest) -> String {
        let preferences = &request.preferences;
        let key = PlanKey {
            profile: &request.profile,
            diet_type: preferences
                .diet_type
                .as_deref()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty()),
            meals_per_day: preferences.meals_per_day,
            duration_days: preferences.duration_days,
            allergies: normalize_list(&preferences.allergies),
        };

        let digest = fingerprint(&key).unwrap_or_else(|e| {
            warn!(service = SERVICE_NAME, "Could not fingerprint plan request: {}", e);
            String::new()
        });

        cache_key(
            &self.config().cache_prefix,
            "plan",
            &format!("{}:{}", request.user_id.trim(), digest),
        )
    }

    /// Build the signed upstream request. A missing secret is an upstream failure.
    fn signed_request(&self, body: Vec<u8>) -> std::result::Result<UpstreamRequest, UpstreamError> {
        let secret = self
            .config()
            .api_secret
            .as_deref()
            .ok_or_else(|| UpstreamError::Signing("no signing secret configured".to_string()))?;
        let signature = sign_body(secret, &body)?;

        Ok(UpstreamRequest::post(DIET_PLANS_PATH, body)
            .header(API_KEY_HEADER, self.config().api_key.clone())
            .header(SIGNATURE_HEADER, signature))
    }

    pub async fn create_plan(&self, request: &DietPlanRequest) -> Result<DietPlan> {
        validate_diet_request(request)?;

        let body = serde_json::to_vec(request)?;

        let op = Operation {
            name: "create_diet_plan",
            cache_key: self.plan_cache_key(request),
            ttl_secs: self.config().cache.plan_secs,
            parse: parse_diet_plan,
        };

        let call = async move {
            let upstream_request = self.signed_request(body)?;
            self.transport.send(&upstream_request).await
        };

        self.pipeline
            .execute(
                op,
                call,
                || mock_diet_payload(request),
                || fallback_diet_plan(request),
            )
            .await
    }
}

#[async_trait]
impl PlanningAdapter for DietPlanningAdapter {
    type Request = DietPlanRequest;
    type Plan = DietPlan;

    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn create_plan(&self, request: &DietPlanRequest) -> Result<DietPlan> {
        DietPlanningAdapter::create_plan(self, request).await
    }

    fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.pipeline.breaker_snapshot()
    }
}
