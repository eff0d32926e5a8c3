//! Workout-planning service adapter
//!
//! `POST /v1/workout-plans` with a bearer token, plus the read-only
//! `GET /v1/exercises` library lookup. Both share one circuit breaker.

use super::fallback::{
    fallback_exercise_library, fallback_workout_plan, mock_exercise_library_payload,
    mock_workout_payload,
};
use super::pipeline::{Operation, ResiliencePipeline};
use super::{normalize_list, PlanningAdapter};
use crate::breaker::BreakerSnapshot;
use crate::cache::{cache_key, fingerprint, CacheStore};
use crate::config::ServiceConfig;
use crate::models::{Exercise, ExerciseFilters, UserProfile, WorkoutPlan, WorkoutPlanRequest};
use crate::upstream::{HttpTransport, Transport, UpstreamRequest};
use crate::validation::{
    parse_exercise_library, parse_workout_plan, validate_exercise_filters,
    validate_workout_request,
};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub const SERVICE_NAME: &str = "workout-planning";
pub const WORKOUT_PLANS_PATH: &str = "/v1/workout-plans";
pub const EXERCISES_PATH: &str = "/v1/exercises";

/// Fields that decide the plan, in a stable order
#[derive(Serialize)]
struct PlanKey<'a> {
    profile: &'a UserProfile,
    days_per_week: u8,
    session_minutes: u16,
    equipment: Vec<String>,
    focus_areas: Vec<String>,
}

pub struct WorkoutPlanningAdapter {
    pipeline: ResiliencePipeline,
    transport: Arc<dyn Transport>,
}

impl WorkoutPlanningAdapter {
    pub fn new(config: ServiceConfig, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let transport = HttpTransport::new(SERVICE_NAME, &config)?;
        let pipeline = ResiliencePipeline::new(SERVICE_NAME, config, cache);
        Ok(Self::with_parts(pipeline, Arc::new(transport)))
    }

    /// Assemble from explicit parts (custom transport or clock)
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

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config().api_key)
    }

    fn plan_cache_key(&self, request: &WorkoutPlanRequest) -> String {
        let key = PlanKey {
            profile: &request.profile,
            days_per_week: request.preferences.days_per_week,
            session_minutes: request.preferences.session_minutes,
            equipment: normalize_list(&request.preferences.equipment),
            focus_areas: normalize_list(&request.preferences.focus_areas),
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

    /// Trimmed, lowercased text filters; blank ones dropped
    fn normalize_filters(filters: &ExerciseFilters) -> ExerciseFilters {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        };

        ExerciseFilters {
            muscle_group: text(&filters.muscle_group),
            equipment: text(&filters.equipment),
            ..filters.clone()
        }
    }

    fn library_cache_key(&self, filters: &ExerciseFilters) -> String {
        let digest = fingerprint(filters).unwrap_or_else(|e| {
            warn!(service = SERVICE_NAME, "Could not fingerprint library filters: {}", e);
            String::new()
        });

        cache_key(&self.config().cache_prefix, "library", &digest)
    }

    pub async fn create_plan(&self, request: &WorkoutPlanRequest) -> Result<WorkoutPlan> {
        validate_workout_request(request)?;

        let body = serde_json::to_vec(request)?;
        let upstream_request = UpstreamRequest::post(WORKOUT_PLANS_PATH, body)
            .header("Authorization", self.auth_header());

        let op = Operation {
            name: "create_workout_plan",
            cache_key: self.plan_cache_key(request),
            ttl_secs: self.config().cache.plan_secs,
            parse: parse_workout_plan,
        };

        self.pipeline
            .execute(
                op,
                self.transport.send(&upstream_request),
                || mock_workout_payload(request),
                || fallback_workout_plan(request),
            )
            .await
    }

    /// Read-only exercise lookup. Falls back to the static library.
    pub async fn get_exercise_library(&self, filters: Option<&ExerciseFilters>) -> Result<Vec<Exercise>> {
        let filters = filters.cloned().unwrap_or_default();
        validate_exercise_filters(&filters)?;
        let filters = Self::normalize_filters(&filters);

        let mut upstream_request =
            UpstreamRequest::get(EXERCISES_PATH).header("Authorization", self.auth_header());
        if let Some(muscle_group) = &filters.muscle_group {
            upstream_request = upstream_request.query_param("muscle_group", muscle_group.as_str());
        }
        if let Some(equipment) = &filters.equipment {
            upstream_request = upstream_request.query_param("equipment", equipment.as_str());
        }
        if let Some(difficulty) = filters.difficulty {
            upstream_request =
                upstream_request.query_param("difficulty", difficulty.to_string().to_lowercase());
        }
        if let Some(limit) = filters.limit {
            upstream_request = upstream_request.query_param("limit", limit.to_string());
        }

        let op = Operation {
            name: "get_exercise_library",
            cache_key: self.library_cache_key(&filters),
            ttl_secs: self.config().cache.library_secs,
            parse: parse_exercise_library,
        };

        self.pipeline
            .execute(
                op,
                self.transport.send(&upstream_request),
                || mock_exercise_library_payload(&filters),
                || fallback_exercise_library(&filters),
            )
            .await
    }
}

#[async_trait]
impl PlanningAdapter for WorkoutPlanningAdapter {
    type Request = WorkoutPlanRequest;
    type Plan = WorkoutPlan;

    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn create_plan(&self, request: &WorkoutPlanRequest) -> Result<WorkoutPlan> {
        WorkoutPlanningAdapter::create_plan(self, request).await
    }

    fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.pipeline.breaker_snapshot()
    }
}
