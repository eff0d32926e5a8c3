//! Shared fixtures for the adapter integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use fitness_planning_gateway::breaker::ManualClock;
use fitness_planning_gateway::cache::{CacheResult, CacheStore, InMemoryCacheStore};
use fitness_planning_gateway::config::ServiceConfig;
use fitness_planning_gateway::error::UpstreamError;
use fitness_planning_gateway::models::{
    DietPlanRequest, DietPreferences, FitnessGoal, FitnessLevel, Gender, UserProfile,
    WorkoutPlanRequest, WorkoutPreferences,
};
use fitness_planning_gateway::planner::ResiliencePipeline;
use fitness_planning_gateway::upstream::{Transport, UpstreamRequest};
use fitness_planning_gateway::{DietPlanningAdapter, WorkoutPlanningAdapter};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake upstream does for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Network,
    /// Sleep, then answer. Used to trip the pipeline timeout.
    Hang(Duration),
}

/// Transport double that records every request and answers from a script.
/// Once the script runs out, the last reply repeats.
pub struct RecordingTransport {
    script: Mutex<Vec<Reply>>,
    requests: Mutex<Vec<UpstreamRequest>>,
    calls: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(reply: Reply) -> Arc<Self> {
        Self::new(vec![reply])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match self.next_reply() {
            Reply::Json(value) => Ok(value),
            Reply::Status(status) => Err(UpstreamError::Status {
                service: "fake".to_string(),
                status,
                body: "scripted failure".to_string(),
            }),
            Reply::Network => Err(UpstreamError::Network {
                service: "fake".to_string(),
                message: "connection refused".to_string(),
            }),
            Reply::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Value::Null)
            }
        }
    }
}

/// In-memory cache that counts reads and writes
#[derive(Default)]
pub struct CountingCache {
    inner: InMemoryCacheStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl_secs).await
    }
}

/// Live (non-mock) config pointed at a fake host, retries off, short timeout
pub fn live_config(cache_prefix: &str) -> ServiceConfig {
    let mut config = ServiceConfig::mock(cache_prefix);
    config.features.mock_mode = false;
    config.features.enable_retries = false;
    config.base_url = "http://planning.test".to_string();
    config.api_key = "test-key".to_string();
    config.api_secret = Some("test-secret".to_string());
    config.timeout_ms = 100;
    config
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc::now()))
}

pub fn workout_adapter(
    config: ServiceConfig,
    transport: Arc<RecordingTransport>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<ManualClock>,
) -> WorkoutPlanningAdapter {
    let pipeline = ResiliencePipeline::with_clock("workout-planning", config, cache, clock);
    WorkoutPlanningAdapter::with_parts(pipeline, transport)
}

pub fn diet_adapter(
    config: ServiceConfig,
    transport: Arc<RecordingTransport>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<ManualClock>,
) -> DietPlanningAdapter {
    let pipeline = ResiliencePipeline::with_clock("diet-planning", config, cache, clock);
    DietPlanningAdapter::with_parts(pipeline, transport)
}

pub fn profile(goal: FitnessGoal, gender: Gender) -> UserProfile {
    UserProfile {
        age: 29,
        gender,
        goal,
        fitness_level: FitnessLevel::Intermediate,
        height_cm: Some(168.0),
        weight_kg: Some(64.0),
    }
}

pub fn workout_request(user_id: &str) -> WorkoutPlanRequest {
    WorkoutPlanRequest {
        user_id: user_id.to_string(),
        profile: profile(FitnessGoal::Maintenance, Gender::Male),
        preferences: WorkoutPreferences {
            days_per_week: 3,
            session_minutes: 45,
            equipment: vec!["dumbbell".to_string()],
            focus_areas: vec![],
        },
    }
}

pub fn diet_request(user_id: &str, goal: FitnessGoal, gender: Gender) -> DietPlanRequest {
    DietPlanRequest {
        user_id: user_id.to_string(),
        profile: profile(goal, gender),
        preferences: DietPreferences::default(),
    }
}

/// A valid workout-service response for `workout_request`
pub fn workout_response() -> Value {
    serde_json::json!({
        "data": {
            "plan_name": "Upstream Strength",
            "goal": "maintenance",
            "fitness_level": "intermediate",
            "days_per_week": 3,
            "session_minutes": 45,
            "schedule": [
                {"day": 1, "focus": "Push", "exercises": [
                    {"name": "Bench Press", "sets": 3, "reps": "8-10", "rest_seconds": 90}
                ]},
                {"day": 2, "focus": "Pull", "exercises": [
                    {"name": "Dumbbell Row", "sets": 3, "reps": "10", "rest_seconds": 75}
                ]},
                {"day": 3, "focus": "Legs", "exercises": [
                    {"name": "Goblet Squat", "sets": 4, "reps": "12", "rest_seconds": 60}
                ]}
            ],
            "notes": ["Log every session."]
        }
    })
}

/// A valid diet-service response
pub fn diet_response() -> Value {
    serde_json::json!({
        "plan_name": "Upstream Nutrition",
        "goal": "weight_loss",
        "daily_calories": 1650,
        "macros": {
            "Protein": 120.0,
            "Carbohydrates": 170.0,
            "Total Fat": 55.0,
            "Total Fiber": 30.0
        },
        "meals": [
            {"name": "Breakfast", "calories": 400, "foods": ["Eggs", "Toast"]},
            {"name": "Lunch", "calories": 600, "foods": ["Chicken", "Rice"]},
            {"name": "Dinner", "calories": 650, "foods": ["Salmon", "Quinoa"]}
        ],
        "duration_days": 7,
        "recommendations": ["Eat slowly."]
    })
}
