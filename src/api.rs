//! REST API for the planning gateway
//!
//! Thin axum layer over the two adapters. Plans are returned as-is; the
//! caller cannot tell a cached, live or fallback plan apart.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PlanningError, ValidationError};
use crate::models::{DietPlanRequest, ExerciseFilters, WorkoutPlanRequest};
use crate::planner::{DietPlanningAdapter, PlanningAdapter, WorkoutPlanningAdapter};

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub workout: Arc<WorkoutPlanningAdapter>,
    pub diet: Arc<DietPlanningAdapter>,
}

type ApiReply = (StatusCode, Json<ApiResponse>);

/// Validation → 400, propagated upstream failure → 502, anything else → 500
pub fn status_for(error: &PlanningError) -> StatusCode {
    match error {
        PlanningError::Validation(_) => StatusCode::BAD_REQUEST,
        PlanningError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply<T: Serialize>(operation: &str, result: crate::Result<T>) -> ApiReply {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        Err(e) => {
            let status = status_for(&e);
            warn!(operation, status = status.as_u16(), "Request failed: {}", e);
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Malformed input the extractors refused, as a 400 in the usual envelope.
/// The rejection text carries the serde path of the offending field.
fn rejected(operation: &str, field: &str, message: String) -> ApiReply {
    reply::<()>(operation, Err(ValidationError::new(field, message).into()))
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_workout_plan(
    State(state): State<ApiState>,
    body: Result<Json<WorkoutPlanRequest>, JsonRejection>,
) -> ApiReply {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected("create_workout_plan", "body", rejection.body_text()),
    };
    info!(request_id = %Uuid::new_v4(), user_id = %req.user_id, "Workout plan requested");
    reply("create_workout_plan", state.workout.create_plan(&req).await)
}

async fn exercise_library(
    State(state): State<ApiState>,
    query: Result<Query<ExerciseFilters>, QueryRejection>,
) -> ApiReply {
    let Query(filters) = match query {
        Ok(query) => query,
        Err(rejection) => return rejected("get_exercise_library", "query", rejection.body_text()),
    };
    reply(
        "get_exercise_library",
        state.workout.get_exercise_library(Some(&filters)).await,
    )
}

async fn create_diet_plan(
    State(state): State<ApiState>,
    body: Result<Json<DietPlanRequest>, JsonRejection>,
) -> ApiReply {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected("create_diet_plan", "body", rejection.body_text()),
    };
    info!(request_id = %Uuid::new_v4(), user_id = %req.user_id, "Diet plan requested");
    reply("create_diet_plan", state.diet.create_plan(&req).await)
}

async fn planning_status(State(state): State<ApiState>) -> ApiReply {
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "workout": state.workout.breaker_snapshot(),
            "diet": state.diet.breaker_snapshot(),
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(workout: Arc<WorkoutPlanningAdapter>, diet: Arc<DietPlanningAdapter>) -> Router {
    let state = ApiState { workout, diet };

    Router::new()
        .route("/health", get(health))
        .route("/api/workout-plans", post(create_workout_plan))
        .route("/api/exercises", get(exercise_library))
        .route("/api/diet-plans", post(create_diet_plan))
        .route("/api/planning/status", get(planning_status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    workout: Arc<WorkoutPlanningAdapter>,
    diet: Arc<DietPlanningAdapter>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(workout, diet);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
