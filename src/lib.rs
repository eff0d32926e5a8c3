//! Fitness Planning Gateway
//!
//! Resilience layer in front of two external planning services:
//! - a workout-planning service (plans and an exercise library)
//! - a diet-planning service (HMAC-signed requests)
//!
//! Every call is request-validated, cached, guarded by a per-service circuit
//! breaker, response-validated, and backed by a deterministic local fallback.
//!
//! PIPELINE:
//! VALIDATE → CACHE? → BREAKER → CALL → VALIDATE → CACHE WRITE → RETURN
//!                          └──── failure ────→ FALLBACK

pub mod api;
pub mod breaker;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod upstream;
pub mod validation;

pub use error::Result;

// Re-export common types
pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use config::{PlanningConfig, ServiceConfig};
pub use models::*;
pub use planner::{DietPlanningAdapter, PlanningAdapter, WorkoutPlanningAdapter};
