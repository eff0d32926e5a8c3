//! Planning adapters for the external workout and diet services
//!
//! Each adapter is a long-lived, `Arc`-shared value owning its own circuit
//! breaker. Callers only ever see a validation error or a plan; downstream
//! failures become fallback plans unless the breaker feature is switched off.

use crate::breaker::BreakerSnapshot;
use crate::Result;
use async_trait::async_trait;

pub mod diet;
pub mod fallback;
pub mod pipeline;
pub mod workout;

pub use diet::DietPlanningAdapter;
pub use pipeline::{Operation, ResiliencePipeline};
pub use workout::WorkoutPlanningAdapter;

/// One upstream planning service behind the resilience pipeline
#[async_trait]
pub trait PlanningAdapter: Send + Sync {
    type Request: Send + Sync;
    type Plan: Send;

    /// Service name used in logs, cache keys and the status endpoint
    fn name(&self) -> &str;

    /// Create a plan. Fails only on request validation, or on upstream failure
    /// when fallback is disabled.
    async fn create_plan(&self, request: &Self::Request) -> Result<Self::Plan>;

    fn breaker_snapshot(&self) -> BreakerSnapshot;
}

/// Trimmed, lowercased, sorted and de-duplicated list for stable cache keys
pub(crate) fn normalize_list(items: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}
