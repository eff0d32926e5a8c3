use fitness_planning_gateway::{
    api::start_server, cache::build_cache_store, config::PlanningConfig, DietPlanningAdapter,
    WorkoutPlanningAdapter,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Fitness Planning Gateway - API Server");
    info!("Port: {}", api_port);

    let config = PlanningConfig::from_env()?;
    if config.workout.features.mock_mode || config.diet.features.mock_mode {
        info!(
            workout_mock = config.workout.features.mock_mode,
            diet_mock = config.diet.features.mock_mode,
            "Mock mode enabled, upstream calls are synthesized"
        );
    }

    // One cache store shared by both adapters, one breaker each
    let cache = build_cache_store();
    let workout = Arc::new(WorkoutPlanningAdapter::new(config.workout, cache.clone())?);
    let diet = Arc::new(DietPlanningAdapter::new(config.diet, cache)?);

    info!("Planning adapters initialized");

    start_server(workout, diet, api_port).await?;

    Ok(())
}
