use fitness_planning_gateway::{
    cache::InMemoryCacheStore,
    config::PlanningConfig,
    models::{
        DietPlanRequest, DietPreferences, ExerciseFilters, FitnessGoal, FitnessLevel, Gender,
        UserProfile, WorkoutPlanRequest, WorkoutPreferences,
    },
    DietPlanningAdapter, PlanningAdapter, WorkoutPlanningAdapter,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Fitness Planning Gateway demo (mock mode)");

    let config = PlanningConfig::mock();
    let cache = Arc::new(InMemoryCacheStore::new());
    let workout = WorkoutPlanningAdapter::new(config.workout, cache.clone())?;
    let diet = DietPlanningAdapter::new(config.diet, cache)?;

    let profile = UserProfile {
        age: 31,
        gender: Gender::Female,
        goal: FitnessGoal::WeightLoss,
        fitness_level: FitnessLevel::Beginner,
        height_cm: Some(165.0),
        weight_kg: Some(72.0),
    };
    let user_id = Uuid::new_v4().to_string();

    let workout_request = WorkoutPlanRequest {
        user_id: user_id.clone(),
        profile: profile.clone(),
        preferences: WorkoutPreferences {
            equipment: vec!["dumbbell".to_string()],
            ..WorkoutPreferences::default()
        },
    };
    let plan = workout.create_plan(&workout_request).await?;
    info!(
        plan_name = %plan.plan_name,
        days = plan.days_per_week,
        "Workout plan ready"
    );
    println!("{}", serde_json::to_string_pretty(&plan)?);

    let diet_request = DietPlanRequest {
        user_id,
        profile,
        preferences: DietPreferences {
            diet_type: Some("vegetarian".to_string()),
            ..DietPreferences::default()
        },
    };
    let diet_plan = diet.create_plan(&diet_request).await?;
    info!(
        plan_name = %diet_plan.plan_name,
        daily_calories = diet_plan.daily_calories,
        "Diet plan ready"
    );
    println!("{}", serde_json::to_string_pretty(&diet_plan)?);

    let filters = ExerciseFilters {
        muscle_group: Some("core".to_string()),
        ..ExerciseFilters::default()
    };
    let exercises = workout.get_exercise_library(Some(&filters)).await?;
    for exercise in &exercises {
        println!("- {} ({}, {})", exercise.name, exercise.equipment, exercise.difficulty);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "workout": workout.breaker_snapshot(),
            "diet": diet.breaker_snapshot(),
        }))?
    );

    Ok(())
}
