//! Locally generated plans
//!
//! Two consumers:
//! - fallback plans, served when the upstream is unavailable or returns garbage.
//!   These are parameterized by goal, gender and fitness level.
//! - mock upstream payloads, synthesized in mock mode in place of a network call.
//!   These are raw JSON and still go through response validation.
//!
//! Everything here is a pure function of its inputs.

use crate::models::{
    DietPlan, DietPlanRequest, Exercise, ExerciseFilters, FitnessGoal, FitnessLevel, Gender,
    Macros, Meal, PlannedExercise, WorkoutDay, WorkoutPlan, WorkoutPlanRequest,
};
use serde_json::{json, Value};

/// Calorie total of the base diet template
pub const BASE_DAILY_CALORIES: u32 = 1857;

//
// ================= Workout =================
//

struct DayTemplate {
    focus: &'static str,
    exercises: &'static [&'static str],
}

const DAY_ROTATION: &[DayTemplate] = &[
    DayTemplate {
        focus: "Full Body Strength",
        exercises: &["Goblet Squat", "Push-Up", "Dumbbell Row", "Plank"],
    },
    DayTemplate {
        focus: "Cardio & Core",
        exercises: &["Jumping Jacks", "Mountain Climbers", "Bicycle Crunch", "Brisk Walk"],
    },
    DayTemplate {
        focus: "Lower Body",
        exercises: &["Romanian Deadlift", "Walking Lunge", "Glute Bridge", "Calf Raise"],
    },
    DayTemplate {
        focus: "Upper Body",
        exercises: &["Overhead Press", "Lat Pulldown", "Incline Push-Up", "Biceps Curl"],
    },
    DayTemplate {
        focus: "Conditioning",
        exercises: &["Kettlebell Swing", "Burpee", "Farmer Carry", "Side Plank"],
    },
    DayTemplate {
        focus: "Mobility & Recovery",
        exercises: &["Hip Flexor Stretch", "Cat-Cow", "Thoracic Rotation", "Foam Rolling"],
    },
    DayTemplate {
        focus: "Active Endurance",
        exercises: &["Steady Cycling", "Step-Up", "Dead Bug", "Rowing Intervals"],
    },
];

fn plan_title(goal: FitnessGoal) -> &'static str {
    match goal {
        FitnessGoal::WeightLoss => "Fat Burn Circuit",
        FitnessGoal::MuscleGain => "Hypertrophy Split",
        FitnessGoal::WeightGain => "Mass Builder",
        FitnessGoal::Maintenance => "Balanced Fitness",
        FitnessGoal::Endurance => "Endurance Builder",
        FitnessGoal::GeneralFitness => "Full Body Foundation",
    }
}

fn reps_for(goal: FitnessGoal) -> &'static str {
    match goal {
        FitnessGoal::MuscleGain | FitnessGoal::WeightGain => "8-12",
        FitnessGoal::WeightLoss => "12-15",
        FitnessGoal::Endurance => "15-20",
        FitnessGoal::Maintenance | FitnessGoal::GeneralFitness => "10-12",
    }
}

/// (sets, rest seconds) by experience
fn volume_for(level: FitnessLevel) -> (u8, u16) {
    match level {
        FitnessLevel::Beginner => (2, 90),
        FitnessLevel::Intermediate => (3, 75),
        FitnessLevel::Advanced => (4, 60),
    }
}

/// Weight loss and muscle gain get one extra training day, capped at 7
pub fn fallback_days_per_week(goal: FitnessGoal, requested: u8) -> u8 {
    let base = requested.clamp(1, 7);
    match goal {
        FitnessGoal::WeightLoss | FitnessGoal::MuscleGain => (base + 1).min(7),
        _ => base,
    }
}

fn build_workout(plan_name: String, days: u8, request: &WorkoutPlanRequest, notes: Vec<String>) -> WorkoutPlan {
    let profile = &request.profile;
    let (sets, rest_seconds) = volume_for(profile.fitness_level);
    let reps = reps_for(profile.goal);

    let schedule = (0..days)
        .map(|i| {
            let template = &DAY_ROTATION[i as usize % DAY_ROTATION.len()];
            WorkoutDay {
                day: i + 1,
                focus: template.focus.to_string(),
                exercises: template
                    .exercises
                    .iter()
                    .map(|name| PlannedExercise {
                        name: name.to_string(),
                        sets,
                        reps: reps.to_string(),
                        rest_seconds,
                    })
                    .collect(),
            }
        })
        .collect();

    WorkoutPlan {
        plan_name,
        goal: profile.goal,
        fitness_level: profile.fitness_level,
        days_per_week: days,
        session_minutes: request.preferences.session_minutes,
        schedule,
        notes,
    }
}

pub fn fallback_workout_plan(request: &WorkoutPlanRequest) -> WorkoutPlan {
    let profile = &request.profile;
    let days = fallback_days_per_week(profile.goal, request.preferences.days_per_week);
    let plan_name = format!("{} Plan ({})", plan_title(profile.goal), profile.fitness_level);

    build_workout(
        plan_name,
        days,
        request,
        vec![
            "Warm up for 5-10 minutes before each session.".to_string(),
            "Increase load gradually once all sets feel comfortable.".to_string(),
        ],
    )
}

/// Canned workout-service response for mock mode
pub fn mock_workout_payload(request: &WorkoutPlanRequest) -> Value {
    let plan = build_workout(
        format!("{} Plan", plan_title(request.profile.goal)),
        request.preferences.days_per_week.clamp(1, 7),
        request,
        vec!["Generated by the mock workout service.".to_string()],
    );

    serde_json::to_value(plan).unwrap_or(Value::Null)
}

//
// ================= Diet =================
//

const BASE_MEALS: &[(&str, u32, &[&str])] = &[
    ("Breakfast", 450, &["Oatmeal with berries", "Greek yogurt", "Green tea"]),
    ("Lunch", 620, &["Grilled chicken breast", "Brown rice", "Steamed broccoli"]),
    ("Snack", 187, &["Apple", "Almonds"]),
    ("Dinner", 600, &["Baked salmon", "Sweet potato", "Mixed salad"]),
];

const BASE_MACROS: Macros = Macros {
    protein: 110.0,
    carbohydrates: 215.0,
    total_fat: 62.0,
    total_fiber: 31.0,
};

pub fn goal_multiplier(goal: FitnessGoal) -> f64 {
    match goal {
        FitnessGoal::WeightLoss => 0.8,
        FitnessGoal::WeightGain => 1.2,
        _ => 1.0,
    }
}

pub fn gender_multiplier(gender: Gender) -> f64 {
    match gender {
        Gender::Female => 0.9,
        _ => 1.0,
    }
}

fn scale(value: f64, goal: FitnessGoal, gender: Gender) -> f64 {
    (value * goal_multiplier(goal) * gender_multiplier(gender)).round()
}

fn base_meals() -> Vec<Meal> {
    BASE_MEALS
        .iter()
        .map(|(name, calories, foods)| Meal {
            name: name.to_string(),
            calories: *calories,
            foods: foods.iter().map(|f| f.to_string()).collect(),
        })
        .collect()
}

fn diet_recommendations(request: &DietPlanRequest) -> Vec<String> {
    let mut recommendations = vec![
        "Drink at least 2 liters of water per day.".to_string(),
        "Prefer whole foods over processed snacks.".to_string(),
    ];
    if let Some(diet_type) = request.preferences.diet_type.as_deref() {
        recommendations.push(format!("Swap ingredients as needed to keep the plan {}.", diet_type));
    }
    if !request.preferences.allergies.is_empty() {
        recommendations.push(format!(
            "Avoid: {}.",
            request.preferences.allergies.join(", ")
        ));
    }
    recommendations
}

/// Base template scaled by goal × gender, each figure rounded to the nearest unit
pub fn fallback_diet_plan(request: &DietPlanRequest) -> DietPlan {
    let goal = request.profile.goal;
    let gender = request.profile.gender;

    let meals = base_meals()
        .into_iter()
        .map(|meal| Meal {
            calories: scale(meal.calories as f64, goal, gender) as u32,
            ..meal
        })
        .collect();

    DietPlan {
        plan_name: format!("{} Nutrition Plan", goal),
        goal,
        daily_calories: scale(BASE_DAILY_CALORIES as f64, goal, gender) as u32,
        macros: Macros {
            protein: scale(BASE_MACROS.protein, goal, gender),
            carbohydrates: scale(BASE_MACROS.carbohydrates, goal, gender),
            total_fat: scale(BASE_MACROS.total_fat, goal, gender),
            total_fiber: scale(BASE_MACROS.total_fiber, goal, gender),
        },
        meals,
        duration_days: request.preferences.duration_days,
        recommendations: diet_recommendations(request),
    }
}

/// Canned diet-service response for mock mode (unscaled base template)
pub fn mock_diet_payload(request: &DietPlanRequest) -> Value {
    json!({
        "plan_name": format!("{} Nutrition Plan", request.profile.goal),
        "goal": request.profile.goal,
        "daily_calories": BASE_DAILY_CALORIES,
        "macros": {
            "Protein": BASE_MACROS.protein,
            "Carbohydrates": BASE_MACROS.carbohydrates,
            "Total Fat": BASE_MACROS.total_fat,
            "Total Fiber": BASE_MACROS.total_fiber
        },
        "meals": base_meals(),
        "duration_days": request.preferences.duration_days,
        "recommendations": ["Generated by the mock diet service."]
    })
}

//
// ================= Exercise Library =================
//

const LIBRARY: &[(&str, &str, &str, &str, FitnessLevel)] = &[
    ("ex-001", "Push-Up", "chest", "bodyweight", FitnessLevel::Beginner),
    ("ex-002", "Barbell Bench Press", "chest", "barbell", FitnessLevel::Intermediate),
    ("ex-003", "Incline Dumbbell Press", "chest", "dumbbell", FitnessLevel::Intermediate),
    ("ex-004", "Pull-Up", "back", "bodyweight", FitnessLevel::Advanced),
    ("ex-005", "Dumbbell Row", "back", "dumbbell", FitnessLevel::Beginner),
    ("ex-006", "Lat Pulldown", "back", "machine", FitnessLevel::Beginner),
    ("ex-007", "Goblet Squat", "legs", "dumbbell", FitnessLevel::Beginner),
    ("ex-008", "Barbell Back Squat", "legs", "barbell", FitnessLevel::Advanced),
    ("ex-009", "Walking Lunge", "legs", "bodyweight", FitnessLevel::Intermediate),
    ("ex-010", "Overhead Press", "shoulders", "barbell", FitnessLevel::Intermediate),
    ("ex-011", "Lateral Raise", "shoulders", "dumbbell", FitnessLevel::Beginner),
    ("ex-012", "Plank", "core", "bodyweight", FitnessLevel::Beginner),
    ("ex-013", "Hanging Leg Raise", "core", "bodyweight", FitnessLevel::Advanced),
    ("ex-014", "Kettlebell Swing", "full_body", "kettlebell", FitnessLevel::Intermediate),
    ("ex-015", "Burpee", "full_body", "bodyweight", FitnessLevel::Intermediate),
];

fn matches_filter(filter: &Option<String>, value: &str) -> bool {
    filter
        .as_deref()
        .map_or(true, |f| f.trim().eq_ignore_ascii_case(value))
}

/// Static library, narrowed by the filters. Not personalized.
pub fn fallback_exercise_library(filters: &ExerciseFilters) -> Vec<Exercise> {
    let limit = filters.limit.map_or(usize::MAX, usize::from);

    LIBRARY
        .iter()
        .filter(|(_, _, muscle, equipment, difficulty)| {
            matches_filter(&filters.muscle_group, muscle)
                && matches_filter(&filters.equipment, equipment)
                && filters.difficulty.map_or(true, |d| d == *difficulty)
        })
        .take(limit)
        .map(|(id, name, muscle, equipment, difficulty)| Exercise {
            id: id.to_string(),
            name: name.to_string(),
            muscle_group: muscle.to_string(),
            equipment: equipment.to_string(),
            difficulty: *difficulty,
            instructions: vec![
                format!("Set up for the {} with a neutral spine.", name.to_lowercase()),
                "Move through the full range of motion under control.".to_string(),
            ],
        })
        .collect()
}

/// Canned exercise-service response for mock mode
pub fn mock_exercise_library_payload(filters: &ExerciseFilters) -> Value {
    json!({ "exercises": fallback_exercise_library(filters) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DietPreferences, UserProfile, WorkoutPreferences};
    use crate::validation::{parse_diet_plan, parse_exercise_library, parse_workout_plan};

    fn profile(goal: FitnessGoal, gender: Gender, level: FitnessLevel) -> UserProfile {
        UserProfile {
            age: 28,
            gender,
            goal,
            fitness_level: level,
            height_cm: None,
            weight_kg: None,
        }
    }

    fn diet_request(goal: FitnessGoal, gender: Gender) -> DietPlanRequest {
        DietPlanRequest {
            user_id: "user-1".to_string(),
            profile: profile(goal, gender, FitnessLevel::Beginner),
            preferences: DietPreferences::default(),
        }
    }

    fn workout_request(goal: FitnessGoal, level: FitnessLevel, days: u8) -> WorkoutPlanRequest {
        WorkoutPlanRequest {
            user_id: "user-1".to_string(),
            profile: profile(goal, Gender::Male, level),
            preferences: WorkoutPreferences {
                days_per_week: days,
                ..WorkoutPreferences::default()
            },
        }
    }

    #[test]
    fn test_base_meals_sum_to_base_calories() {
        let total: u32 = base_meals().iter().map(|m| m.calories).sum();
        assert_eq!(total, BASE_DAILY_CALORIES);
    }

    #[test]
    fn test_weight_loss_female_calories() {
        let plan = fallback_diet_plan(&diet_request(FitnessGoal::WeightLoss, Gender::Female));
        assert_eq!(plan.daily_calories, 1337);
    }

    #[test]
    fn test_weight_gain_and_maintenance_calories() {
        let gain = fallback_diet_plan(&diet_request(FitnessGoal::WeightGain, Gender::Male));
        assert_eq!(gain.daily_calories, 2228);

        let maintain = fallback_diet_plan(&diet_request(FitnessGoal::Maintenance, Gender::Male));
        assert_eq!(maintain.daily_calories, BASE_DAILY_CALORIES);

        let maintain_female =
            fallback_diet_plan(&diet_request(FitnessGoal::Maintenance, Gender::Female));
        assert_eq!(maintain_female.daily_calories, 1671);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let request = diet_request(FitnessGoal::WeightLoss, Gender::Female);
        assert_eq!(fallback_diet_plan(&request), fallback_diet_plan(&request));

        let workout = workout_request(FitnessGoal::Endurance, FitnessLevel::Advanced, 4);
        assert_eq!(fallback_workout_plan(&workout), fallback_workout_plan(&workout));
    }

    #[test]
    fn test_days_nudged_for_weight_loss_and_muscle_gain() {
        assert_eq!(fallback_days_per_week(FitnessGoal::WeightLoss, 3), 4);
        assert_eq!(fallback_days_per_week(FitnessGoal::MuscleGain, 7), 7);
        assert_eq!(fallback_days_per_week(FitnessGoal::Maintenance, 3), 3);

        let plan = fallback_workout_plan(&workout_request(
            FitnessGoal::MuscleGain,
            FitnessLevel::Intermediate,
            4,
        ));
        assert_eq!(plan.days_per_week, 5);
        assert_eq!(plan.schedule.len(), 5);
        assert_eq!(plan.plan_name, "Hypertrophy Split Plan (Intermediate)");
    }

    #[test]
    fn test_fallbacks_pass_response_validation() {
        let workout = fallback_workout_plan(&workout_request(
            FitnessGoal::WeightLoss,
            FitnessLevel::Beginner,
            7,
        ));
        let value = serde_json::to_value(&workout).unwrap();
        assert_eq!(parse_workout_plan(&value).unwrap(), workout);

        let diet = fallback_diet_plan(&diet_request(FitnessGoal::WeightLoss, Gender::Female));
        let value = serde_json::to_value(&diet).unwrap();
        assert_eq!(parse_diet_plan(&value).unwrap(), diet);
    }

    #[test]
    fn test_mock_payloads_pass_response_validation() {
        let workout = workout_request(FitnessGoal::GeneralFitness, FitnessLevel::Beginner, 3);
        assert!(parse_workout_plan(&mock_workout_payload(&workout)).is_ok());

        let diet = diet_request(FitnessGoal::WeightLoss, Gender::Female);
        let plan = parse_diet_plan(&mock_diet_payload(&diet)).unwrap();
        assert_eq!(plan.daily_calories, BASE_DAILY_CALORIES);

        let library = parse_exercise_library(&mock_exercise_library_payload(&ExerciseFilters::default())).unwrap();
        assert_eq!(library.len(), LIBRARY.len());
    }

    #[test]
    fn test_library_filters() {
        let chest = fallback_exercise_library(&ExerciseFilters {
            muscle_group: Some("Chest".to_string()),
            ..ExerciseFilters::default()
        });
        assert_eq!(chest.len(), 3);
        assert!(chest.iter().all(|e| e.muscle_group == "chest"));

        let limited = fallback_exercise_library(&ExerciseFilters {
            equipment: Some("bodyweight".to_string()),
            difficulty: Some(FitnessLevel::Beginner),
            limit: Some(1),
            ..ExerciseFilters::default()
        });
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].name, "Push-Up");
    }
}
