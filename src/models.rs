//! Core data models for workout and diet planning

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    WeightLoss,
    MuscleGain,
    WeightGain,
    Maintenance,
    Endurance,
    GeneralFitness,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    #[serde(alias = "male")]
    Male,
    #[serde(alias = "female")]
    Female,
    #[serde(alias = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Where a returned plan came from. Logged only, never part of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Cache,
    Upstream,
    Mock,
    Fallback,
}

//
// ================= Requests =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub age: u16,
    pub gender: Gender,
    pub goal: FitnessGoal,
    pub fitness_level: FitnessLevel,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPreferences {
    pub days_per_week: u8,
    pub session_minutes: u16,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl Default for WorkoutPreferences {
    fn default() -> Self {
        Self {
            days_per_week: 3,
            session_minutes: 45,
            equipment: Vec::new(),
            focus_areas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPlanRequest {
    pub user_id: String,
    pub profile: UserProfile,
    #[serde(default)]
    pub preferences: WorkoutPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietPreferences {
    #[serde(default)]
    pub diet_type: Option<String>,
    pub meals_per_day: u8,
    pub duration_days: u16,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl Default for DietPreferences {
    fn default() -> Self {
        Self {
            diet_type: None,
            meals_per_day: 4,
            duration_days: 7,
            allergies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietPlanRequest {
    pub user_id: String,
    pub profile: UserProfile,
    #[serde(default)]
    pub preferences: DietPreferences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseFilters {
    #[serde(default)]
    pub muscle_group: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub difficulty: Option<FitnessLevel>,
    #[serde(default)]
    pub limit: Option<u16>,
}

//
// ================= Workout Plans =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPlan {
    pub plan_name: String,
    pub goal: FitnessGoal,
    pub fitness_level: FitnessLevel,
    pub days_per_week: u8,
    pub session_minutes: u16,
    pub schedule: Vec<WorkoutDay>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutDay {
    pub day: u8,
    pub focus: String,
    pub exercises: Vec<PlannedExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedExercise {
    pub name: String,
    pub sets: u8,
    pub reps: String,
    pub rest_seconds: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    pub equipment: String,
    pub difficulty: FitnessLevel,
    #[serde(default)]
    pub instructions: Vec<String>,
}

//
// ================= Diet Plans =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietPlan {
    pub plan_name: String,
    pub goal: FitnessGoal,
    pub daily_calories: u32,
    pub macros: Macros,
    pub meals: Vec<Meal>,
    pub duration_days: u16,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Daily macronutrients in grams, keyed the way the diet service names them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    #[serde(rename = "Protein")]
    pub protein: f64,
    #[serde(rename = "Carbohydrates")]
    pub carbohydrates: f64,
    #[serde(rename = "Total Fat")]
    pub total_fat: f64,
    #[serde(rename = "Total Fiber")]
    pub total_fiber: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub name: String,
    pub calories: u32,
    #[serde(default)]
    pub foods: Vec<String>,
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FitnessLevel::Beginner => "Beginner",
            FitnessLevel::Intermediate => "Intermediate",
            FitnessLevel::Advanced => "Advanced",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for FitnessGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FitnessGoal::WeightLoss => "Weight Loss",
            FitnessGoal::MuscleGain => "Muscle Gain",
            FitnessGoal::WeightGain => "Weight Gain",
            FitnessGoal::Maintenance => "Maintenance",
            FitnessGoal::Endurance => "Endurance",
            FitnessGoal::GeneralFitness => "General Fitness",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanSource::Cache => "cache",
            PlanSource::Upstream => "upstream",
            PlanSource::Mock => "mock",
            PlanSource::Fallback => "fallback",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_accepts_lowercase_gender() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "age": 30,
            "gender": "female",
            "goal": "weight_loss",
            "fitness_level": "beginner"
        }))
        .unwrap();

        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.goal, FitnessGoal::WeightLoss);
        assert!(profile.height_cm.is_none());
    }

    #[test]
    fn test_macros_use_service_keys() {
        let macros = Macros {
            protein: 120.0,
            carbohydrates: 200.0,
            total_fat: 60.0,
            total_fiber: 30.0,
        };

        let json = serde_json::to_value(&macros).unwrap();
        assert_eq!(json["Total Fiber"], 30.0);
        assert_eq!(json["Total Fat"], 60.0);
    }
}
