//! Request and response schema validation
//!
//! Both directions go through the same field-path rules so that a payload is
//! either fully valid or rejected with the first failing field. Responses are
//! checked on the raw JSON before they are deserialized, so nothing partially
//! valid can reach the cache.

use crate::error::ValidationError;
use crate::models::{
    DietPlan, DietPlanRequest, Exercise, ExerciseFilters, WorkoutPlan, WorkoutPlanRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

const GOALS: &[&str] = &[
    "weight_loss",
    "muscle_gain",
    "weight_gain",
    "maintenance",
    "endurance",
    "general_fitness",
];
const GENDERS: &[&str] = &["Male", "Female", "Other"];
const LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

/// What a single value must look like
#[derive(Debug, Clone)]
pub enum Check {
    Text { min_len: usize, max_len: usize },
    Integer { min: i64, max: i64 },
    Number { min: f64, max: f64 },
    OneOf(&'static [&'static str]),
    TextList { max_len: usize },
    List { min_len: usize, max_len: usize, items: Box<Check> },
    Object(Vec<Field>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub required: bool,
    pub check: Check,
}

impl Field {
    pub fn required(name: &'static str, check: Check) -> Self {
        Self {
            name,
            required: true,
            check,
        }
    }

    pub fn optional(name: &'static str, check: Check) -> Self {
        Self {
            name,
            required: false,
            check,
        }
    }
}

fn text() -> Check {
    Check::Text {
        min_len: 1,
        max_len: 200,
    }
}

fn int(min: i64, max: i64) -> Check {
    Check::Integer { min, max }
}

fn num(min: f64, max: f64) -> Check {
    Check::Number { min, max }
}

fn text_list() -> Check {
    Check::TextList { max_len: 50 }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn root_name(path: &str) -> String {
    if path.is_empty() {
        "body".to_string()
    } else {
        path.to_string()
    }
}

/// Validate `value` against `check`, reporting the first failure under `path`
pub fn check_value(check: &Check, value: &Value, path: &str) -> Result<(), ValidationError> {
    match check {
        Check::Text { min_len, max_len } => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be a string"))?;
            let len = s.trim().chars().count();
            if len < *min_len || len > *max_len {
                return Err(ValidationError::new(
                    root_name(path),
                    format!("length must be between {} and {}", min_len, max_len),
                ));
            }
            Ok(())
        }
        Check::Integer { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be an integer"))?;
            if n < *min || n > *max {
                return Err(ValidationError::new(
                    root_name(path),
                    format!("must be between {} and {}", min, max),
                ));
            }
            Ok(())
        }
        Check::Number { min, max } => {
            let n = value
                .as_f64()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be a number"))?;
            if n < *min || n > *max {
                return Err(ValidationError::new(
                    root_name(path),
                    format!("must be between {} and {}", min, max),
                ));
            }
            Ok(())
        }
        Check::OneOf(allowed) => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be a string"))?;
            if !allowed.contains(&s) {
                return Err(ValidationError::new(
                    root_name(path),
                    format!("must be one of [{}]", allowed.join(", ")),
                ));
            }
            Ok(())
        }
        Check::TextList { max_len } => {
            let items = value
                .as_array()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be an array"))?;
            if items.len() > *max_len {
                return Err(ValidationError::new(
                    root_name(path),
                    format!("must have at most {} entries", max_len),
                ));
            }
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    return Err(ValidationError::new(
                        format!("{}[{}]", root_name(path), i),
                        "must be a string",
                    ));
                }
            }
            Ok(())
        }
        Check::List {
            min_len,
            max_len,
            items,
        } => {
            let list = value
                .as_array()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be an array"))?;
            if list.len() < *min_len || list.len() > *max_len {
                return Err(ValidationError::new(
                    root_name(path),
                    format!("must have between {} and {} entries", min_len, max_len),
                ));
            }
            for (i, item) in list.iter().enumerate() {
                check_value(items, item, &format!("{}[{}]", root_name(path), i))?;
            }
            Ok(())
        }
        Check::Object(fields) => {
            let map = value
                .as_object()
                .ok_or_else(|| ValidationError::new(root_name(path), "must be an object"))?;
            for field in fields {
                let field_path = join(path, field.name);
                match map.get(field.name) {
                    None | Some(Value::Null) if field.required => {
                        return Err(ValidationError::new(field_path, "is required"));
                    }
                    None | Some(Value::Null) => {}
                    Some(v) => check_value(&field.check, v, &field_path)?,
                }
            }
            Ok(())
        }
    }
}

//
// ================= Schemas =================
//

fn profile_schema() -> Check {
    Check::Object(vec![
        Field::required("age", int(13, 120)),
        Field::required("gender", Check::OneOf(GENDERS)),
        Field::required("goal", Check::OneOf(GOALS)),
        Field::required("fitness_level", Check::OneOf(LEVELS)),
        Field::optional("height_cm", num(100.0, 250.0)),
        Field::optional("weight_kg", num(30.0, 300.0)),
    ])
}

pub fn workout_request_schema() -> Check {
    Check::Object(vec![
        Field::required("user_id", text()),
        Field::required("profile", profile_schema()),
        Field::required(
            "preferences",
            Check::Object(vec![
                Field::required("days_per_week", int(1, 7)),
                Field::required("session_minutes", int(10, 180)),
                Field::optional("equipment", text_list()),
                Field::optional("focus_areas", text_list()),
            ]),
        ),
    ])
}

pub fn diet_request_schema() -> Check {
    Check::Object(vec![
        Field::required("user_id", text()),
        Field::required("profile", profile_schema()),
        Field::required(
            "preferences",
            Check::Object(vec![
                Field::optional("diet_type", text()),
                Field::required("meals_per_day", int(1, 8)),
                Field::required("duration_days", int(1, 90)),
                Field::optional("allergies", text_list()),
            ]),
        ),
    ])
}

pub fn exercise_filters_schema() -> Check {
    Check::Object(vec![
        Field::optional("muscle_group", text()),
        Field::optional("equipment", text()),
        Field::optional("difficulty", Check::OneOf(LEVELS)),
        Field::optional("limit", int(1, 100)),
    ])
}

pub fn workout_plan_schema() -> Check {
    let exercise = Check::Object(vec![
        Field::required("name", text()),
        Field::required("sets", int(1, 20)),
        Field::required("reps", text()),
        Field::required("rest_seconds", int(15, 600)),
    ]);

    let day = Check::Object(vec![
        Field::required("day", int(1, 7)),
        Field::required("focus", text()),
        Field::required(
            "exercises",
            Check::List {
                min_len: 1,
                max_len: 20,
                items: Box::new(exercise),
            },
        ),
    ]);

    Check::Object(vec![
        Field::required("plan_name", text()),
        Field::required("goal", Check::OneOf(GOALS)),
        Field::required("fitness_level", Check::OneOf(LEVELS)),
        Field::required("days_per_week", int(1, 7)),
        Field::required("session_minutes", int(10, 180)),
        Field::required(
            "schedule",
            Check::List {
                min_len: 1,
                max_len: 7,
                items: Box::new(day),
            },
        ),
        Field::optional("notes", text_list()),
    ])
}

pub fn diet_plan_schema() -> Check {
    let meal = Check::Object(vec![
        Field::required("name", text()),
        Field::required("calories", int(0, 3_000)),
        Field::optional("foods", text_list()),
    ]);

    Check::Object(vec![
        Field::required("plan_name", text()),
        Field::required("goal", Check::OneOf(GOALS)),
        Field::required("daily_calories", int(800, 6_000)),
        Field::required(
            "macros",
            Check::Object(vec![
                Field::required("Protein", num(0.0, 1_000.0)),
                Field::required("Carbohydrates", num(0.0, 1_500.0)),
                Field::required("Total Fat", num(0.0, 500.0)),
                Field::required("Total Fiber", num(0.0, 200.0)),
            ]),
        ),
        Field::required(
            "meals",
            Check::List {
                min_len: 1,
                max_len: 8,
                items: Box::new(meal),
            },
        ),
        Field::required("duration_days", int(1, 90)),
        Field::optional("recommendations", text_list()),
    ])
}

pub fn exercise_library_schema() -> Check {
    let exercise = Check::Object(vec![
        Field::required("id", text()),
        Field::required("name", text()),
        Field::required("muscle_group", text()),
        Field::required("equipment", text()),
        Field::required("difficulty", Check::OneOf(LEVELS)),
        Field::optional("instructions", text_list()),
    ]);

    Check::Object(vec![Field::required(
        "exercises",
        Check::List {
            min_len: 0,
            max_len: 500,
            items: Box::new(exercise),
        },
    )])
}

//
// ================= Entry Points =================
//

fn check_typed<T: Serialize>(check: &Check, value: &T) -> Result<(), ValidationError> {
    let json = serde_json::to_value(value)
        .map_err(|e| ValidationError::new("body", format!("not serializable: {}", e)))?;
    check_value(check, &json, "")
}

fn into_typed<T: DeserializeOwned>(value: &Value) -> Result<T, ValidationError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ValidationError::new("body", format!("does not match the expected shape: {}", e)))
}

pub fn validate_workout_request(request: &WorkoutPlanRequest) -> Result<(), ValidationError> {
    check_typed(&workout_request_schema(), request)
}

pub fn validate_diet_request(request: &DietPlanRequest) -> Result<(), ValidationError> {
    check_typed(&diet_request_schema(), request)
}

pub fn validate_exercise_filters(filters: &ExerciseFilters) -> Result<(), ValidationError> {
    check_typed(&exercise_filters_schema(), filters)
}

pub fn parse_workout_plan(value: &Value) -> Result<WorkoutPlan, ValidationError> {
    check_value(&workout_plan_schema(), value, "")?;

    let plan: WorkoutPlan = into_typed(value)?;
    if plan.schedule.len() != plan.days_per_week as usize {
        return Err(ValidationError::new(
            "schedule",
            format!(
                "has {} days but days_per_week is {}",
                plan.schedule.len(),
                plan.days_per_week
            ),
        ));
    }

    Ok(plan)
}

pub fn parse_diet_plan(value: &Value) -> Result<DietPlan, ValidationError> {
    check_value(&diet_plan_schema(), value, "")?;
    into_typed(value)
}

pub fn parse_exercise_library(value: &Value) -> Result<Vec<Exercise>, ValidationError> {
    check_value(&exercise_library_schema(), value, "")?;
    into_typed(&value["exercises"])
}
