//! Core domain types for the kcal tracking system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise definitions and performed exercise logs
//! - Meal definitions and meal check-ins
//! - User goals and generic tracked pieces
//! - The two-variant CheckIn sum type

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// Category of an exercise, which decides the calorie-burn formula
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Strength,
    Cardio,
    Bodyweight,
}

impl ExerciseCategory {
    /// Parse a category from user input (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strength" => Ok(ExerciseCategory::Strength),
            "cardio" => Ok(ExerciseCategory::Cardio),
            "bodyweight" => Ok(ExerciseCategory::Bodyweight),
            other => Err(Error::Validation(format!(
                "unknown exercise category '{}' (expected strength, cardio or bodyweight)",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseCategory::Strength => "strength",
            ExerciseCategory::Cardio => "cardio",
            ExerciseCategory::Bodyweight => "bodyweight",
        }
    }
}

/// A reusable exercise definition (e.g., "Barbell Squat")
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub category: ExerciseCategory,
    /// Calorie rate per unit: per set for strength, per rep/minute otherwise.
    /// None means the rate is unknown and burns are computed as 0.
    pub kcal_burned_per_unit: Option<f64>,
    pub default_weight: f64,
    pub default_reps: u32,
    pub default_sets: u32,
    pub equipment: Option<String>,
    pub muscle: Option<String>,
}

impl Exercise {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("exercise name must not be blank".into()));
        }
        if let Some(rate) = self.kcal_burned_per_unit {
            if rate < 0.0 || !rate.is_finite() {
                return Err(Error::Validation(format!(
                    "kcal rate for '{}' must be non-negative, got {}",
                    self.name, rate
                )));
            }
        }
        if self.default_weight < 0.0 {
            return Err(Error::Validation(format!(
                "default weight for '{}' must be non-negative",
                self.name
            )));
        }
        Ok(())
    }
}

/// One performed instance of an Exercise
///
/// `calories_burned` is derived from the parent exercise's category and
/// rate at write time. The store recomputes it on every insert/update;
/// values supplied by callers are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub weight: f64,
    pub reps: u32,
    pub sets: u32,
    pub calories_burned: f64,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ExerciseLog {
    pub fn validate(&self) -> Result<()> {
        if self.weight < 0.0 || !self.weight.is_finite() {
            return Err(Error::Validation("weight must be non-negative".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Meal Types
// ============================================================================

/// Per-serving nutrition values for a meal
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sodium_mg: f64,
    pub sugar_g: Option<f64>,
    pub cholesterol_mg: Option<f64>,
}

impl Nutrition {
    fn validate(&self, meal_name: &str) -> Result<()> {
        let fields = [
            ("calories", self.calories),
            ("protein", self.protein_g),
            ("carbs", self.carbs_g),
            ("fat", self.fat_g),
            ("fiber", self.fiber_g),
            ("sodium", self.sodium_mg),
        ];
        for (label, value) in fields {
            if value < 0.0 || !value.is_finite() {
                return Err(Error::Validation(format!(
                    "{} for '{}' must be non-negative, got {}",
                    label, meal_name, value
                )));
            }
        }
        Ok(())
    }
}

/// A reusable food definition with per-serving nutrition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub nutrition: Nutrition,
    pub serving_size: f64,
    pub serving_unit: String,
    /// Optional classification score (e.g., an external quality grade)
    pub score: Option<f64>,
}

impl Meal {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("meal name must not be blank".into()));
        }
        if self.serving_size <= 0.0 || !self.serving_size.is_finite() {
            return Err(Error::Validation(format!(
                "serving size for '{}' must be positive, got {}",
                self.name, self.serving_size
            )));
        }
        self.nutrition.validate(&self.name)
    }
}

/// Smallest accepted serving multiplier; lower values are clamped up.
pub const MIN_SERVING_MULTIPLIER: f64 = 0.1;

/// One logged consumption of a Meal
///
/// `total_calories` is derived: `floor(meal.calories * multiplier)`.
/// The store recomputes it on every insert/update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MealCheckIn {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub multiplier: f64,
    pub total_calories: u32,
    pub eaten_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl MealCheckIn {
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(Error::Validation(format!(
                "serving multiplier must be positive, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Goal and Piece Types
// ============================================================================

/// Daily target macro/calorie budget
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserGoal {
    pub calories_goal: f64,
    pub carbs_goal_g: f64,
    pub protein_goal_g: f64,
    pub fat_goal_g: f64,
    pub fiber_goal_g: f64,
    pub sodium_goal_mg: f64,
}

impl UserGoal {
    pub fn validate(&self) -> Result<()> {
        if self.calories_goal <= 0.0 || !self.calories_goal.is_finite() {
            return Err(Error::Validation(format!(
                "calories goal must be positive, got {}",
                self.calories_goal
            )));
        }
        let fields = [
            ("carbs goal", self.carbs_goal_g),
            ("protein goal", self.protein_goal_g),
            ("fat goal", self.fat_goal_g),
            ("fiber goal", self.fiber_goal_g),
            ("sodium goal", self.sodium_goal_mg),
        ];
        for (label, value) in fields {
            if value < 0.0 || !value.is_finite() {
                return Err(Error::Validation(format!(
                    "{} must be non-negative, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for UserGoal {
    fn default() -> Self {
        Self {
            calories_goal: 2000.0,
            carbs_goal_g: 250.0,
            protein_goal_g: 100.0,
            fat_goal_g: 70.0,
            fiber_goal_g: 30.0,
            sodium_goal_mg: 2300.0,
        }
    }
}

/// A generic named numeric value (checklist-style tracked item)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Piece {
    pub id: Uuid,
    pub name: String,
    pub value: u32,
}

impl Piece {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("piece name must not be blank".into()));
        }
        if self.value == 0 {
            return Err(Error::Validation(format!(
                "value for '{}' must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Check-in Sum Type
// ============================================================================

/// A timestamped record of performing an Exercise or consuming a Meal
///
/// Exactly two variants, decided by pattern match. This replaces nullable
/// field-presence checks with a tagged union at the type level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckIn {
    Exercise(ExerciseLog),
    Meal(MealCheckIn),
}

impl CheckIn {
    pub fn id(&self) -> Uuid {
        match self {
            CheckIn::Exercise(log) => log.id,
            CheckIn::Meal(ci) => ci.id,
        }
    }

    /// Timestamp of the check-in (performed_at or eaten_at)
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CheckIn::Exercise(log) => log.performed_at,
            CheckIn::Meal(ci) => ci.eaten_at,
        }
    }

    /// Id of the parent Exercise/Meal definition this check-in references
    pub fn parent_id(&self) -> Uuid {
        match self {
            CheckIn::Exercise(log) => log.exercise_id,
            CheckIn::Meal(ci) => ci.meal_id,
        }
    }

    pub fn as_meal(&self) -> Option<&MealCheckIn> {
        match self {
            CheckIn::Meal(ci) => Some(ci),
            CheckIn::Exercise(_) => None,
        }
    }

    pub fn as_exercise(&self) -> Option<&ExerciseLog> {
        match self {
            CheckIn::Exercise(log) => Some(log),
            CheckIn::Meal(_) => None,
        }
    }
}

// ============================================================================
// Numeric Input Parsing
// ============================================================================

/// Parse a strictly positive number from user input
///
/// Unparseable or non-positive input is a hard validation error. The
/// original behavior of silently defaulting to zero masked typos.
pub fn parse_positive(field: &str, input: &str) -> Result<f64> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("{} must be a number, got '{}'", field, input)))?;
    if value <= 0.0 || !value.is_finite() {
        return Err(Error::Validation(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(value)
}

/// Parse a non-negative number from user input
pub fn parse_non_negative(field: &str, input: &str) -> Result<f64> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("{} must be a number, got '{}'", field, input)))?;
    if value < 0.0 || !value.is_finite() {
        return Err(Error::Validation(format!(
            "{} must be non-negative, got {}",
            field, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meal() -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: "Oatmeal".into(),
            nutrition: Nutrition {
                calories: 150.0,
                protein_g: 5.0,
                carbs_g: 27.0,
                fat_g: 3.0,
                fiber_g: 4.0,
                sodium_mg: 0.0,
                sugar_g: Some(1.0),
                cholesterol_mg: None,
            },
            serving_size: 40.0,
            serving_unit: "g".into(),
            score: None,
        }
    }

    #[test]
    fn test_blank_exercise_name_rejected() {
        let exercise = Exercise {
            id: Uuid::new_v4(),
            name: "   ".into(),
            category: ExerciseCategory::Strength,
            kcal_burned_per_unit: Some(5.0),
            default_weight: 0.0,
            default_reps: 10,
            default_sets: 3,
            equipment: None,
            muscle: None,
        };
        assert!(exercise.validate().is_err());
    }

    #[test]
    fn test_negative_kcal_rate_rejected() {
        let exercise = Exercise {
            id: Uuid::new_v4(),
            name: "Squat".into(),
            category: ExerciseCategory::Strength,
            kcal_burned_per_unit: Some(-1.0),
            default_weight: 60.0,
            default_reps: 5,
            default_sets: 5,
            equipment: Some("barbell".into()),
            muscle: Some("legs".into()),
        };
        assert!(exercise.validate().is_err());
    }

    #[test]
    fn test_meal_validation() {
        let meal = sample_meal();
        assert!(meal.validate().is_ok());

        let mut bad = meal.clone();
        bad.serving_size = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = meal;
        bad.nutrition.protein_g = -2.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_goal_validation() {
        assert!(UserGoal::default().validate().is_ok());

        let mut goal = UserGoal::default();
        goal.calories_goal = 0.0;
        assert!(goal.validate().is_err());

        let mut goal = UserGoal::default();
        goal.fiber_goal_g = 0.0;
        assert!(goal.validate().is_ok()); // zero allowed for non-calorie goals
    }

    #[test]
    fn test_piece_requires_positive_value() {
        let piece = Piece {
            id: Uuid::new_v4(),
            name: "Water (glasses)".into(),
            value: 0,
        };
        assert!(piece.validate().is_err());
    }

    #[test]
    fn test_checkin_roundtrip_tagged() {
        let ci = CheckIn::Meal(MealCheckIn {
            id: Uuid::new_v4(),
            meal_id: Uuid::new_v4(),
            multiplier: 1.5,
            total_calories: 300,
            eaten_at: Utc::now(),
            notes: None,
        });

        let json = serde_json::to_string(&ci).unwrap();
        assert!(json.contains("\"type\":\"meal\""));

        let back: CheckIn = serde_json::from_str(&json).unwrap();
        assert!(back.as_meal().is_some());
        assert!(back.as_exercise().is_none());
    }

    #[test]
    fn test_parse_positive_rejects_garbage() {
        assert!(parse_positive("weight", "abc").is_err());
        assert!(parse_positive("weight", "-3").is_err());
        assert!(parse_positive("weight", "0").is_err());
        assert_eq!(parse_positive("weight", " 52.5 ").unwrap(), 52.5);
    }

    #[test]
    fn test_parse_non_negative_accepts_zero() {
        assert_eq!(parse_non_negative("fiber", "0").unwrap(), 0.0);
        assert!(parse_non_negative("fiber", "-0.1").is_err());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            ExerciseCategory::parse("STRENGTH").unwrap(),
            ExerciseCategory::Strength
        );
        assert!(ExerciseCategory::parse("yoga").is_err());
    }
}
