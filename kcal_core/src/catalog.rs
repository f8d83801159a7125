//! Built-in starter exercises.
//!
//! A small set of common definitions with calorie rates, used to seed a
//! fresh data directory so the first `log` has something to reference.

use crate::types::{Exercise, ExerciseCategory};
use once_cell::sync::Lazy;
use uuid::Uuid;

/// Cached built-in exercise list - built once and reused
static BUILTIN: Lazy<Vec<Exercise>> = Lazy::new(build_builtin);

/// Built-in exercise definitions
///
/// IDs are fixed constants so repeated seeding across machines produces
/// the same references.
pub fn builtin_exercises() -> &'static [Exercise] {
    &BUILTIN
}

fn exercise(
    id: u128,
    name: &str,
    category: ExerciseCategory,
    rate: f64,
    weight: f64,
    reps: u32,
    sets: u32,
    equipment: Option<&str>,
    muscle: Option<&str>,
) -> Exercise {
    Exercise {
        id: Uuid::from_u128(id),
        name: name.into(),
        category,
        kcal_burned_per_unit: Some(rate),
        default_weight: weight,
        default_reps: reps,
        default_sets: sets,
        equipment: equipment.map(Into::into),
        muscle: muscle.map(Into::into),
    }
}

fn build_builtin() -> Vec<Exercise> {
    vec![
        exercise(
            0x01,
            "Barbell Squat",
            ExerciseCategory::Strength,
            6.0,
            60.0,
            5,
            5,
            Some("barbell"),
            Some("legs"),
        ),
        exercise(
            0x02,
            "Bench Press",
            ExerciseCategory::Strength,
            5.0,
            40.0,
            8,
            3,
            Some("barbell"),
            Some("chest"),
        ),
        exercise(
            0x03,
            "Deadlift",
            ExerciseCategory::Strength,
            7.0,
            80.0,
            5,
            3,
            Some("barbell"),
            Some("back"),
        ),
        // Cardio rates are per minute; reps record elapsed minutes
        exercise(
            0x04,
            "Running",
            ExerciseCategory::Cardio,
            10.0,
            0.0,
            30,
            1,
            None,
            None,
        ),
        exercise(
            0x05,
            "Cycling",
            ExerciseCategory::Cardio,
            8.0,
            0.0,
            45,
            1,
            Some("bicycle"),
            None,
        ),
        exercise(
            0x06,
            "Push-up",
            ExerciseCategory::Bodyweight,
            0.4,
            0.0,
            15,
            3,
            None,
            Some("chest"),
        ),
        exercise(
            0x07,
            "Pull-up",
            ExerciseCategory::Bodyweight,
            1.0,
            0.0,
            8,
            3,
            Some("pullup_bar"),
            Some("back"),
        ),
    ]
}

/// Validate the built-in list, returning human-readable problems
///
/// Empty result means the catalog is sound. Checked in tests and at CLI
/// startup in debug builds.
pub fn validate_builtin() -> Vec<String> {
    let mut errors = Vec::new();
    let exercises = builtin_exercises();

    for exercise in exercises {
        if let Err(e) = exercise.validate() {
            errors.push(format!("{}: {}", exercise.name, e));
        }
    }

    let mut ids: Vec<_> = exercises.iter().map(|e| e.id).collect();
    ids.sort();
    ids.dedup();
    if ids.len() != exercises.len() {
        errors.push("duplicate built-in exercise ids".into());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let errors = validate_builtin();
        assert!(errors.is_empty(), "catalog errors: {:?}", errors);
    }

    #[test]
    fn test_builtin_ids_are_stable() {
        let first = builtin_exercises();
        let again = build_builtin();
        for (a, b) in first.iter().zip(again.iter()) {
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn test_builtin_covers_all_categories() {
        let exercises = builtin_exercises();
        for category in [
            ExerciseCategory::Strength,
            ExerciseCategory::Cardio,
            ExerciseCategory::Bodyweight,
        ] {
            assert!(exercises.iter().any(|e| e.category == category));
        }
    }
}
