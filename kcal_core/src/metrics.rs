//! Derived-metric calculation.
//!
//! Pure functions mapping entity fields to derived outputs:
//! - Calories burned for a performed exercise
//! - Total calories for a meal check-in
//! - Proportional (linked) serving-size rescaling
//! - Thermic effect of food

use crate::types::{ExerciseCategory, Meal, Nutrition, MIN_SERVING_MULTIPLIER};

/// Compute calories burned for one performed exercise
///
/// - Strength: `sets * rate` (weight and reps do not enter the formula)
/// - Cardio: `reps * rate` (reps represent elapsed minutes for cardio)
/// - Bodyweight: `reps * rate`
///
/// A missing rate means the burn is simply unknown and reported as 0.
pub fn calories_burned(
    category: ExerciseCategory,
    kcal_per_unit: Option<f64>,
    sets: u32,
    reps: u32,
) -> f64 {
    let rate = kcal_per_unit.unwrap_or(0.0);
    let burned = match category {
        ExerciseCategory::Strength => sets as f64 * rate,
        ExerciseCategory::Cardio | ExerciseCategory::Bodyweight => reps as f64 * rate,
    };
    burned.max(0.0)
}

/// Clamp a serving multiplier to the accepted low end (uncapped above)
pub fn clamp_multiplier(multiplier: f64) -> f64 {
    if !multiplier.is_finite() {
        return MIN_SERVING_MULTIPLIER;
    }
    multiplier.max(MIN_SERVING_MULTIPLIER)
}

/// Total calories for a meal check-in: `floor(calories * multiplier)`
pub fn total_calories(meal_calories: f64, multiplier: f64) -> u32 {
    let total = meal_calories * clamp_multiplier(multiplier);
    total.max(0.0).floor() as u32
}

/// Thermic effect of food: estimated digestion calorie bonus
///
/// 25% of protein energy, 8% of carbohydrate energy, 2% of fat energy,
/// at 4/4/9 kcal per gram.
pub fn thermic_effect(protein_g: f64, carbs_g: f64, fat_g: f64) -> f64 {
    let tef = protein_g * 4.0 * 0.25 + carbs_g * 4.0 * 0.08 + fat_g * 9.0 * 0.02;
    tef.max(0.0)
}

/// Scaled nutrition values produced by a [`ServingScaler`] rescale
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledServing {
    pub serving_size: f64,
    pub nutrition: Nutrition,
}

/// Linked serving-size rescaler anchored to an unedited baseline.
///
/// Every rescale is computed from the baseline captured when editing
/// began, never from previously scaled (possibly rounded) values, so
/// entering the same serving size repeatedly always yields the same
/// result with no compounding drift.
#[derive(Clone, Debug)]
pub struct ServingScaler {
    baseline_serving: f64,
    baseline: Nutrition,
}

impl ServingScaler {
    /// Capture the baseline from a meal at the start of an edit
    pub fn new(meal: &Meal) -> Self {
        Self {
            baseline_serving: meal.serving_size,
            baseline: meal.nutrition.clone(),
        }
    }

    /// Rescale all nutrition fields to a new serving amount
    ///
    /// Returns None when the baseline serving size is 0: there is no
    /// ratio to scale by, and the fields are left unchanged.
    pub fn rescale(&self, new_serving: f64) -> Option<ScaledServing> {
        if self.baseline_serving == 0.0 {
            tracing::warn!("baseline serving size is 0, skipping rescale");
            return None;
        }

        let ratio = new_serving / self.baseline_serving;
        let b = &self.baseline;
        Some(ScaledServing {
            serving_size: new_serving,
            nutrition: Nutrition {
                calories: b.calories * ratio,
                protein_g: b.protein_g * ratio,
                carbs_g: b.carbs_g * ratio,
                fat_g: b.fat_g * ratio,
                fiber_g: b.fiber_g * ratio,
                sodium_mg: b.sodium_mg * ratio,
                sugar_g: b.sugar_g.map(|v| v * ratio),
                cholesterol_mg: b.cholesterol_mg.map(|v| v * ratio),
            },
        })
    }

    /// Rescale by a multiplier of the baseline serving size
    pub fn rescale_by(&self, multiplier: f64) -> Option<ScaledServing> {
        self.rescale(self.baseline_serving * clamp_multiplier(multiplier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn meal_200_per_100g() -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: "Rice".into(),
            nutrition: Nutrition {
                calories: 200.0,
                protein_g: 4.0,
                carbs_g: 44.0,
                fat_g: 0.5,
                fiber_g: 0.6,
                sodium_mg: 2.0,
                sugar_g: Some(0.1),
                cholesterol_mg: None,
            },
            serving_size: 100.0,
            serving_unit: "g".into(),
            score: None,
        }
    }

    #[test]
    fn test_strength_burn_ignores_weight_and_reps() {
        // Concrete scenario: rate 5.0, 3 sets -> 15.0 regardless of reps/weight
        let burned = calories_burned(ExerciseCategory::Strength, Some(5.0), 3, 10);
        assert_eq!(burned, 15.0);

        let other_reps = calories_burned(ExerciseCategory::Strength, Some(5.0), 3, 99);
        assert_eq!(burned, other_reps);
    }

    #[test]
    fn test_cardio_and_bodyweight_burn_use_reps() {
        assert_eq!(
            calories_burned(ExerciseCategory::Cardio, Some(8.0), 1, 30),
            240.0
        );
        assert_eq!(
            calories_burned(ExerciseCategory::Bodyweight, Some(0.5), 4, 20),
            10.0
        );
    }

    #[test]
    fn test_missing_rate_burns_zero() {
        assert_eq!(calories_burned(ExerciseCategory::Strength, None, 5, 5), 0.0);
    }

    #[test]
    fn test_total_calories_floors() {
        // Concrete scenario: 200 kcal meal at 1.5 servings -> 300
        assert_eq!(total_calories(200.0, 1.5), 300);
        assert_eq!(total_calories(333.0, 0.5), 166);
    }

    #[test]
    fn test_multiplier_clamped_low_uncapped_high() {
        assert_eq!(total_calories(200.0, 0.01), 20); // clamped to 0.1
        assert_eq!(total_calories(200.0, 10.0), 2000);
    }

    #[test]
    fn test_rescale_is_proportional() {
        let meal = meal_200_per_100g();
        let scaler = ServingScaler::new(&meal);

        let scaled = scaler.rescale(150.0).unwrap();
        assert_eq!(scaled.serving_size, 150.0);
        assert_eq!(scaled.nutrition.calories, 300.0);
        assert_eq!(scaled.nutrition.carbs_g, 66.0);
        assert_eq!(scaled.nutrition.sugar_g, Some(0.15000000000000002));
    }

    #[test]
    fn test_repeated_rescale_is_idempotent() {
        let meal = meal_200_per_100g();
        let scaler = ServingScaler::new(&meal);

        // Entering the same serving several times must not drift:
        // always computed from the baseline, not the displayed values.
        let first = scaler.rescale(73.0).unwrap();
        let again = scaler.rescale(250.0).unwrap();
        let settled = scaler.rescale(73.0).unwrap();

        assert_eq!(first, settled);
        assert_eq!(first.nutrition, settled.nutrition);
        assert_ne!(first, again);
    }

    #[test]
    fn test_zero_baseline_skips_scaling() {
        let mut meal = meal_200_per_100g();
        meal.serving_size = 0.0;
        let scaler = ServingScaler::new(&meal);
        assert!(scaler.rescale(50.0).is_none());
    }

    #[test]
    fn test_rescale_by_multiplier() {
        let meal = meal_200_per_100g();
        let scaler = ServingScaler::new(&meal);

        let scaled = scaler.rescale_by(1.5).unwrap();
        assert_eq!(scaled.serving_size, 150.0);
        assert_eq!(scaled.nutrition.calories, 300.0);
    }

    #[test]
    fn test_thermic_effect_formula() {
        // 100g protein, 0 carbs, 0 fat -> 100 * 4 * 0.25 = 100 kcal
        assert_eq!(thermic_effect(100.0, 0.0, 0.0), 100.0);
        assert_eq!(thermic_effect(0.0, 0.0, 0.0), 0.0);
    }
}
