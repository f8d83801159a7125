//! Typed external catalog lookups.
//!
//! The food-product and exercise-database services are external
//! collaborators; this module consumes their typed results only, not
//! their transport. The file-backed implementations read JSON drop-in
//! files (e.g., a synced cache) and are the implementations used by the
//! CLI and tests. A missing file is an empty catalog; a malformed one
//! logs a warning and is ignored.

use crate::types::{Exercise, ExerciseCategory, Meal, Nutrition};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// A food product returned by the food search/lookup service
///
/// Nutrition values are per 100g/100ml unless a serving size is given.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodRecord {
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
    #[serde(default)]
    pub sodium_mg: f64,
    pub sugar_g: Option<f64>,
    pub serving_size: Option<f64>,
    pub serving_unit: Option<String>,
}

impl FoodRecord {
    /// Convert into a Meal definition, defaulting the serving to 100g
    pub fn into_meal(self) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: match &self.brand {
                Some(brand) => format!("{} ({})", self.name, brand),
                None => self.name.clone(),
            },
            nutrition: Nutrition {
                calories: self.calories,
                protein_g: self.protein_g,
                carbs_g: self.carbs_g,
                fat_g: self.fat_g,
                fiber_g: self.fiber_g,
                sodium_mg: self.sodium_mg,
                sugar_g: self.sugar_g,
                cholesterol_mg: None,
            },
            serving_size: self.serving_size.unwrap_or(100.0),
            serving_unit: self.serving_unit.unwrap_or_else(|| "g".into()),
            score: None,
        }
    }
}

/// An exercise returned by the exercise-database service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub name: String,
    pub category: ExerciseCategory,
    pub equipment: Option<String>,
    pub muscle: Option<String>,
    pub kcal_burned_per_unit: Option<f64>,
}

impl ExerciseRecord {
    /// Convert into an Exercise definition with neutral defaults
    pub fn into_exercise(self) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            name: self.name,
            category: self.category,
            kcal_burned_per_unit: self.kcal_burned_per_unit,
            default_weight: 0.0,
            default_reps: 10,
            default_sets: 3,
            equipment: self.equipment,
            muscle: self.muscle,
        }
    }
}

/// Search filters for the exercise database; all present fields must match
#[derive(Clone, Debug, Default)]
pub struct ExerciseQuery {
    pub name: Option<String>,
    pub equipment: Option<String>,
    pub muscle: Option<String>,
    pub category: Option<ExerciseCategory>,
}

/// Food-product search/lookup collaborator
pub trait FoodCatalog {
    fn by_barcode(&self, barcode: &str) -> Result<Option<FoodRecord>>;
    fn search(&self, query: &str) -> Result<Vec<FoodRecord>>;
}

/// Exercise-database search collaborator
pub trait ExerciseCatalog {
    fn search(&self, query: &ExerciseQuery) -> Result<Vec<ExerciseRecord>>;
}

fn load_records<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Vec<T> {
    if !path.exists() {
        tracing::debug!("No {} catalog file at {:?}", what, path);
        return Vec::new();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Failed to read {} catalog {:?}: {}. Ignoring.", what, path, e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Failed to parse {} catalog {:?}: {}. Ignoring.", what, path, e);
            Vec::new()
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// File-backed food catalog (JSON array of [`FoodRecord`])
pub struct FileFoodCatalog {
    records: Vec<FoodRecord>,
}

impl FileFoodCatalog {
    pub fn load(path: &Path) -> Self {
        let records = load_records(path, "food");
        tracing::debug!("Loaded {} food records", records.len());
        Self { records }
    }
}

impl FoodCatalog for FileFoodCatalog {
    fn by_barcode(&self, barcode: &str) -> Result<Option<FoodRecord>> {
        Ok(self
            .records
            .iter()
            .find(|r| r.barcode.as_deref() == Some(barcode))
            .cloned())
    }

    fn search(&self, query: &str) -> Result<Vec<FoodRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                contains_ci(&r.name, query)
                    || r.brand.as_deref().is_some_and(|b| contains_ci(b, query))
            })
            .cloned()
            .collect())
    }
}

/// File-backed exercise catalog (JSON array of [`ExerciseRecord`])
pub struct FileExerciseCatalog {
    records: Vec<ExerciseRecord>,
}

impl FileExerciseCatalog {
    pub fn load(path: &Path) -> Self {
        let records = load_records(path, "exercise");
        tracing::debug!("Loaded {} exercise records", records.len());
        Self { records }
    }
}

impl ExerciseCatalog for FileExerciseCatalog {
    fn search(&self, query: &ExerciseQuery) -> Result<Vec<ExerciseRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                let name_ok = query
                    .name
                    .as_deref()
                    .map_or(true, |n| contains_ci(&r.name, n));
                let equipment_ok = query.equipment.as_deref().map_or(true, |e| {
                    r.equipment.as_deref().is_some_and(|re| contains_ci(re, e))
                });
                let muscle_ok = query.muscle.as_deref().map_or(true, |m| {
                    r.muscle.as_deref().is_some_and(|rm| contains_ci(rm, m))
                });
                let category_ok = query.category.map_or(true, |c| r.category == c);
                name_ok && equipment_ok && muscle_ok && category_ok
            })
            .cloned()
            .collect())
    }
}
