//! Persisted store for the tracking library and check-in journal.
//!
//! The library (exercise/meal definitions, goal, pieces) is a single JSON
//! document saved atomically with file locking; check-ins live in the
//! append-only journal. All derived calorie fields are recomputed here at
//! write time, never accepted from callers as-is.

use crate::journal::{read_check_ins, rewrite_journal, CheckInSink, JsonlSink};
use crate::metrics::{calories_burned, clamp_multiplier, total_calories};
use crate::types::{CheckIn, Exercise, ExerciseLog, Meal, MealCheckIn, Piece, UserGoal};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// The library of user-defined entities, persisted as one JSON document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Library {
    pub exercises: HashMap<Uuid, Exercise>,
    pub meals: HashMap<Uuid, Meal>,
    pub pieces: HashMap<Uuid, Piece>,
    pub goal: Option<UserGoal>,
}

impl Library {
    /// Load the library from a file with shared locking
    ///
    /// Returns the default (empty) library if the file doesn't exist.
    /// A corrupted file logs a warning and loads as default.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No library file found, using empty library");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open library {:?}: {}. Using empty.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock library {:?}: {}. Using empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read library {:?}: {}. Using empty.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Library>(&contents) {
            Ok(library) => Ok(library),
            Err(e) => {
                tracing::warn!("Failed to parse library {:?}: {}. Using empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the library atomically (temp file + rename, exclusive lock)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "library path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved library to {:?}", path);
        Ok(())
    }

    /// Load, modify, save — the single write path for library mutations
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut Library) -> Result<T>,
    {
        let mut library = Self::load(path)?;
        let out = f(&mut library)?;
        library.save(path)?;
        Ok(out)
    }
}

/// Facade over the data directory: library document + check-in journal
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    /// Open a store rooted at the given data directory, creating it
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn library_path(&self) -> PathBuf {
        self.data_dir.join("library.json")
    }

    fn journal_path(&self) -> PathBuf {
        self.data_dir.join("check_ins.jsonl")
    }

    pub fn library(&self) -> Result<Library> {
        Library::load(&self.library_path())
    }

    // ------------------------------------------------------------------
    // Exercise CRUD
    // ------------------------------------------------------------------

    pub fn add_exercise(&self, exercise: Exercise) -> Result<Uuid> {
        exercise.validate()?;
        let id = exercise.id;
        Library::update(&self.library_path(), |lib| {
            lib.exercises.insert(id, exercise);
            Ok(())
        })?;
        Ok(id)
    }

    pub fn get_exercise(&self, id: Uuid) -> Result<Exercise> {
        self.library()?
            .exercises
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Store(format!("no exercise with id {}", id)))
    }

    /// All exercises, sorted by name for stable listings
    pub fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let mut exercises: Vec<_> = self.library()?.exercises.into_values().collect();
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exercises)
    }

    /// Replace an existing exercise definition
    pub fn update_exercise(&self, exercise: Exercise) -> Result<()> {
        exercise.validate()?;
        Library::update(&self.library_path(), |lib| {
            let slot = lib
                .exercises
                .get_mut(&exercise.id)
                .ok_or_else(|| Error::Store(format!("no exercise with id {}", exercise.id)))?;
            *slot = exercise;
            Ok(())
        })
    }

    /// Remove an exercise, cascading to its check-ins
    ///
    /// Returns the number of dependent check-ins removed.
    pub fn remove_exercise(&self, id: Uuid) -> Result<usize> {
        Library::update(&self.library_path(), |lib| {
            lib.exercises
                .remove(&id)
                .ok_or_else(|| Error::Store(format!("no exercise with id {}", id)))?;
            Ok(())
        })?;
        self.cascade_remove(id)
    }

    // ------------------------------------------------------------------
    // Meal CRUD
    // ------------------------------------------------------------------

    pub fn add_meal(&self, meal: Meal) -> Result<Uuid> {
        meal.validate()?;
        let id = meal.id;
        Library::update(&self.library_path(), |lib| {
            lib.meals.insert(id, meal);
            Ok(())
        })?;
        Ok(id)
    }

    pub fn get_meal(&self, id: Uuid) -> Result<Meal> {
        self.library()?
            .meals
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Store(format!("no meal with id {}", id)))
    }

    pub fn list_meals(&self) -> Result<Vec<Meal>> {
        let mut meals: Vec<_> = self.library()?.meals.into_values().collect();
        meals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(meals)
    }

    /// Replace an existing meal definition
    pub fn update_meal(&self, meal: Meal) -> Result<()> {
        meal.validate()?;
        Library::update(&self.library_path(), |lib| {
            let slot = lib
                .meals
                .get_mut(&meal.id)
                .ok_or_else(|| Error::Store(format!("no meal with id {}", meal.id)))?;
            *slot = meal;
            Ok(())
        })
    }

    /// Remove a meal, cascading to its check-ins
    pub fn remove_meal(&self, id: Uuid) -> Result<usize> {
        Library::update(&self.library_path(), |lib| {
            lib.meals
                .remove(&id)
                .ok_or_else(|| Error::Store(format!("no meal with id {}", id)))?;
            Ok(())
        })?;
        self.cascade_remove(id)
    }

    // ------------------------------------------------------------------
    // Piece CRUD and goal
    // ------------------------------------------------------------------

    pub fn add_piece(&self, piece: Piece) -> Result<Uuid> {
        piece.validate()?;
        let id = piece.id;
        Library::update(&self.library_path(), |lib| {
            lib.pieces.insert(id, piece);
            Ok(())
        })?;
        Ok(id)
    }

    pub fn list_pieces(&self) -> Result<Vec<Piece>> {
        let mut pieces: Vec<_> = self.library()?.pieces.into_values().collect();
        pieces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pieces)
    }

    /// Replace an existing piece
    pub fn update_piece(&self, piece: Piece) -> Result<()> {
        piece.validate()?;
        Library::update(&self.library_path(), |lib| {
            let slot = lib
                .pieces
                .get_mut(&piece.id)
                .ok_or_else(|| Error::Store(format!("no piece with id {}", piece.id)))?;
            *slot = piece;
            Ok(())
        })
    }

    pub fn remove_piece(&self, id: Uuid) -> Result<()> {
        Library::update(&self.library_path(), |lib| {
            lib.pieces
                .remove(&id)
                .ok_or_else(|| Error::Store(format!("no piece with id {}", id)))?;
            Ok(())
        })
    }

    pub fn goal(&self) -> Result<UserGoal> {
        Ok(self.library()?.goal.unwrap_or_default())
    }

    pub fn set_goal(&self, goal: UserGoal) -> Result<()> {
        goal.validate()?;
        Library::update(&self.library_path(), |lib| {
            lib.goal = Some(goal);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Check-ins
    // ------------------------------------------------------------------

    /// Log a performed exercise, deriving calories burned at write time
    pub fn log_exercise(
        &self,
        exercise_id: Uuid,
        weight: f64,
        reps: u32,
        sets: u32,
        performed_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ExerciseLog> {
        let exercise = self.get_exercise(exercise_id)?;

        let log = ExerciseLog {
            id: Uuid::new_v4(),
            exercise_id,
            weight,
            reps,
            sets,
            calories_burned: calories_burned(
                exercise.category,
                exercise.kcal_burned_per_unit,
                sets,
                reps,
            ),
            performed_at,
            notes,
        };
        log.validate()?;

        let mut sink = JsonlSink::new(self.journal_path());
        sink.append(&CheckIn::Exercise(log.clone()))?;
        tracing::info!(
            "Logged {} ({} kcal burned)",
            exercise.name,
            log.calories_burned
        );
        Ok(log)
    }

    /// Check in a consumed meal, deriving total calories at write time
    pub fn check_in_meal(
        &self,
        meal_id: Uuid,
        multiplier: f64,
        eaten_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<MealCheckIn> {
        let meal = self.get_meal(meal_id)?;
        let multiplier = clamp_multiplier(multiplier);

        let check_in = MealCheckIn {
            id: Uuid::new_v4(),
            meal_id,
            multiplier,
            total_calories: total_calories(meal.nutrition.calories, multiplier),
            eaten_at,
            notes,
        };
        check_in.validate()?;

        let mut sink = JsonlSink::new(self.journal_path());
        sink.append(&CheckIn::Meal(check_in.clone()))?;
        tracing::info!(
            "Checked in {} x{} ({} kcal)",
            meal.name,
            multiplier,
            check_in.total_calories
        );
        Ok(check_in)
    }

    /// Edit a check-in: derived calorie fields are recomputed from the
    /// current parent definition before the journal is rewritten.
    pub fn update_check_in(&self, check_in: CheckIn) -> Result<CheckIn> {
        let rederived = match check_in {
            CheckIn::Exercise(mut log) => {
                let exercise = self.get_exercise(log.exercise_id)?;
                log.calories_burned = calories_burned(
                    exercise.category,
                    exercise.kcal_burned_per_unit,
                    log.sets,
                    log.reps,
                );
                log.validate()?;
                CheckIn::Exercise(log)
            }
            CheckIn::Meal(mut ci) => {
                let meal = self.get_meal(ci.meal_id)?;
                ci.multiplier = clamp_multiplier(ci.multiplier);
                ci.total_calories = total_calories(meal.nutrition.calories, ci.multiplier);
                ci.validate()?;
                CheckIn::Meal(ci)
            }
        };

        let path = self.journal_path();
        let mut check_ins = read_check_ins(&path)?;
        let id = rederived.id();
        let slot = check_ins
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| Error::Store(format!("no check-in with id {}", id)))?;
        *slot = rederived.clone();
        rewrite_journal(&path, &check_ins)?;
        Ok(rederived)
    }

    /// All check-ins, newest first
    pub fn all_check_ins(&self) -> Result<Vec<CheckIn>> {
        let mut check_ins = read_check_ins(&self.journal_path())?;
        check_ins.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        Ok(check_ins)
    }

    /// Check-ins whose calendar date falls in [start, end], newest first
    pub fn check_ins_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CheckIn>> {
        let mut check_ins: Vec<_> = read_check_ins(&self.journal_path())?
            .into_iter()
            .filter(|c| {
                let date = c.timestamp().date_naive();
                date >= start && date <= end
            })
            .collect();
        check_ins.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        Ok(check_ins)
    }

    /// Append a check-in verbatim (used by the import reconciler, which
    /// has already validated and derived the record)
    pub(crate) fn append_check_in(&self, check_in: &CheckIn) -> Result<()> {
        let mut sink = JsonlSink::new(self.journal_path());
        sink.append(check_in)
    }

    /// Seed built-in exercise definitions into an empty library
    ///
    /// Returns the number of exercises added; a library that already has
    /// exercises is left untouched.
    pub fn seed_builtin_exercises(&self) -> Result<usize> {
        Library::update(&self.library_path(), |lib| {
            if !lib.exercises.is_empty() {
                return Ok(0);
            }
            let builtin = crate::catalog::builtin_exercises();
            let count = builtin.len();
            for exercise in builtin.iter().cloned() {
                lib.exercises.insert(exercise.id, exercise);
            }
            tracing::info!("Seeded {} built-in exercises", count);
            Ok(count)
        })
    }

    /// Drop all check-ins referencing the given parent id
    fn cascade_remove(&self, parent_id: Uuid) -> Result<usize> {
        let path = self.journal_path();
        let check_ins = read_check_ins(&path)?;
        let before = check_ins.len();
        let kept: Vec<_> = check_ins
            .into_iter()
            .filter(|c| c.parent_id() != parent_id)
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            rewrite_journal(&path, &kept)?;
            tracing::info!("Cascade-removed {} dependent check-ins", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExerciseCategory, Nutrition};

    fn open_store() -> (tempfile::TempDir, Store) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::open(temp_dir.path().join("data")).unwrap();
        (temp_dir, store)
    }

    fn squat() -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            name: "Barbell Squat".into(),
            category: ExerciseCategory::Strength,
            kcal_burned_per_unit: Some(5.0),
            default_weight: 60.0,
            default_reps: 5,
            default_sets: 5,
            equipment: Some("barbell".into()),
            muscle: Some("legs".into()),
        }
    }

    fn oatmeal() -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: "Oatmeal".into(),
            nutrition: Nutrition {
                calories: 200.0,
                protein_g: 5.0,
                carbs_g: 27.0,
                fat_g: 3.0,
                fiber_g: 4.0,
                sodium_mg: 0.0,
                sugar_g: None,
                cholesterol_mg: None,
            },
            serving_size: 100.0,
            serving_unit: "g".into(),
            score: None,
        }
    }

    #[test]
    fn test_exercise_crud_roundtrip() {
        let (_tmp, store) = open_store();
        let exercise = squat();
        let id = store.add_exercise(exercise.clone()).unwrap();

        let loaded = store.get_exercise(id).unwrap();
        assert_eq!(loaded.name, "Barbell Squat");

        assert_eq!(store.list_exercises().unwrap().len(), 1);
        store.remove_exercise(id).unwrap();
        assert!(store.get_exercise(id).is_err());
    }

    #[test]
    fn test_update_meal_replaces_definition() {
        let (_tmp, store) = open_store();
        let mut meal = oatmeal();
        let id = store.add_meal(meal.clone()).unwrap();

        meal.nutrition.calories = 250.0;
        store.update_meal(meal).unwrap();
        assert_eq!(store.get_meal(id).unwrap().nutrition.calories, 250.0);

        // Updating an unknown id is an error, not an upsert
        let mut stray = oatmeal();
        stray.id = Uuid::new_v4();
        assert!(store.update_meal(stray).is_err());
    }

    #[test]
    fn test_update_exercise_and_piece() {
        let (_tmp, store) = open_store();
        let mut exercise = squat();
        let ex_id = store.add_exercise(exercise.clone()).unwrap();
        exercise.kcal_burned_per_unit = Some(6.5);
        store.update_exercise(exercise).unwrap();
        assert_eq!(
            store.get_exercise(ex_id).unwrap().kcal_burned_per_unit,
            Some(6.5)
        );

        let mut piece = Piece {
            id: Uuid::new_v4(),
            name: "Water (glasses)".into(),
            value: 8,
        };
        store.add_piece(piece.clone()).unwrap();
        piece.value = 10;
        store.update_piece(piece.clone()).unwrap();
        assert_eq!(store.list_pieces().unwrap()[0].value, 10);
    }

    #[test]
    fn test_invalid_exercise_rejected() {
        let (_tmp, store) = open_store();
        let mut exercise = squat();
        exercise.name = "".into();
        assert!(store.add_exercise(exercise).is_err());
    }

    #[test]
    fn test_log_exercise_derives_calories() {
        let (_tmp, store) = open_store();
        let id = store.add_exercise(squat()).unwrap();

        // Strength: 3 sets x 5.0 = 15.0, weight/reps ignored
        let log = store
            .log_exercise(id, 50.0, 10, 3, Utc::now(), None)
            .unwrap();
        assert_eq!(log.calories_burned, 15.0);
    }

    #[test]
    fn test_check_in_meal_derives_total() {
        let (_tmp, store) = open_store();
        let id = store.add_meal(oatmeal()).unwrap();

        let ci = store.check_in_meal(id, 1.5, Utc::now(), None).unwrap();
        assert_eq!(ci.total_calories, 300);
        assert_eq!(ci.multiplier, 1.5);

        // Multiplier below the floor gets clamped
        let ci = store.check_in_meal(id, 0.01, Utc::now(), None).unwrap();
        assert_eq!(ci.multiplier, 0.1);
        assert_eq!(ci.total_calories, 20);
    }

    #[test]
    fn test_update_check_in_rederives() {
        let (_tmp, store) = open_store();
        let id = store.add_meal(oatmeal()).unwrap();
        let ci = store.check_in_meal(id, 1.0, Utc::now(), None).unwrap();

        let mut edited = ci.clone();
        edited.multiplier = 2.0;
        edited.total_calories = 1; // stale caller value, must be ignored

        let updated = store.update_check_in(CheckIn::Meal(edited)).unwrap();
        assert_eq!(updated.as_meal().unwrap().total_calories, 400);

        let all = store.all_check_ins().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].as_meal().unwrap().total_calories, 400);
    }

    #[test]
    fn test_cascade_delete_removes_check_ins() {
        let (_tmp, store) = open_store();
        let meal_id = store.add_meal(oatmeal()).unwrap();
        let ex_id = store.add_exercise(squat()).unwrap();

        store.check_in_meal(meal_id, 1.0, Utc::now(), None).unwrap();
        store.check_in_meal(meal_id, 2.0, Utc::now(), None).unwrap();
        store
            .log_exercise(ex_id, 60.0, 5, 5, Utc::now(), None)
            .unwrap();

        let removed = store.remove_meal(meal_id).unwrap();
        assert_eq!(removed, 2);

        // The exercise check-in survives
        let remaining = store.all_check_ins().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].as_exercise().is_some());
    }

    #[test]
    fn test_check_ins_between_filters_by_date() {
        let (_tmp, store) = open_store();
        let id = store.add_meal(oatmeal()).unwrap();

        let in_range = Utc::now();
        let out_of_range = in_range - chrono::Duration::days(30);
        store.check_in_meal(id, 1.0, in_range, None).unwrap();
        store.check_in_meal(id, 1.0, out_of_range, None).unwrap();

        let today = in_range.date_naive();
        let found = store
            .check_ins_between(today - chrono::Duration::days(7), today)
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_goal_defaults_then_set() {
        let (_tmp, store) = open_store();
        assert_eq!(store.goal().unwrap().calories_goal, 2000.0);

        let mut goal = UserGoal::default();
        goal.calories_goal = 2400.0;
        store.set_goal(goal).unwrap();
        assert_eq!(store.goal().unwrap().calories_goal, 2400.0);
    }

    #[test]
    fn test_seed_builtin_only_when_empty() {
        let (_tmp, store) = open_store();
        let first = store.seed_builtin_exercises().unwrap();
        assert!(first > 0);
        let second = store.seed_builtin_exercises().unwrap();
        assert_eq!(second, 0);
    }

    #[test]
    fn test_corrupted_library_loads_empty() {
        let (_tmp, store) = open_store();
        std::fs::write(store.data_dir().join("library.json"), "{ invalid").unwrap();
        assert!(store.list_meals().unwrap().is_empty());
    }
}
