//! Import/export bundle reconciliation.
//!
//! An export bundle is a directory with one CSV file per table plus a
//! JSON manifest. Import parses each table row-by-row and classifies
//! every record as imported, skipped or failed with severity-tagged
//! issues: a failed row never aborts the batch, warnings are non-fatal,
//! and only setup-level problems (missing bundle or manifest) fail the
//! import as a whole.

use crate::config::ImportConfig;
use crate::metrics::{calories_burned, clamp_multiplier, total_calories};
use crate::store::Store;
use crate::types::{
    CheckIn, Exercise, ExerciseCategory, ExerciseLog, Meal, MealCheckIn, Nutrition, Piece,
    UserGoal, MIN_SERVING_MULTIPLIER,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

const MANIFEST_FILE: &str = "manifest.json";
const BUNDLE_VERSION: u32 = 1;

/// Table names in import order (parents before dependents)
const TABLES: [&str; 5] = ["exercises", "meals", "goal", "pieces", "check_ins"];

// ============================================================================
// Manifest and report types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    created_at: DateTime<Utc>,
    tables: HashMap<String, usize>,
}

/// Severity of an import issue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Non-fatal: the record was imported anyway (possibly adjusted)
    Warning,
    /// Fatal: that record failed; the rest of the import continues
    Fatal,
}

/// One classified problem found during import
#[derive(Clone, Debug)]
pub struct ImportIssue {
    pub table: String,
    pub row: usize,
    pub field: Option<String>,
    pub message: String,
    pub severity: Severity,
}

/// Progress notification emitted while importing
#[derive(Clone, Debug)]
pub struct ImportProgress {
    pub table: String,
    /// Overall completion across all tables, 0.0..=100.0
    pub percent: f64,
    pub processed: usize,
    pub imported: usize,
}

/// Aggregate result of an import run
#[derive(Debug)]
pub struct ImportReport {
    pub records_processed: usize,
    pub records_imported: usize,
    pub records_skipped: usize,
    pub records_failed: usize,
    pub issues: Vec<ImportIssue>,
    pub duration: Duration,
    /// False only on setup-level failure (missing bundle/manifest);
    /// per-row failures never flip this flag
    pub is_success: bool,
}

impl ImportReport {
    pub fn errors(&self) -> impl Iterator<Item = &ImportIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Fatal)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ImportIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    /// Human-readable summary with capped error/warning previews
    pub fn format_summary(&self, limits: &ImportConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Imported {} of {} records ({} skipped, {} failed) in {:.1}s",
            self.records_imported,
            self.records_processed,
            self.records_skipped,
            self.records_failed,
            self.duration.as_secs_f64(),
        );

        let errors: Vec<_> = self.errors().collect();
        if !errors.is_empty() {
            let _ = writeln!(out, "Errors:");
            for issue in errors.iter().take(limits.error_preview) {
                let _ = writeln!(out, "  {}", format_issue(issue));
            }
            if errors.len() > limits.error_preview {
                let _ = writeln!(out, "  ... and {} more", errors.len() - limits.error_preview);
            }
        }

        let warnings: Vec<_> = self.warnings().collect();
        if !warnings.is_empty() {
            let _ = writeln!(out, "Warnings:");
            for issue in warnings.iter().take(limits.warning_preview) {
                let _ = writeln!(out, "  {}", format_issue(issue));
            }
            if warnings.len() > limits.warning_preview {
                let _ = writeln!(
                    out,
                    "  ... and {} more",
                    warnings.len() - limits.warning_preview
                );
            }
        }

        out
    }
}

fn format_issue(issue: &ImportIssue) -> String {
    match &issue.field {
        Some(field) => format!(
            "{} row {}: {} ({})",
            issue.table, issue.row, issue.message, field
        ),
        None => format!("{} row {}: {}", issue.table, issue.row, issue.message),
    }
}

/// Per-table counts from an export run
#[derive(Debug)]
pub struct ExportReport {
    pub tables: Vec<(String, usize)>,
}

impl ExportReport {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

// ============================================================================
// CSV row formats
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ExerciseRow {
    id: String,
    name: String,
    category: String,
    kcal_burned_per_unit: Option<f64>,
    default_weight: f64,
    default_reps: u32,
    default_sets: u32,
    equipment: Option<String>,
    muscle: Option<String>,
}

impl From<&Exercise> for ExerciseRow {
    fn from(exercise: &Exercise) -> Self {
        ExerciseRow {
            id: exercise.id.to_string(),
            name: exercise.name.clone(),
            category: exercise.category.as_str().into(),
            kcal_burned_per_unit: exercise.kcal_burned_per_unit,
            default_weight: exercise.default_weight,
            default_reps: exercise.default_reps,
            default_sets: exercise.default_sets,
            equipment: exercise.equipment.clone(),
            muscle: exercise.muscle.clone(),
        }
    }
}

impl TryFrom<ExerciseRow> for Exercise {
    type Error = Error;

    fn try_from(row: ExerciseRow) -> Result<Self> {
        let exercise = Exercise {
            id: parse_uuid(&row.id)?,
            name: row.name,
            category: ExerciseCategory::parse(&row.category)?,
            kcal_burned_per_unit: row.kcal_burned_per_unit,
            default_weight: row.default_weight,
            default_reps: row.default_reps,
            default_sets: row.default_sets,
            equipment: row.equipment,
            muscle: row.muscle,
        };
        exercise.validate()?;
        Ok(exercise)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MealRow {
    id: String,
    name: String,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
    fiber_g: f64,
    sodium_mg: f64,
    sugar_g: Option<f64>,
    cholesterol_mg: Option<f64>,
    serving_size: f64,
    serving_unit: String,
    score: Option<f64>,
}

impl From<&Meal> for MealRow {
    fn from(meal: &Meal) -> Self {
        MealRow {
            id: meal.id.to_string(),
            name: meal.name.clone(),
            calories: meal.nutrition.calories,
            protein_g: meal.nutrition.protein_g,
            carbs_g: meal.nutrition.carbs_g,
            fat_g: meal.nutrition.fat_g,
            fiber_g: meal.nutrition.fiber_g,
            sodium_mg: meal.nutrition.sodium_mg,
            sugar_g: meal.nutrition.sugar_g,
            cholesterol_mg: meal.nutrition.cholesterol_mg,
            serving_size: meal.serving_size,
            serving_unit: meal.serving_unit.clone(),
            score: meal.score,
        }
    }
}

impl TryFrom<MealRow> for Meal {
    type Error = Error;

    fn try_from(row: MealRow) -> Result<Self> {
        let meal = Meal {
            id: parse_uuid(&row.id)?,
            name: row.name,
            nutrition: Nutrition {
                calories: row.calories,
                protein_g: row.protein_g,
                carbs_g: row.carbs_g,
                fat_g: row.fat_g,
                fiber_g: row.fiber_g,
                sodium_mg: row.sodium_mg,
                sugar_g: row.sugar_g,
                cholesterol_mg: row.cholesterol_mg,
            },
            serving_size: row.serving_size,
            serving_unit: row.serving_unit,
            score: row.score,
        };
        meal.validate()?;
        Ok(meal)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GoalRow {
    calories_goal: f64,
    carbs_goal_g: f64,
    protein_goal_g: f64,
    fat_goal_g: f64,
    fiber_goal_g: f64,
    sodium_goal_mg: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PieceRow {
    id: String,
    name: String,
    value: u32,
}

/// Check-in rows carry only source fields; derived calorie values are
/// recomputed against the importing store's definitions.
#[derive(Debug, Serialize, Deserialize)]
struct CheckInRow {
    id: String,
    kind: String,
    parent_id: String,
    timestamp: String,
    weight: Option<f64>,
    reps: Option<u32>,
    sets: Option<u32>,
    multiplier: Option<f64>,
    notes: Option<String>,
}

impl From<&CheckIn> for CheckInRow {
    fn from(check_in: &CheckIn) -> Self {
        match check_in {
            CheckIn::Exercise(log) => CheckInRow {
                id: log.id.to_string(),
                kind: "exercise".into(),
                parent_id: log.exercise_id.to_string(),
                timestamp: log.performed_at.to_rfc3339(),
                weight: Some(log.weight),
                reps: Some(log.reps),
                sets: Some(log.sets),
                multiplier: None,
                notes: log.notes.clone(),
            },
            CheckIn::Meal(ci) => CheckInRow {
                id: ci.id.to_string(),
                kind: "meal".into(),
                parent_id: ci.meal_id.to_string(),
                timestamp: ci.eaten_at.to_rfc3339(),
                weight: None,
                reps: None,
                sets: None,
                multiplier: Some(ci.multiplier),
                notes: ci.notes.clone(),
            },
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|e| Error::Validation(format!("invalid id '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("invalid timestamp '{}': {}", s, e)))
}

// ============================================================================
// Export
// ============================================================================

fn write_table<T: Serialize>(dir: &Path, table: &str, rows: &[T]) -> Result<usize> {
    let path = dir.join(format!("{}.csv", table));
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)?;

    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::Store(format!("failed to flush {}: {}", table, e)))?;
    file.sync_all()?;

    Ok(rows.len())
}

/// Export the whole store into a bundle directory
///
/// Writes one CSV per table plus `manifest.json`, fsyncing each table
/// before the manifest so a bundle with a manifest is always complete.
pub fn export_bundle(store: &Store, dir: &Path) -> Result<ExportReport> {
    std::fs::create_dir_all(dir)?;

    let library = store.library()?;
    let check_ins = store.all_check_ins()?;

    let exercise_rows: Vec<ExerciseRow> = {
        let mut exercises: Vec<_> = library.exercises.values().collect();
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        exercises.into_iter().map(ExerciseRow::from).collect()
    };
    let meal_rows: Vec<MealRow> = {
        let mut meals: Vec<_> = library.meals.values().collect();
        meals.sort_by(|a, b| a.name.cmp(&b.name));
        meals.into_iter().map(MealRow::from).collect()
    };
    let goal_rows: Vec<GoalRow> = library
        .goal
        .iter()
        .map(|g| GoalRow {
            calories_goal: g.calories_goal,
            carbs_goal_g: g.carbs_goal_g,
            protein_goal_g: g.protein_goal_g,
            fat_goal_g: g.fat_goal_g,
            fiber_goal_g: g.fiber_goal_g,
            sodium_goal_mg: g.sodium_goal_mg,
        })
        .collect();
    let piece_rows: Vec<PieceRow> = {
        let mut pieces: Vec<_> = library.pieces.values().collect();
        pieces.sort_by(|a, b| a.name.cmp(&b.name));
        pieces
            .into_iter()
            .map(|p| PieceRow {
                id: p.id.to_string(),
                name: p.name.clone(),
                value: p.value,
            })
            .collect()
    };
    let check_in_rows: Vec<CheckInRow> = check_ins.iter().map(CheckInRow::from).collect();

    let mut tables = Vec::new();
    tables.push(("exercises".to_string(), write_table(dir, "exercises", &exercise_rows)?));
    tables.push(("meals".to_string(), write_table(dir, "meals", &meal_rows)?));
    tables.push(("goal".to_string(), write_table(dir, "goal", &goal_rows)?));
    tables.push(("pieces".to_string(), write_table(dir, "pieces", &piece_rows)?));
    tables.push((
        "check_ins".to_string(),
        write_table(dir, "check_ins", &check_in_rows)?,
    ));

    let manifest = Manifest {
        version: BUNDLE_VERSION,
        created_at: Utc::now(),
        tables: tables.iter().cloned().collect(),
    };
    std::fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    let report = ExportReport { tables };
    tracing::info!("Exported {} records to {:?}", report.total(), dir);
    Ok(report)
}

// ============================================================================
// Import
// ============================================================================

struct ImportState<'a> {
    store: &'a Store,
    report: ImportReport,
    total_rows: usize,
    expected: HashMap<String, usize>,
    known_exercises: HashMap<Uuid, Exercise>,
    known_meals: HashMap<Uuid, Meal>,
    known_pieces: std::collections::HashSet<Uuid>,
    known_check_ins: std::collections::HashSet<Uuid>,
}

impl ImportState<'_> {
    fn issue(&mut self, table: &str, row: usize, field: Option<&str>, message: String, severity: Severity) {
        self.report.issues.push(ImportIssue {
            table: table.into(),
            row,
            field: field.map(Into::into),
            message,
            severity,
        });
    }

    fn emit_progress<F: FnMut(ImportProgress)>(&self, table: &str, progress: &mut F) {
        // Manifest counts can lag the actual rows; never report past 100
        let percent = if self.total_rows == 0 {
            100.0
        } else {
            (self.report.records_processed as f64 / self.total_rows as f64 * 100.0).min(100.0)
        };
        progress(ImportProgress {
            table: table.into(),
            percent,
            processed: self.report.records_processed,
            imported: self.report.records_imported,
        });
    }
}

/// Import a bundle directory into the store
///
/// Tables are processed parents-first so check-ins can resolve their
/// definitions. Per-row failures are collected as issues and never abort
/// the run; a missing bundle or manifest marks the whole import as
/// unsuccessful without touching the store.
pub fn import_bundle<F>(store: &Store, dir: &Path, mut progress: F) -> Result<ImportReport>
where
    F: FnMut(ImportProgress),
{
    let started = Instant::now();
    let mut report = ImportReport {
        records_processed: 0,
        records_imported: 0,
        records_skipped: 0,
        records_failed: 0,
        issues: Vec::new(),
        duration: Duration::ZERO,
        is_success: true,
    };

    // Setup phase: bundle and manifest must be present and well-formed
    let manifest: Option<Manifest> = if !dir.is_dir() {
        report.is_success = false;
        report.issues.push(ImportIssue {
            table: "bundle".into(),
            row: 0,
            field: None,
            message: format!("bundle directory {:?} not found", dir),
            severity: Severity::Fatal,
        });
        None
    } else {
        match std::fs::read_to_string(dir.join(MANIFEST_FILE)) {
            Ok(contents) => match serde_json::from_str::<Manifest>(&contents) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    report.is_success = false;
                    report.issues.push(ImportIssue {
                        table: "manifest".into(),
                        row: 0,
                        field: None,
                        message: format!("malformed manifest: {}", e),
                        severity: Severity::Fatal,
                    });
                    None
                }
            },
            Err(e) => {
                report.is_success = false;
                report.issues.push(ImportIssue {
                    table: "manifest".into(),
                    row: 0,
                    field: None,
                    message: format!("missing manifest: {}", e),
                    severity: Severity::Fatal,
                });
                None
            }
        }
    };

    let Some(manifest) = manifest else {
        report.duration = started.elapsed();
        return Ok(report);
    };

    if manifest.version > BUNDLE_VERSION {
        report.issues.push(ImportIssue {
            table: "manifest".into(),
            row: 0,
            field: Some("version".into()),
            message: format!(
                "bundle version {} is newer than supported {}",
                manifest.version, BUNDLE_VERSION
            ),
            severity: Severity::Warning,
        });
    }

    let library = store.library()?;
    let mut state = ImportState {
        store,
        report,
        total_rows: TABLES
            .iter()
            .map(|t| manifest.tables.get(*t).copied().unwrap_or(0))
            .sum(),
        expected: manifest.tables.clone(),
        known_exercises: library.exercises.clone(),
        known_meals: library.meals.clone(),
        known_pieces: library.pieces.keys().copied().collect(),
        known_check_ins: store.all_check_ins()?.iter().map(|c| c.id()).collect(),
    };

    for table in TABLES {
        import_table(&mut state, dir, table, &mut progress)?;
    }

    // Missing tables shrink the expected total as they are skipped, so
    // this final update always lands on 100%
    state.emit_progress(TABLES[TABLES.len() - 1], &mut progress);

    state.report.duration = started.elapsed();
    tracing::info!(
        "Import finished: {} imported, {} skipped, {} failed in {:?}",
        state.report.records_imported,
        state.report.records_skipped,
        state.report.records_failed,
        state.report.duration
    );
    Ok(state.report)
}

fn import_table<F>(
    state: &mut ImportState<'_>,
    dir: &Path,
    table: &str,
    progress: &mut F,
) -> Result<()>
where
    F: FnMut(ImportProgress),
{
    let expected = state.expected.get(table).copied().unwrap_or(0);

    let path = dir.join(format!("{}.csv", table));
    if !path.exists() {
        state.total_rows = state.total_rows.saturating_sub(expected);
        state.issue(
            table,
            0,
            None,
            "table file missing, skipping table".into(),
            Severity::Warning,
        );
        return Ok(());
    }

    let mut reader = match csv::ReaderBuilder::new().has_headers(true).from_path(&path) {
        Ok(reader) => reader,
        Err(e) => {
            state.total_rows = state.total_rows.saturating_sub(expected);
            state.issue(
                table,
                0,
                None,
                format!("unreadable table: {}", e),
                Severity::Fatal,
            );
            return Ok(());
        }
    };

    let processed_before = state.report.records_processed;

    match table {
        "exercises" => {
            for (idx, result) in reader.deserialize::<ExerciseRow>().enumerate() {
                let row_num = idx + 1;
                state.report.records_processed += 1;
                import_exercise_row(state, table, row_num, result);
                state.emit_progress(table, progress);
            }
        }
        "meals" => {
            for (idx, result) in reader.deserialize::<MealRow>().enumerate() {
                let row_num = idx + 1;
                state.report.records_processed += 1;
                import_meal_row(state, table, row_num, result);
                state.emit_progress(table, progress);
            }
        }
        "goal" => {
            for (idx, result) in reader.deserialize::<GoalRow>().enumerate() {
                let row_num = idx + 1;
                state.report.records_processed += 1;
                import_goal_row(state, table, row_num, result);
                state.emit_progress(table, progress);
            }
        }
        "pieces" => {
            for (idx, result) in reader.deserialize::<PieceRow>().enumerate() {
                let row_num = idx + 1;
                state.report.records_processed += 1;
                import_piece_row(state, table, row_num, result);
                state.emit_progress(table, progress);
            }
        }
        "check_ins" => {
            for (idx, result) in reader.deserialize::<CheckInRow>().enumerate() {
                let row_num = idx + 1;
                state.report.records_processed += 1;
                import_check_in_row(state, table, row_num, result);
                state.emit_progress(table, progress);
            }
        }
        other => {
            state.issue(
                other,
                0,
                None,
                "unknown table, skipping".into(),
                Severity::Warning,
            );
        }
    }

    // Reconcile the expected total against the rows actually read
    let actual = state.report.records_processed - processed_before;
    if actual != expected {
        state.total_rows = (state.total_rows + actual).saturating_sub(expected);
    }

    Ok(())
}

fn import_exercise_row(
    state: &mut ImportState<'_>,
    table: &str,
    row: usize,
    result: csv::Result<ExerciseRow>,
) {
    let parsed = result
        .map_err(Error::from)
        .and_then(Exercise::try_from);
    match parsed {
        Ok(exercise) => {
            if state.known_exercises.contains_key(&exercise.id) {
                state.report.records_skipped += 1;
                tracing::debug!("Skipping existing exercise {}", exercise.id);
                return;
            }
            match state.store.add_exercise(exercise.clone()) {
                Ok(_) => {
                    state.known_exercises.insert(exercise.id, exercise);
                    state.report.records_imported += 1;
                }
                Err(e) => {
                    state.report.records_failed += 1;
                    state.issue(table, row, None, e.to_string(), Severity::Fatal);
                }
            }
        }
        Err(e) => {
            state.report.records_failed += 1;
            state.issue(table, row, None, e.to_string(), Severity::Fatal);
        }
    }
}

fn import_meal_row(
    state: &mut ImportState<'_>,
    table: &str,
    row: usize,
    result: csv::Result<MealRow>,
) {
    let parsed = result.map_err(Error::from).and_then(Meal::try_from);
    match parsed {
        Ok(meal) => {
            if state.known_meals.contains_key(&meal.id) {
                state.report.records_skipped += 1;
                tracing::debug!("Skipping existing meal {}", meal.id);
                return;
            }
            match state.store.add_meal(meal.clone()) {
                Ok(_) => {
                    state.known_meals.insert(meal.id, meal);
                    state.report.records_imported += 1;
                }
                Err(e) => {
                    state.report.records_failed += 1;
                    state.issue(table, row, None, e.to_string(), Severity::Fatal);
                }
            }
        }
        Err(e) => {
            state.report.records_failed += 1;
            state.issue(table, row, None, e.to_string(), Severity::Fatal);
        }
    }
}

fn import_goal_row(
    state: &mut ImportState<'_>,
    table: &str,
    row: usize,
    result: csv::Result<GoalRow>,
) {
    match result {
        Ok(row_data) => {
            let goal = UserGoal {
                calories_goal: row_data.calories_goal,
                carbs_goal_g: row_data.carbs_goal_g,
                protein_goal_g: row_data.protein_goal_g,
                fat_goal_g: row_data.fat_goal_g,
                fiber_goal_g: row_data.fiber_goal_g,
                sodium_goal_mg: row_data.sodium_goal_mg,
            };
            match state.store.set_goal(goal) {
                Ok(()) => state.report.records_imported += 1,
                Err(e) => {
                    state.report.records_failed += 1;
                    state.issue(table, row, None, e.to_string(), Severity::Fatal);
                }
            }
        }
        Err(e) => {
            state.report.records_failed += 1;
            state.issue(table, row, None, e.to_string(), Severity::Fatal);
        }
    }
}

fn import_piece_row(
    state: &mut ImportState<'_>,
    table: &str,
    row: usize,
    result: csv::Result<PieceRow>,
) {
    let parsed = result.map_err(Error::from).and_then(|r| {
        let piece = Piece {
            id: parse_uuid(&r.id)?,
            name: r.name,
            value: r.value,
        };
        piece.validate()?;
        Ok(piece)
    });
    match parsed {
        Ok(piece) => {
            if state.known_pieces.contains(&piece.id) {
                state.report.records_skipped += 1;
                return;
            }
            let id = piece.id;
            match state.store.add_piece(piece) {
                Ok(_) => {
                    state.known_pieces.insert(id);
                    state.report.records_imported += 1;
                }
                Err(e) => {
                    state.report.records_failed += 1;
                    state.issue(table, row, None, e.to_string(), Severity::Fatal);
                }
            }
        }
        Err(e) => {
            state.report.records_failed += 1;
            state.issue(table, row, None, e.to_string(), Severity::Fatal);
        }
    }
}

fn import_check_in_row(
    state: &mut ImportState<'_>,
    table: &str,
    row: usize,
    result: csv::Result<CheckInRow>,
) {
    let row_data = match result {
        Ok(row_data) => row_data,
        Err(e) => {
            state.report.records_failed += 1;
            state.issue(table, row, None, e.to_string(), Severity::Fatal);
            return;
        }
    };

    match build_check_in(state, table, row, &row_data) {
        Ok(Some(check_in)) => {
            if state.known_check_ins.contains(&check_in.id()) {
                state.report.records_skipped += 1;
                return;
            }
            match state.store.append_check_in(&check_in) {
                Ok(()) => {
                    state.known_check_ins.insert(check_in.id());
                    state.report.records_imported += 1;
                }
                Err(e) => {
                    state.report.records_failed += 1;
                    state.issue(table, row, None, e.to_string(), Severity::Fatal);
                }
            }
        }
        Ok(None) => {} // issue already recorded
        Err(e) => {
            state.report.records_failed += 1;
            state.issue(table, row, None, e.to_string(), Severity::Fatal);
        }
    }
}

/// Build a check-in from a row, re-deriving calorie fields against the
/// importing store's definitions. Returns Ok(None) when the row failed
/// and the issue has already been recorded.
fn build_check_in(
    state: &mut ImportState<'_>,
    table: &str,
    row: usize,
    row_data: &CheckInRow,
) -> Result<Option<CheckIn>> {
    let id = parse_uuid(&row_data.id)?;
    let parent_id = parse_uuid(&row_data.parent_id)?;
    let timestamp = parse_timestamp(&row_data.timestamp)?;

    match row_data.kind.as_str() {
        "exercise" => {
            let Some(exercise) = state.known_exercises.get(&parent_id) else {
                state.report.records_failed += 1;
                state.issue(
                    table,
                    row,
                    Some("parent_id"),
                    format!("unknown exercise {}", parent_id),
                    Severity::Fatal,
                );
                return Ok(None);
            };
            let sets = row_data.sets.ok_or_else(|| {
                Error::Validation("missing required field 'sets'".into())
            })?;
            let reps = row_data.reps.ok_or_else(|| {
                Error::Validation("missing required field 'reps'".into())
            })?;
            let log = ExerciseLog {
                id,
                exercise_id: parent_id,
                weight: row_data.weight.unwrap_or(0.0),
                reps,
                sets,
                calories_burned: calories_burned(
                    exercise.category,
                    exercise.kcal_burned_per_unit,
                    sets,
                    reps,
                ),
                performed_at: timestamp,
                notes: row_data.notes.clone(),
            };
            log.validate()?;
            Ok(Some(CheckIn::Exercise(log)))
        }
        "meal" => {
            let Some(meal) = state.known_meals.get(&parent_id).cloned() else {
                state.report.records_failed += 1;
                state.issue(
                    table,
                    row,
                    Some("parent_id"),
                    format!("unknown meal {}", parent_id),
                    Severity::Fatal,
                );
                return Ok(None);
            };
            let raw_multiplier = row_data.multiplier.ok_or_else(|| {
                Error::Validation("missing required field 'multiplier'".into())
            })?;
            let multiplier = clamp_multiplier(raw_multiplier);
            if multiplier != raw_multiplier {
                state.issue(
                    table,
                    row,
                    Some("multiplier"),
                    format!(
                        "multiplier {} below minimum, clamped to {}",
                        raw_multiplier, MIN_SERVING_MULTIPLIER
                    ),
                    Severity::Warning,
                );
            }
            let check_in = MealCheckIn {
                id,
                meal_id: parent_id,
                multiplier,
                total_calories: total_calories(meal.nutrition.calories, multiplier),
                eaten_at: timestamp,
                notes: row_data.notes.clone(),
            };
            check_in.validate()?;
            Ok(Some(CheckIn::Meal(check_in)))
        }
        other => Err(Error::Validation(format!(
            "unknown check-in kind '{}'",
            other
        ))),
    }
}
