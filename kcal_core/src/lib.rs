#![forbid(unsafe_code)]

//! Core domain model and business logic for the kcal tracking system.
//!
//! This crate provides:
//! - Domain types (exercises, meals, check-ins, goals)
//! - Derived-metric calculation (calories burned, serving scaling)
//! - Goal/progress aggregation over date ranges
//! - Persistence (check-in journal, library store)
//! - Import/export bundle reconciliation
//! - Typed external catalog lookups

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod journal;
pub mod store;
pub mod metrics;
pub mod progress;
pub mod bundle;
pub mod lookup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::builtin_exercises;
pub use config::Config;
pub use journal::{CheckInSink, JsonlSink};
pub use store::Store;
pub use metrics::{calories_burned, total_calories, thermic_effect, ServingScaler};
pub use progress::{bucket, summarize, Period, ProgressOptions, ProgressSummary};
pub use bundle::{export_bundle, import_bundle, ImportProgress, ImportReport, Severity};
pub use lookup::{ExerciseCatalog, FoodCatalog};
