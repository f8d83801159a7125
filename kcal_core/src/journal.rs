//! Append-only check-in journal.
//!
//! Check-ins are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access. Malformed lines are skipped with a
//! warning so one bad record never hides the rest of the history.

use crate::{CheckIn, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Check-in sink trait for persisting check-ins
pub trait CheckInSink {
    fn append(&mut self, check_in: &CheckIn) -> Result<()>;
}

/// JSONL-based check-in sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CheckInSink for JsonlSink {
    fn append(&mut self, check_in: &CheckIn) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Exclusive lock serializes concurrent appends
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(check_in)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended check-in {} to journal", check_in.id());
        Ok(())
    }
}

/// Read all check-ins from a journal file
pub fn read_check_ins(path: &Path) -> Result<Vec<CheckIn>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut check_ins = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CheckIn>(&line) {
            Ok(check_in) => check_ins.push(check_in),
            Err(e) => {
                tracing::warn!("Failed to parse check-in at line {}: {}", line_num + 1, e);
                // Continue reading, don't fail completely
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} check-ins from journal", check_ins.len());
    Ok(check_ins)
}

/// Rewrite the journal with the given check-ins, atomically
///
/// Used for edits (re-derived calorie fields) and cascade deletes. The
/// new contents are written to a temp file in the same directory and
/// renamed over the journal.
pub fn rewrite_journal(path: &Path, check_ins: &[CheckIn]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "journal path missing parent")
    })?;
    let temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for check_in in check_ins {
            let line = serde_json::to_string(check_in)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| crate::Error::Io(e.error))?;

    tracing::debug!("Rewrote journal with {} check-ins", check_ins.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExerciseLog, MealCheckIn};
    use chrono::Utc;
    use uuid::Uuid;

    fn meal_check_in() -> CheckIn {
        CheckIn::Meal(MealCheckIn {
            id: Uuid::new_v4(),
            meal_id: Uuid::new_v4(),
            multiplier: 1.0,
            total_calories: 250,
            eaten_at: Utc::now(),
            notes: None,
        })
    }

    fn exercise_check_in() -> CheckIn {
        CheckIn::Exercise(ExerciseLog {
            id: Uuid::new_v4(),
            exercise_id: Uuid::new_v4(),
            weight: 50.0,
            reps: 10,
            sets: 3,
            calories_burned: 15.0,
            performed_at: Utc::now(),
            notes: Some("felt good".into()),
        })
    }

    #[test]
    fn test_append_and_read_mixed_check_ins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("check_ins.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&meal_check_in()).unwrap();
        sink.append(&exercise_check_in()).unwrap();

        let check_ins = read_check_ins(&path).unwrap();
        assert_eq!(check_ins.len(), 2);
        assert!(check_ins[0].as_meal().is_some());
        assert!(check_ins[1].as_exercise().is_some());
    }

    #[test]
    fn test_read_missing_journal_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nonexistent.jsonl");

        let check_ins = read_check_ins(&path).unwrap();
        assert!(check_ins.is_empty());
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("check_ins.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&meal_check_in()).unwrap();

        // Corrupt the journal with a garbage line, then append another
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ not json").unwrap();
        }
        sink.append(&exercise_check_in()).unwrap();

        let check_ins = read_check_ins(&path).unwrap();
        assert_eq!(check_ins.len(), 2);
    }

    #[test]
    fn test_rewrite_replaces_contents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("check_ins.jsonl");

        let mut sink = JsonlSink::new(&path);
        for _ in 0..3 {
            sink.append(&meal_check_in()).unwrap();
        }

        let kept = vec![exercise_check_in()];
        rewrite_journal(&path, &kept).unwrap();

        let check_ins = read_check_ins(&path).unwrap();
        assert_eq!(check_ins.len(), 1);
        assert!(check_ins[0].as_exercise().is_some());
    }
}
