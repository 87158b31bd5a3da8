//! Persisted goal and score stores
//!
//! Goals and the running score live in small JSON files read at run start.
//! Missing or malformed content degrades to empty state with a warning; a
//! failed write is the one run-level failure, and writes go through a temp
//! file plus rename so a crashed run never leaves a half-written store.
//!
//! State mutation goes through structured edit commands rather than any
//! interactive input channel.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::types::{GoalSet, RunWarning, ScoreState, WarningKind};

/// Errors writing a store to disk
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write store at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Structured edit operation on the goal store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalEdit {
    /// Add or update a goal
    Set { target: String, limit: String },
    /// Remove a goal if present
    Remove { target: String },
    /// Drop every goal
    Clear,
}

/// Structured edit operation on the score store
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreEdit {
    /// Set the running score to an exact value
    Reset { points: f64 },
    /// Shift the running score by a delta
    Adjust { delta: f64 },
}

/// File-backed mapping from goal target to limit expression
pub struct GoalStore {
    path: PathBuf,
}

impl GoalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load goals, degrading to an empty set.
    ///
    /// A missing file is normal first-run state and produces no warning;
    /// unreadable or malformed content produces one.
    pub fn load(&self) -> (GoalSet, Option<RunWarning>) {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<GoalSet>(&content) {
                Ok(goals) => (goals, None),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "goal store malformed, starting empty");
                    (
                        GoalSet::new(),
                        Some(RunWarning::new(
                            WarningKind::MalformedGoalStore,
                            format!("{}: {}", self.path.display(), e),
                        )),
                    )
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (GoalSet::new(), None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "goal store unreadable, starting empty");
                (
                    GoalSet::new(),
                    Some(RunWarning::new(
                        WarningKind::MalformedGoalStore,
                        format!("{}: {}", self.path.display(), e),
                    )),
                )
            }
        }
    }

    /// Persist goals, all-or-nothing
    pub fn save(&self, goals: &GoalSet) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(goals)?;
        write_atomic(&self.path, &json)
    }

    /// Apply one edit: load, mutate, save; returns the resulting set
    pub fn apply(&self, edit: GoalEdit) -> Result<GoalSet, StoreError> {
        let (mut goals, _) = self.load();
        match edit {
            GoalEdit::Set { target, limit } => {
                goals.insert(target, limit);
            }
            GoalEdit::Remove { target } => {
                goals.remove(&target);
            }
            GoalEdit::Clear => goals.clear(),
        }
        self.save(&goals)?;
        Ok(goals)
    }
}

/// File-backed running score
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the score state, degrading to the default (zero points)
    pub fn load(&self) -> (ScoreState, Option<RunWarning>) {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<ScoreState>(&content) {
                Ok(state) => (state, None),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "score store malformed, starting empty");
                    (
                        ScoreState::default(),
                        Some(RunWarning::new(
                            WarningKind::MalformedScoreStore,
                            format!("{}: {}", self.path.display(), e),
                        )),
                    )
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (ScoreState::default(), None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "score store unreadable, starting empty");
                (
                    ScoreState::default(),
                    Some(RunWarning::new(
                        WarningKind::MalformedScoreStore,
                        format!("{}: {}", self.path.display(), e),
                    )),
                )
            }
        }
    }

    /// Persist the score state, all-or-nothing
    pub fn save(&self, state: &ScoreState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, &json)
    }

    /// Apply one edit: load, mutate, save; returns the resulting state
    pub fn apply(&self, edit: ScoreEdit) -> Result<ScoreState, StoreError> {
        let (mut state, _) = self.load();
        match edit {
            ScoreEdit::Reset { points } => state.points = points,
            ScoreEdit::Adjust { delta } => state.points += delta,
        }
        self.save(&state)?;
        Ok(state)
    }
}

/// Write content to a sibling temp file, then rename over the target
fn write_atomic(path: &Path, content: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let fail = |source| StoreError::Write {
        path: path.display().to_string(),
        source,
    };
    fs::write(&tmp, content).map_err(fail)?;
    fs::rename(&tmp, path).map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_goal_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = GoalStore::new(dir.path().join("goals.json"));

        let mut goals = GoalSet::new();
        goals.insert("Youtube".to_string(), "1 hour".to_string());
        goals.insert("Safari".to_string(), "30 minutes".to_string());
        store.save(&goals).unwrap();

        let (loaded, warning) = store.load();
        assert_eq!(loaded, goals);
        assert!(warning.is_none());
    }

    #[test]
    fn test_missing_goal_store_is_empty_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let store = GoalStore::new(dir.path().join("goals.json"));

        let (goals, warning) = store.load();
        assert!(goals.is_empty());
        assert!(warning.is_none());
    }

    #[test]
    fn test_malformed_goal_store_degrades_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goals.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let (goals, warning) = GoalStore::new(&path).load();
        assert!(goals.is_empty());
        assert_eq!(warning.unwrap().kind, WarningKind::MalformedGoalStore);
    }

    #[test]
    fn test_goal_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = GoalStore::new(dir.path().join("goals.json"));

        store
            .apply(GoalEdit::Set {
                target: "Youtube".to_string(),
                limit: "1 hour".to_string(),
            })
            .unwrap();
        store
            .apply(GoalEdit::Set {
                target: "Youtube".to_string(),
                limit: "2 hours".to_string(),
            })
            .unwrap();
        let goals = store
            .apply(GoalEdit::Set {
                target: "Safari".to_string(),
                limit: "45".to_string(),
            })
            .unwrap();

        assert_eq!(goals.len(), 2);
        assert_eq!(goals["Youtube"], "2 hours");

        let goals = store
            .apply(GoalEdit::Remove {
                target: "Youtube".to_string(),
            })
            .unwrap();
        assert_eq!(goals.len(), 1);

        let goals = store.apply(GoalEdit::Clear).unwrap();
        assert!(goals.is_empty());
    }

    #[test]
    fn test_score_store_round_trip_preserves_negative_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScoreStore::new(dir.path().join("points.json"));

        store.save(&ScoreState::new(-12.5)).unwrap();
        let (state, warning) = store.load();

        assert_eq!(state.points, -12.5);
        assert!(warning.is_none());
    }

    #[test]
    fn test_score_store_wire_format_uses_points_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        ScoreStore::new(&path).save(&ScoreState::new(85.0)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["Points"], 85.0);
    }

    #[test]
    fn test_score_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScoreStore::new(dir.path().join("points.json"));

        let state = store.apply(ScoreEdit::Reset { points: 100.0 }).unwrap();
        assert_eq!(state.points, 100.0);

        let state = store.apply(ScoreEdit::Adjust { delta: -15.0 }).unwrap();
        assert_eq!(state.points, 85.0);
    }

    #[test]
    fn test_malformed_score_store_degrades_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        std::fs::write(&path, "[]").unwrap();

        let (state, warning) = ScoreStore::new(&path).load();
        assert_eq!(state, ScoreState::default());
        assert_eq!(warning.unwrap().kind, WarningKind::MalformedScoreStore);
    }
}
