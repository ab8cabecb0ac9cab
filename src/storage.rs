use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Board, Project, SessionLogEntry, Settings};
use crate::ledger::SessionLedger;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Decode(serde_json::Error),
    Encode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Decode(err) => write!(f, "failed to import board: {err}"),
            StorageError::Encode(err) => write!(f, "failed to encode board: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub app_history: Vec<SessionLogEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub day_notes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub day_agendas: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl Snapshot {
    pub fn from_board(board: &Board) -> Self {
        Self {
            projects: board.projects.clone(),
            app_history: board.history.entries.clone(),
            day_notes: board.day_notes.clone(),
            day_agendas: board.day_agendas.clone(),
            settings: Some(board.settings.clone()),
        }
    }
}

pub fn parse_snapshot(raw: &str) -> Result<Snapshot, StorageError> {
    serde_json::from_str(raw).map_err(StorageError::Decode)
}

// Whole-snapshot replace. A snapshot without settings keeps the board's
// current settings; everything else swaps even when empty.
pub fn import_snapshot(board: &mut Board, snapshot: Snapshot) {
    board.projects = snapshot.projects;
    board.history = SessionLedger::from_entries(snapshot.app_history);
    board.day_notes = snapshot.day_notes;
    board.day_agendas = snapshot.day_agendas;
    if let Some(settings) = snapshot.settings {
        board.settings = settings.sanitized();
    }
}

pub fn load_board(path: &Path) -> Result<Board, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Board::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Board::new());
    }

    let snapshot = parse_snapshot(&raw)?;
    let mut board = Board::new();
    import_snapshot(&mut board, snapshot);
    Ok(board)
}

pub fn save_board(path: &Path, board: &Board) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let snapshot = Snapshot::from_board(board);
    let raw = serde_json::to_string_pretty(&snapshot).map_err(StorageError::Encode)?;
    fs::write(path, raw).map_err(StorageError::Io)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::domain::{Board, Importance, SessionLogEntry, Urgency};

    use super::{import_snapshot, load_board, parse_snapshot, save_board};

    fn sample_board() -> Board {
        let mut board = Board::new();
        let created = Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let project_id = board.add_project("Thesis".to_string(), None, created);
        board
            .add_subtask(
                &project_id,
                "Write chapter".to_string(),
                Some("first draft".to_string()),
                10,
                Importance::Important,
                Urgency::Emergent,
            )
            .expect("subtask should be created");
        board
            .add_daily_project(
                "Reading".to_string(),
                None,
                created,
                NaiveDate::from_ymd_opt(2025, 12, 31).expect("date must be valid"),
            )
            .expect("daily project should be created");
        board.history.append(SessionLogEntry {
            date: "04 December 2025".to_string(),
            duration: "25:00".to_string(),
            project_id: Some(project_id),
            subtask_id: None,
        });
        board
            .day_notes
            .insert("04 December 2025".to_string(), "good day".to_string());
        board.settings.daily_pomodoro_target = 8;
        board
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }

    #[test]
    fn round_trips_a_board_snapshot() {
        let board = sample_board();
        let path = temp_file("focusboard_storage_roundtrip.json");

        save_board(&path, &board).expect("save should succeed");
        let loaded = load_board(&path).expect("load should succeed");
        let _ = fs::remove_file(path);

        assert_eq!(loaded.projects.len(), 2);
        assert_eq!(loaded.projects[0].name, "Thesis");
        assert_eq!(loaded.projects[0].subtasks.len(), 1);
        assert_eq!(loaded.projects[0].subtasks[0].target_sessions, 10);
        assert_eq!(loaded.projects[0].subtasks[0].importance, Importance::Important);
        assert!(loaded.projects[1].is_daily);
        assert_eq!(
            loaded.projects[1].recurrence_end_date,
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
        assert_eq!(loaded.history.entries, board.history.entries);
        assert_eq!(loaded.day_notes, board.day_notes);
        assert_eq!(loaded.settings, board.settings);
    }

    #[test]
    fn missing_file_loads_a_fresh_board() {
        let path = temp_file("focusboard_storage_missing.json");
        let board = load_board(&path).expect("load should succeed");
        assert!(board.projects.is_empty());
        assert!(board.history.entries.is_empty());
    }

    #[test]
    fn missing_settings_keep_prior_settings() {
        let mut board = sample_board();
        let snapshot = parse_snapshot(r#"{"projects": [], "appHistory": []}"#)
            .expect("snapshot should parse");

        import_snapshot(&mut board, snapshot);

        assert!(board.projects.is_empty());
        assert!(board.history.entries.is_empty());
        assert!(board.day_notes.is_empty());
        assert_eq!(board.settings.daily_pomodoro_target, 8);
    }

    #[test]
    fn provided_settings_replace_and_clamp() {
        let mut board = sample_board();
        let snapshot = parse_snapshot(
            r#"{"settings": {"durations": {"pomodoro": 0, "shortBreak": 3, "longBreak": 20}}}"#,
        )
        .expect("snapshot should parse");

        import_snapshot(&mut board, snapshot);

        assert_eq!(board.settings.durations.pomodoro, 1);
        assert_eq!(board.settings.durations.short_break, 3);
        assert_eq!(board.settings.durations.long_break, 20);
        assert_eq!(board.settings.daily_pomodoro_target, 6);
    }

    #[test]
    fn rejects_unparseable_top_level_shapes() {
        assert!(parse_snapshot("[1, 2, 3]").is_err());
        assert!(parse_snapshot("{ not json").is_err());
    }

    #[test]
    fn tolerates_unknown_fields_and_legacy_labels() {
        let snapshot = parse_snapshot(
            r#"{
                "projects": [],
                "appHistory": [{"date": "04Dec25", "duration": "1:05:00", "extra": true}],
                "futureField": {"nested": 1}
            }"#,
        )
        .expect("snapshot should parse");

        assert_eq!(snapshot.app_history.len(), 1);
        assert_eq!(snapshot.app_history[0].date, "04Dec25");
    }
}
