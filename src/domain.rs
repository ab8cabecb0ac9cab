use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::ledger::SessionLedger;

const ID_LEN: usize = 8;

const LONG_DATE_FORMAT: &str = "%d %B %Y";
const COMPACT_DATE_FORMAT: &str = "%d%b%y";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Importance {
    Important,
    #[default]
    NotImportant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Emergent,
    #[default]
    NotEmergent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target_sessions: i64,
    #[serde(default)]
    pub completed_sessions: i64,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub urgency: Urgency,
}

impl Subtask {
    pub fn fill_fraction(&self) -> f64 {
        if self.target_sessions <= 0 {
            return 0.0;
        }
        self.completed_sessions.max(0) as f64 / self.target_sessions as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_daily: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Project {
    pub fn start_day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    pub fn total_target_sessions(&self) -> i64 {
        self.subtasks
            .iter()
            .map(|subtask| subtask.target_sessions.max(0))
            .sum()
    }

    pub fn total_completed_sessions(&self) -> i64 {
        self.subtasks
            .iter()
            .map(|subtask| subtask.completed_sessions.max(0))
            .sum()
    }

    pub fn fill_fraction(&self) -> f64 {
        let target = self.total_target_sessions();
        if target <= 0 {
            return 0.0;
        }
        self.total_completed_sessions() as f64 / target as f64
    }

    pub fn subtask(&self, id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|subtask| subtask.id == id)
    }

    pub fn subtask_mut(&mut self, id: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|subtask| subtask.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogEntry {
    pub date: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Durations {
    pub pomodoro: i64,
    pub short_break: i64,
    pub long_break: i64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            pomodoro: 25,
            short_break: 5,
            long_break: 15,
        }
    }
}

impl Durations {
    pub fn sanitized(&self) -> Self {
        Self {
            pomodoro: self.pomodoro.max(1),
            short_break: self.short_break.max(1),
            long_break: self.long_break.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeColors {
    pub pomodoro: String,
    pub short_break: String,
    pub long_break: String,
}

impl Default for ModeColors {
    fn default() -> Self {
        Self {
            pomodoro: "light_red".to_string(),
            short_break: "light_green".to_string(),
            long_break: "light_blue".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub durations: Durations,
    pub daily_pomodoro_target: i64,
    pub auto_start_breaks: bool,
    pub auto_start_pomodoros: bool,
    pub colors: ModeColors,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            durations: Durations::default(),
            daily_pomodoro_target: 6,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            colors: ModeColors::default(),
        }
    }
}

impl Settings {
    pub fn sanitized(&self) -> Self {
        Self {
            durations: self.durations.sanitized(),
            daily_pomodoro_target: self.daily_pomodoro_target.max(1),
            auto_start_breaks: self.auto_start_breaks,
            auto_start_pomodoros: self.auto_start_pomodoros,
            colors: self.colors.clone(),
        }
    }

    pub fn daily_target(&self) -> i64 {
        self.daily_pomodoro_target.max(1)
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    pub projects: Vec<Project>,
    pub history: SessionLedger,
    pub day_notes: BTreeMap<String, String>,
    pub day_agendas: BTreeMap<String, BTreeMap<String, String>>,
    pub settings: Settings,
}

impl Board {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            history: SessionLedger::new(),
            day_notes: BTreeMap::new(),
            day_agendas: BTreeMap::new(),
            settings: Settings::default(),
        }
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|project| project.id == id)
    }

    pub fn add_project(
        &mut self,
        name: String,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> String {
        let id = generate_id();
        self.projects.push(Project {
            id: id.clone(),
            name,
            description,
            created_at,
            is_daily: false,
            recurrence_end_date: None,
            subtasks: Vec::new(),
        });
        id
    }

    pub fn add_daily_project(
        &mut self,
        name: String,
        description: Option<String>,
        created_at: DateTime<Utc>,
        ends_on: NaiveDate,
    ) -> Result<String, String> {
        if ends_on < created_at.date_naive() {
            return Err(format!(
                "recurrence end {} is before the project start {}",
                ends_on,
                created_at.date_naive()
            ));
        }

        let id = generate_id();
        self.projects.push(Project {
            id: id.clone(),
            name,
            description,
            created_at,
            is_daily: true,
            recurrence_end_date: Some(ends_on),
            subtasks: Vec::new(),
        });
        Ok(id)
    }

    pub fn add_subtask(
        &mut self,
        project_id: &str,
        name: String,
        description: Option<String>,
        target_sessions: i64,
        importance: Importance,
        urgency: Urgency,
    ) -> Result<String, String> {
        let project = self
            .project_mut(project_id)
            .ok_or_else(|| format!("project not found: {project_id}"))?;

        let id = generate_id();
        project.subtasks.push(Subtask {
            id: id.clone(),
            name,
            description,
            target_sessions: target_sessions.max(1),
            completed_sessions: 0,
            importance,
            urgency,
        });
        Ok(id)
    }

    // Reductions below the completed count are floored, not rejected.
    pub fn set_subtask_target(
        &mut self,
        project_id: &str,
        subtask_id: &str,
        target_sessions: i64,
    ) -> Result<i64, String> {
        let project = self
            .project_mut(project_id)
            .ok_or_else(|| format!("project not found: {project_id}"))?;
        let is_daily = project.is_daily;
        let subtask = project
            .subtask_mut(subtask_id)
            .ok_or_else(|| format!("subtask not found: {subtask_id}"))?;

        let mut applied = target_sessions.max(1);
        if !is_daily {
            applied = applied.max(subtask.completed_sessions.max(0));
        }
        subtask.target_sessions = applied;
        Ok(applied)
    }

    pub fn record_completion(
        &mut self,
        project_id: Option<&str>,
        subtask_id: Option<&str>,
        day: NaiveDate,
    ) {
        if let (Some(project_id), Some(subtask_id)) = (project_id, subtask_id) {
            if let Some(subtask) = self
                .project_mut(project_id)
                .and_then(|project| project.subtask_mut(subtask_id))
            {
                subtask.completed_sessions += 1;
            }
        }

        let duration = format_clock(self.settings.durations.sanitized().pomodoro * 60);
        self.history.append(SessionLogEntry {
            date: date_label(day),
            duration,
            project_id: project_id.map(str::to_string),
            subtask_id: subtask_id.map(str::to_string),
        });
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn format_clock(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub fn parse_clock(text: &str) -> Option<i64> {
    let parts = text
        .trim()
        .split(':')
        .map(|part| part.parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [minutes, seconds] if *minutes >= 0 && (0..60).contains(seconds) => {
            Some(minutes * 60 + seconds)
        }
        [hours, minutes, seconds]
            if *hours >= 0 && (0..60).contains(minutes) && (0..60).contains(seconds) =>
        {
            Some(hours * 3600 + minutes * 60 + seconds)
        }
        _ => None,
    }
}

pub fn date_label(day: NaiveDate) -> String {
    day.format(LONG_DATE_FORMAT).to_string()
}

pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    let trimmed = label.trim();
    NaiveDate::parse_from_str(trimmed, LONG_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, COMPACT_DATE_FORMAT))
        .ok()
}

pub fn epoch_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date must be valid")
}

pub fn date_label_day(label: &str) -> NaiveDate {
    parse_date_label(label).unwrap_or_else(epoch_day)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{
        Board, Importance, Settings, Urgency, date_label, date_label_day, epoch_day, format_clock,
        parse_clock, parse_date_label,
    };

    #[test]
    fn round_trips_clock_strings() {
        for seconds in [0, 9, 59, 60, 61, 599, 600, 1500, 3599, 3600, 3661, 5400, 86399] {
            let formatted = format_clock(seconds);
            assert_eq!(
                parse_clock(&formatted),
                Some(seconds),
                "round trip failed for {formatted}"
            );
        }
    }

    #[test]
    fn formats_short_and_long_clocks() {
        assert_eq!(format_clock(25 * 60), "25:00");
        assert_eq!(format_clock(65 * 60), "1:05:00");
        assert_eq!(format_clock(-30), "00:00");
    }

    #[test]
    fn rejects_malformed_clocks() {
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("25"), None);
        assert_eq!(parse_clock("25:60"), None);
        assert_eq!(parse_clock("1:05:00:00"), None);
        assert_eq!(parse_clock("abc:00"), None);
    }

    #[test]
    fn parses_long_and_compact_labels() {
        let day = NaiveDate::from_ymd_opt(2025, 12, 4).expect("date must be valid");
        assert_eq!(date_label(day), "04 December 2025");
        assert_eq!(parse_date_label("04 December 2025"), Some(day));
        assert_eq!(parse_date_label("04Dec25"), Some(day));
    }

    #[test]
    fn falls_back_to_epoch_for_bad_labels() {
        assert_eq!(parse_date_label("not a date"), None);
        assert_eq!(date_label_day("not a date"), epoch_day());
        assert_eq!(
            date_label_day("04Dec25"),
            NaiveDate::from_ymd_opt(2025, 12, 4).expect("date must be valid")
        );
    }

    #[test]
    fn floors_target_below_completed() {
        let mut board = Board::new();
        let created = Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let project_id = board.add_project("Thesis".to_string(), None, created);
        let subtask_id = board
            .add_subtask(
                &project_id,
                "Write chapter".to_string(),
                None,
                10,
                Importance::Important,
                Urgency::NotEmergent,
            )
            .expect("subtask should be created");

        let subtask = board
            .project_mut(&project_id)
            .and_then(|project| project.subtask_mut(&subtask_id))
            .expect("subtask should exist");
        subtask.completed_sessions = 4;

        let applied = board
            .set_subtask_target(&project_id, &subtask_id, 2)
            .expect("target update should work");
        assert_eq!(applied, 4);

        let applied = board
            .set_subtask_target(&project_id, &subtask_id, 12)
            .expect("target update should work");
        assert_eq!(applied, 12);
    }

    #[test]
    fn clamps_settings_minimums() {
        let mut settings = Settings {
            daily_pomodoro_target: 0,
            ..Settings::default()
        };
        settings.durations.pomodoro = -5;
        settings.durations.short_break = 0;

        let sanitized = settings.sanitized();
        assert_eq!(sanitized.durations.pomodoro, 1);
        assert_eq!(sanitized.durations.short_break, 1);
        assert_eq!(sanitized.durations.long_break, 15);
        assert_eq!(sanitized.daily_pomodoro_target, 1);
    }

    #[test]
    fn records_full_session_credit() {
        let mut board = Board::new();
        let created = Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let project_id = board.add_project("Thesis".to_string(), None, created);
        let subtask_id = board
            .add_subtask(
                &project_id,
                "Write chapter".to_string(),
                None,
                10,
                Importance::NotImportant,
                Urgency::NotEmergent,
            )
            .expect("subtask should be created");

        let day = NaiveDate::from_ymd_opt(2025, 12, 4).expect("date must be valid");
        board.record_completion(Some(&project_id), Some(&subtask_id), day);

        let subtask = board
            .project(&project_id)
            .and_then(|project| project.subtask(&subtask_id))
            .expect("subtask should exist");
        assert_eq!(subtask.completed_sessions, 1);
        assert_eq!(board.history.entries.len(), 1);

        let entry = &board.history.entries[0];
        assert_eq!(entry.date, "04 December 2025");
        assert_eq!(entry.duration, "25:00");
        assert_eq!(entry.project_id.as_deref(), Some(project_id.as_str()));
        assert_eq!(entry.subtask_id.as_deref(), Some(subtask_id.as_str()));
    }

    #[test]
    fn rejects_daily_project_ending_before_start() {
        let mut board = Board::new();
        let created = Utc.with_ymd_and_hms(2025, 12, 10, 9, 0, 0).unwrap();
        let ends_on = NaiveDate::from_ymd_opt(2025, 12, 9).expect("date must be valid");
        let result = board.add_daily_project("Reading".to_string(), None, created, ends_on);
        assert!(result.is_err());
    }
}
