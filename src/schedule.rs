use chrono::{Duration, NaiveDate};

use crate::domain::{Project, date_label};
use crate::ledger::SessionLedger;

pub const AXIS_DAY_CAP: usize = 365;
const AXIS_LOOKAHEAD_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Pending,
    Success,
    Failed,
}

impl DayStatus {
    pub fn label(self) -> &'static str {
        match self {
            DayStatus::Pending => "pending",
            DayStatus::Success => "done",
            DayStatus::Failed => "missed",
        }
    }
}

pub fn project_span_days(project: &Project, daily_target: i64) -> i64 {
    let per_day = daily_target.max(1);
    let total = project.total_target_sessions().max(1);
    (total as u64).div_ceil(per_day as u64) as i64
}

// Per-day classification for a daily-recurring project. Today with too few
// completions stays pending until the day ends.
pub fn daily_statuses(
    project: &Project,
    ledger: &SessionLedger,
    today: NaiveDate,
) -> Vec<(NaiveDate, DayStatus)> {
    if !project.is_daily {
        return Vec::new();
    }
    let Some(ends_on) = project.recurrence_end_date else {
        return Vec::new();
    };

    let target = project.total_target_sessions();
    let mut statuses = Vec::new();
    let mut day = project.start_day();
    while day <= ends_on {
        let status = if day > today {
            DayStatus::Pending
        } else {
            let done = ledger.count_completions(&project.id, &date_label(day));
            if done >= target {
                DayStatus::Success
            } else if day < today {
                DayStatus::Failed
            } else {
                DayStatus::Pending
            }
        };
        statuses.push((day, status));

        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
    }

    statuses
}

#[derive(Debug, Clone)]
pub struct SubtaskBar {
    pub subtask_id: String,
    pub name: String,
    pub offset_days: f64,
    pub span_days: f64,
    pub fill: f64,
}

#[derive(Debug, Clone)]
pub struct ProjectBar {
    pub project_id: String,
    pub name: String,
    pub start: NaiveDate,
    pub span_days: i64,
    pub fill: f64,
    pub subtasks: Vec<SubtaskBar>,
}

impl ProjectBar {
    pub fn last_day(&self) -> NaiveDate {
        self.start + Duration::days(self.span_days.max(1) - 1)
    }
}

// Offsets stay fractional here; rounding belongs to the pixel mapping.
pub fn project_bar(project: &Project, daily_target: i64) -> ProjectBar {
    let per_day = daily_target.max(1) as f64;
    let mut offset = 0.0;
    let subtasks = project
        .subtasks
        .iter()
        .map(|subtask| {
            let span = subtask.target_sessions.max(0) as f64 / per_day;
            let bar = SubtaskBar {
                subtask_id: subtask.id.clone(),
                name: subtask.name.clone(),
                offset_days: offset,
                span_days: span,
                fill: subtask.fill_fraction(),
            };
            offset += span;
            bar
        })
        .collect();

    ProjectBar {
        project_id: project.id.clone(),
        name: project.name.clone(),
        start: project.start_day(),
        span_days: project_span_days(project, daily_target),
        fill: project.fill_fraction(),
        subtasks,
    }
}

#[derive(Debug, Clone)]
pub struct TimelineAxis {
    pub days: Vec<NaiveDate>,
    pub today_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct TimelineLayout {
    pub axis: TimelineAxis,
    pub bars: Vec<ProjectBar>,
}

// Daily-recurring projects are excluded: they render as calendar day markers,
// not as continuous bars.
pub fn timeline_layout(
    projects: &[Project],
    daily_target: i64,
    today: NaiveDate,
) -> TimelineLayout {
    let bars = projects
        .iter()
        .filter(|project| !project.is_daily)
        .map(|project| project_bar(project, daily_target))
        .collect::<Vec<_>>();

    let earliest = bars.iter().map(|bar| bar.start).min().unwrap_or(today);
    let latest = bars
        .iter()
        .map(|bar| bar.last_day())
        .max()
        .unwrap_or(today)
        .max(today + Duration::days(AXIS_LOOKAHEAD_DAYS));

    let mut days = Vec::new();
    let mut day = earliest;
    while day <= latest && days.len() < AXIS_DAY_CAP {
        days.push(day);
        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
    }

    let today_index = days.iter().position(|entry| *entry == today);

    TimelineLayout {
        axis: TimelineAxis { days, today_index },
        bars,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::domain::{Importance, Project, SessionLogEntry, Subtask, Urgency, date_label};
    use crate::ledger::SessionLedger;

    use super::{DayStatus, daily_statuses, project_bar, project_span_days, timeline_layout};

    fn subtask(id: &str, target: i64, completed: i64) -> Subtask {
        Subtask {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            target_sessions: target,
            completed_sessions: completed,
            importance: Importance::NotImportant,
            urgency: Urgency::NotEmergent,
        }
    }

    fn project(id: &str, start: (i32, u32, u32), subtasks: Vec<Subtask>) -> Project {
        Project {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            created_at: Utc
                .with_ymd_and_hms(start.0, start.1, start.2, 9, 0, 0)
                .unwrap(),
            is_daily: false,
            recurrence_end_date: None,
            subtasks,
        }
    }

    fn daily_project(
        id: &str,
        start: (i32, u32, u32),
        ends_on: (i32, u32, u32),
        subtasks: Vec<Subtask>,
    ) -> Project {
        let mut project = project(id, start, subtasks);
        project.is_daily = true;
        project.recurrence_end_date =
            Some(NaiveDate::from_ymd_opt(ends_on.0, ends_on.1, ends_on.2).expect("date must be valid"));
        project
    }

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("date must be valid")
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn lays_out_fractional_subtask_spans() {
        let project = project(
            "alpha",
            (2025, 12, 1),
            vec![subtask("a", 4, 2), subtask("b", 8, 0)],
        );

        assert_eq!(project_span_days(&project, 6), 2);

        let bar = project_bar(&project, 6);
        assert_eq!(bar.span_days, 2);
        assert_eq!(bar.start, day(2025, 12, 1));
        assert!(close(bar.fill, 2.0 / 12.0));

        assert!(close(bar.subtasks[0].offset_days, 0.0));
        assert!(close(bar.subtasks[0].span_days, 4.0 / 6.0));
        assert!(close(bar.subtasks[0].fill, 0.5));
        assert!(close(bar.subtasks[1].offset_days, 4.0 / 6.0));
        assert!(close(bar.subtasks[1].span_days, 8.0 / 6.0));
    }

    #[test]
    fn subtask_spans_stay_within_rounding_tolerance() {
        let project = project(
            "alpha",
            (2025, 12, 1),
            vec![subtask("a", 1, 0), subtask("b", 1, 0), subtask("c", 1, 0)],
        );

        let bar = project_bar(&project, 2);
        let spans: f64 = bar.subtasks.iter().map(|subtask| subtask.span_days).sum();
        assert!(spans <= bar.span_days as f64 + 1.0);
    }

    #[test]
    fn empty_targets_still_occupy_one_day() {
        let project = project("alpha", (2025, 12, 1), Vec::new());
        assert_eq!(project_span_days(&project, 6), 1);

        let bar = project_bar(&project, 6);
        assert_eq!(bar.span_days, 1);
        assert!(close(bar.fill, 0.0));
    }

    #[test]
    fn classifies_each_recurrence_day() {
        let project = daily_project(
            "habit",
            (2025, 12, 1),
            (2025, 12, 5),
            vec![subtask("a", 2, 0)],
        );

        let mut ledger = SessionLedger::new();
        for label_day in [day(2025, 12, 1), day(2025, 12, 1), day(2025, 12, 2), day(2025, 12, 4)] {
            ledger.append(SessionLogEntry {
                date: date_label(label_day),
                duration: "25:00".to_string(),
                project_id: Some("habit".to_string()),
                subtask_id: Some("a".to_string()),
            });
        }

        let statuses = daily_statuses(&project, &ledger, day(2025, 12, 4));
        let expected = [
            (day(2025, 12, 1), DayStatus::Success),
            (day(2025, 12, 2), DayStatus::Failed),
            (day(2025, 12, 3), DayStatus::Failed),
            (day(2025, 12, 4), DayStatus::Pending),
            (day(2025, 12, 5), DayStatus::Pending),
        ];
        assert_eq!(statuses, expected);
    }

    #[test]
    fn non_daily_projects_have_no_day_statuses() {
        let project = project("alpha", (2025, 12, 1), vec![subtask("a", 2, 0)]);
        let ledger = SessionLedger::new();
        assert!(daily_statuses(&project, &ledger, day(2025, 12, 4)).is_empty());
    }

    #[test]
    fn axis_reaches_a_week_past_today() {
        let today = day(2025, 12, 4);
        let projects = vec![project(
            "alpha",
            (2025, 12, 1),
            vec![subtask("a", 4, 0), subtask("b", 8, 0)],
        )];

        let layout = timeline_layout(&projects, 6, today);
        assert_eq!(layout.axis.days.first().copied(), Some(day(2025, 12, 1)));
        assert_eq!(layout.axis.days.last().copied(), Some(day(2025, 12, 11)));
        assert_eq!(layout.axis.today_index, Some(3));
        assert_eq!(layout.bars.len(), 1);
    }

    #[test]
    fn axis_is_capped_at_a_year() {
        let today = day(2025, 12, 4);
        let projects = vec![project(
            "alpha",
            (2025, 12, 1),
            vec![subtask("a", 10_000, 0)],
        )];

        let layout = timeline_layout(&projects, 1, today);
        assert_eq!(layout.axis.days.len(), 365);
    }

    #[test]
    fn daily_projects_are_left_out_of_the_timeline() {
        let today = day(2025, 12, 4);
        let projects = vec![
            project("alpha", (2025, 12, 1), vec![subtask("a", 4, 0)]),
            daily_project("habit", (2025, 12, 1), (2025, 12, 31), vec![subtask("b", 1, 0)]),
        ];

        let layout = timeline_layout(&projects, 6, today);
        assert_eq!(layout.bars.len(), 1);
        assert_eq!(layout.bars[0].project_id, "alpha");
    }

    #[test]
    fn empty_board_axis_starts_today() {
        let today = day(2025, 12, 4);
        let layout = timeline_layout(&[], 6, today);
        assert_eq!(layout.axis.days.first().copied(), Some(today));
        assert_eq!(layout.axis.days.len(), 8);
        assert_eq!(layout.axis.today_index, Some(0));
    }
}
