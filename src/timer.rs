use chrono::NaiveDate;

use crate::domain::{Board, Durations, Settings, format_clock};

pub const LONG_BREAK_EVERY: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn title(self) -> &'static str {
        match self {
            TimerMode::Pomodoro => "Pomodoro",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    pub fn minutes(self, durations: &Durations) -> i64 {
        let durations = durations.sanitized();
        match self {
            TimerMode::Pomodoro => durations.pomodoro,
            TimerMode::ShortBreak => durations.short_break,
            TimerMode::LongBreak => durations.long_break,
        }
    }

    pub fn seconds(self, durations: &Durations) -> i64 {
        self.minutes(durations) * 60
    }
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
    pub mode: TimerMode,
    pub time_left: i64,
    pub is_active: bool,
    pub completed_pomodoros: i64,
    pub active_project_id: Option<String>,
    pub active_subtask_id: Option<String>,
}

impl FocusTimer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: TimerMode::Pomodoro,
            time_left: TimerMode::Pomodoro.seconds(&settings.durations),
            is_active: false,
            completed_pomodoros: 0,
            active_project_id: None,
            active_subtask_id: None,
        }
    }

    pub fn toggle(&mut self) {
        self.is_active = !self.is_active;
    }

    pub fn set_focus(&mut self, project_id: Option<String>, subtask_id: Option<String>) {
        self.active_project_id = project_id;
        self.active_subtask_id = subtask_id;
    }

    // One call per elapsed second; the host owns the clock.
    pub fn on_tick(&mut self, board: &mut Board, today: NaiveDate) -> Option<TimerMode> {
        if !self.is_active || self.time_left <= 0 {
            return None;
        }

        self.time_left -= 1;
        if self.time_left > 0 {
            return None;
        }
        Some(self.complete(board, today))
    }

    // An unfinished interval is discarded without partial credit: a skipped
    // pomodoro still counts as one full completed session.
    pub fn skip(&mut self, board: &mut Board, today: NaiveDate) -> TimerMode {
        self.complete(board, today)
    }

    fn complete(&mut self, board: &mut Board, today: NaiveDate) -> TimerMode {
        self.is_active = false;

        match self.mode {
            TimerMode::Pomodoro => {
                self.completed_pomodoros += 1;
                board.record_completion(
                    self.active_project_id.as_deref(),
                    self.active_subtask_id.as_deref(),
                    today,
                );

                let next = if self.completed_pomodoros % LONG_BREAK_EVERY == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                };
                self.mode = next;
                self.time_left = next.seconds(&board.settings.durations);
                if board.settings.auto_start_breaks {
                    self.is_active = true;
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                self.mode = TimerMode::Pomodoro;
                self.time_left = TimerMode::Pomodoro.seconds(&board.settings.durations);
                if board.settings.auto_start_pomodoros {
                    self.is_active = true;
                }
            }
        }

        self.mode
    }

    pub fn switch_mode(&mut self, mode: TimerMode, settings: &Settings) {
        self.is_active = false;
        self.mode = mode;
        self.time_left = mode.seconds(&settings.durations);
    }

    pub fn reset(&mut self, settings: &Settings) {
        self.is_active = false;
        self.time_left = self.mode.seconds(&settings.durations);
    }

    // A running countdown is left untouched until the next mode switch.
    pub fn refresh_from_settings(&mut self, settings: &Settings) {
        if !self.is_active {
            self.time_left = self.mode.seconds(&settings.durations);
        }
    }

    pub fn display(&self) -> String {
        format_clock(self.time_left)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::domain::{Board, Importance, Urgency};

    use super::{FocusTimer, TimerMode};

    fn board_with_subtask() -> (Board, String, String) {
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
        (board, project_id, subtask_id)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 4).expect("date must be valid")
    }

    #[test]
    fn ticks_count_down_and_never_go_negative() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);
        timer.time_left = 3;
        timer.is_active = true;

        let mut previous = timer.time_left;
        for _ in 0..10 {
            timer.on_tick(&mut board, today());
            assert!(timer.time_left <= previous);
            assert!(timer.time_left >= 0);
            previous = timer.time_left;
        }
    }

    #[test]
    fn inactive_timer_ignores_ticks() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);
        let initial = timer.time_left;

        assert_eq!(timer.on_tick(&mut board, today()), None);
        assert_eq!(timer.time_left, initial);
    }

    #[test]
    fn reaching_zero_completes_into_a_break() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);
        timer.time_left = 2;
        timer.is_active = true;

        assert_eq!(timer.on_tick(&mut board, today()), None);
        assert_eq!(timer.on_tick(&mut board, today()), Some(TimerMode::ShortBreak));
        assert!(!timer.is_active);
        assert_eq!(timer.time_left, 5 * 60);
        assert_eq!(board.history.entries.len(), 1);
    }

    #[test]
    fn every_fourth_pomodoro_earns_a_long_break() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);

        for completion in 1..=4 {
            assert_eq!(timer.mode, TimerMode::Pomodoro);
            let next = timer.skip(&mut board, today());
            if completion == 4 {
                assert_eq!(next, TimerMode::LongBreak);
            } else {
                assert_eq!(next, TimerMode::ShortBreak);
            }
            assert_eq!(timer.skip(&mut board, today()), TimerMode::Pomodoro);
        }

        assert_eq!(timer.completed_pomodoros, 4);
        assert_eq!(board.history.entries.len(), 4);
    }

    #[test]
    fn completing_a_break_never_logs_a_session() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);
        timer.switch_mode(TimerMode::ShortBreak, &board.settings);

        assert_eq!(timer.skip(&mut board, today()), TimerMode::Pomodoro);
        assert_eq!(timer.completed_pomodoros, 0);
        assert!(board.history.entries.is_empty());
    }

    #[test]
    fn skip_credits_the_active_subtask_exactly_once() {
        let (mut board, project_id, subtask_id) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);
        timer.set_focus(Some(project_id.clone()), Some(subtask_id.clone()));

        timer.skip(&mut board, today());

        let subtask = board
            .project(&project_id)
            .and_then(|project| project.subtask(&subtask_id))
            .expect("subtask should exist");
        assert_eq!(subtask.completed_sessions, 1);
        assert_eq!(board.history.entries.len(), 1);
        assert_eq!(board.history.entries[0].subtask_id.as_deref(), Some(subtask_id.as_str()));
    }

    #[test]
    fn auto_start_flags_resume_the_next_interval() {
        let (mut board, _, _) = board_with_subtask();
        board.settings.auto_start_breaks = true;
        board.settings.auto_start_pomodoros = true;

        let mut timer = FocusTimer::new(&board.settings);
        timer.skip(&mut board, today());
        assert!(timer.is_active);

        timer.skip(&mut board, today());
        assert_eq!(timer.mode, TimerMode::Pomodoro);
        assert!(timer.is_active);
    }

    #[test]
    fn switch_mode_stops_and_reloads_the_clock() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);
        timer.is_active = true;
        timer.time_left = 17;

        timer.switch_mode(TimerMode::LongBreak, &board.settings);
        assert!(!timer.is_active);
        assert_eq!(timer.mode, TimerMode::LongBreak);
        assert_eq!(timer.time_left, 15 * 60);
        assert_eq!(timer.completed_pomodoros, 0);
    }

    #[test]
    fn duration_edits_only_touch_an_idle_clock() {
        let (mut board, _, _) = board_with_subtask();
        let mut timer = FocusTimer::new(&board.settings);

        board.settings.durations.pomodoro = 50;
        timer.refresh_from_settings(&board.settings);
        assert_eq!(timer.time_left, 50 * 60);

        timer.is_active = true;
        timer.time_left = 90;
        board.settings.durations.pomodoro = 10;
        timer.refresh_from_settings(&board.settings);
        assert_eq!(timer.time_left, 90);
    }

    #[test]
    fn malformed_durations_clamp_to_one_minute() {
        let (mut board, _, _) = board_with_subtask();
        board.settings.durations.pomodoro = 0;
        board.settings.durations.short_break = -3;

        let timer = FocusTimer::new(&board.settings);
        assert_eq!(timer.time_left, 60);
        assert_eq!(TimerMode::ShortBreak.seconds(&board.settings.durations), 60);
    }
}
