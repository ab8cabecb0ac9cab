use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::{SessionLogEntry, date_label_day, parse_clock};

#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    pub entries: Vec<SessionLogEntry>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entries(entries: Vec<SessionLogEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: SessionLogEntry) {
        self.entries.push(entry);
    }

    // One entry is one completed session, whatever duration it recorded.
    // Date labels compare as opaque strings.
    pub fn count_completions(&self, project_id: &str, date_label: &str) -> i64 {
        self.entries
            .iter()
            .filter(|entry| {
                entry.project_id.as_deref() == Some(project_id) && entry.date == date_label
            })
            .count() as i64
    }

    pub fn minutes_by_date(&self) -> BTreeMap<String, i64> {
        let mut seconds_by_date: BTreeMap<String, i64> = BTreeMap::new();
        for entry in &self.entries {
            let seconds = parse_clock(&entry.duration).unwrap_or(0);
            *seconds_by_date.entry(entry.date.clone()).or_insert(0) += seconds;
        }

        seconds_by_date
            .into_iter()
            .map(|(label, seconds)| (label, seconds / 60))
            .collect()
    }

    pub fn month_groups(&self) -> Vec<MonthGroup> {
        let mut days = self
            .minutes_by_date()
            .into_iter()
            .map(|(label, minutes)| DayMinutes {
                day: date_label_day(&label),
                label,
                minutes,
            })
            .collect::<Vec<_>>();
        days.sort_by(|left, right| {
            left.day
                .cmp(&right.day)
                .then_with(|| left.label.cmp(&right.label))
        });

        let mut groups: Vec<MonthGroup> = Vec::new();
        for day in days {
            let year = day.day.year();
            let month = day.day.month();
            match groups.last_mut() {
                Some(group) if group.year == year && group.month == month => {
                    group.days.push(day);
                }
                _ => {
                    let title = day.day.format("%B %Y").to_string();
                    groups.push(MonthGroup {
                        year,
                        month,
                        title,
                        days: vec![day],
                    });
                }
            }
        }

        groups
    }
}

#[derive(Debug, Clone)]
pub struct DayMinutes {
    pub day: NaiveDate,
    pub label: String,
    pub minutes: i64,
}

#[derive(Debug, Clone)]
pub struct MonthGroup {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub days: Vec<DayMinutes>,
}

impl MonthGroup {
    pub fn max_minutes(&self) -> i64 {
        self.days.iter().map(|day| day.minutes).max().unwrap_or(0)
    }
}

pub fn chart_ticks(max_minutes: i64) -> Vec<i64> {
    let max = max_minutes.max(10);
    let step = if max <= 60 {
        10
    } else if max <= 180 {
        30
    } else {
        60
    };
    let top = (max as u64).div_ceil(step as u64) as i64 * step;
    (0..=top).step_by(step as usize).collect()
}

#[cfg(test)]
mod tests {
    use crate::domain::SessionLogEntry;

    use super::{SessionLedger, chart_ticks};

    fn entry(date: &str, duration: &str, project_id: Option<&str>) -> SessionLogEntry {
        SessionLogEntry {
            date: date.to_string(),
            duration: duration.to_string(),
            project_id: project_id.map(str::to_string),
            subtask_id: None,
        }
    }

    #[test]
    fn counts_exact_label_and_project_matches() {
        let ledger = SessionLedger::from_entries(vec![
            entry("04 December 2025", "25:00", Some("alpha")),
            entry("04 December 2025", "50:00", Some("alpha")),
            entry("04 December 2025", "25:00", Some("beta")),
            entry("05 December 2025", "25:00", Some("alpha")),
            entry("04 December 2025", "25:00", None),
        ]);

        assert_eq!(ledger.count_completions("alpha", "04 December 2025"), 2);
        assert_eq!(ledger.count_completions("beta", "04 December 2025"), 1);
        assert_eq!(ledger.count_completions("alpha", "04Dec25"), 0);
    }

    #[test]
    fn sums_minutes_across_duration_shapes() {
        let ledger = SessionLedger::from_entries(vec![
            entry("04 December 2025", "25:00", None),
            entry("04 December 2025", "1:05:00", None),
            entry("05 December 2025", "25:00", None),
        ]);

        let minutes = ledger.minutes_by_date();
        assert_eq!(minutes.get("04 December 2025"), Some(&90));
        assert_eq!(minutes.get("05 December 2025"), Some(&25));
    }

    #[test]
    fn ignores_unparseable_durations() {
        let ledger = SessionLedger::from_entries(vec![
            entry("04 December 2025", "25:00", None),
            entry("04 December 2025", "broken", None),
        ]);

        assert_eq!(ledger.minutes_by_date().get("04 December 2025"), Some(&25));
    }

    #[test]
    fn groups_months_ascending_with_epoch_fallback() {
        let ledger = SessionLedger::from_entries(vec![
            entry("15 January 2026", "25:00", None),
            entry("04Dec25", "25:00", None),
            entry("garbage", "25:00", None),
            entry("28 December 2025", "25:00", None),
        ]);

        let groups = ledger.month_groups();
        let titles = groups
            .iter()
            .map(|group| group.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["January 1970", "December 2025", "January 2026"]);

        let december = &groups[1];
        assert_eq!(december.days.len(), 2);
        assert_eq!(december.days[0].label, "04Dec25");
        assert_eq!(december.days[1].label, "28 December 2025");
    }

    #[test]
    fn derives_chart_ticks() {
        assert_eq!(chart_ticks(0), vec![0, 10]);
        assert_eq!(chart_ticks(45), vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(chart_ticks(60), vec![0, 10, 20, 30, 40, 50, 60]);
        assert_eq!(chart_ticks(61), vec![0, 30, 60, 90]);
        assert_eq!(chart_ticks(181), vec![0, 60, 120, 180, 240]);
    }
}
