use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::task::{Schedule, Task, TaskId};

/// Roughly five years of days. Larger windows are rejected rather than walked.
pub const MAX_WINDOW_DAYS: i64 = 1830;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    /// Weekday indices, Monday = 0 through Sunday = 6.
    Weekly { days: BTreeSet<u8> },
    /// Days of the month, 1 through 31. Days a month lacks are simply never hit.
    Monthly { days: BTreeSet<u32> },
    Yearly { month: u32, day: u32 },
    #[serde(other)]
    Unsupported,
}

impl Frequency {
    pub fn includes(&self, day: NaiveDate) -> bool {
        match self {
            Frequency::Daily => true,
            Frequency::Weekly { days } => {
                days.contains(&(day.weekday().num_days_from_monday() as u8))
            }
            Frequency::Monthly { days } => days.contains(&day.day()),
            Frequency::Yearly { month, day: dom } => day.month() == *month && day.day() == *dom,
            Frequency::Unsupported => false,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => f.write_str("daily"),
            Frequency::Weekly { days } => {
                let names: Vec<&str> = days
                    .iter()
                    .map(|d| match d {
                        0 => "mon",
                        1 => "tue",
                        2 => "wed",
                        3 => "thu",
                        4 => "fri",
                        5 => "sat",
                        6 => "sun",
                        _ => "?",
                    })
                    .collect();
                write!(f, "weekly:{}", names.join(","))
            }
            Frequency::Monthly { days } => {
                let days: Vec<String> = days.iter().map(|d| d.to_string()).collect();
                write!(f, "monthly:{}", days.join(","))
            }
            Frequency::Yearly { month, day } => write!(f, "yearly:{}-{}", month, day),
            Frequency::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// Which days a recurring task lands on, plus the wall-clock window of each instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            frequency,
            start_time,
            end_time,
        }
    }

    /// Start and end of the instance on `day`. An end at or before the start rolls over to the
    /// next day; `None` when that day is past the last representable date.
    pub fn instance_bounds(&self, day: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = day.and_time(self.start_time);
        let mut end = day.and_time(self.end_time);
        if end <= start {
            end = end.checked_add_signed(Duration::days(1))?;
        }
        Some((start, end))
    }
}

/// Closed range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PlannerError::InvalidWindow { start, end });
        }
        let days = end.signed_duration_since(start).num_days() + 1;
        if days > MAX_WINDOW_DAYS {
            return Err(PlannerError::WindowTooLarge {
                days,
                limit: MAX_WINDOW_DAYS,
            });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn calendar_year(year: i32) -> Result<Self> {
        let bounds =
            NaiveDate::from_ymd_opt(year, 1, 1).zip(NaiveDate::from_ymd_opt(year, 12, 31));
        let Some((start, end)) = bounds else {
            return Err(PlannerError::InvalidDate {
                input: format!("{year}-01-01"),
            });
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Identity of a single occurrence: the owning task plus the day it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccurrenceKey {
    pub task_id: TaskId,
    pub date: NaiveDate,
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.task_id, self.date)
    }
}

/// A dated instance of a task, computed on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub key: OccurrenceKey,
    pub task_id: TaskId,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub recurring: bool,
    pub date: NaiveDate,
}

impl Occurrence {
    /// The task itself as an occurrence. `None` for recurring tasks and for tasks missing the
    /// instant they are anchored on.
    pub fn single(task: &Task) -> Option<Self> {
        let (start, end) = match &task.schedule {
            Schedule::Single { start, end } => ((*start)?, *end),
            Schedule::Deadline { end } => {
                let due = (*end)?;
                (due, Some(due))
            }
            Schedule::Recurring { .. } => return None,
        };
        let date = start.date();
        Some(Self {
            key: OccurrenceKey {
                task_id: task.id,
                date,
            },
            task_id: task.id,
            start,
            end,
            recurring: false,
            date,
        })
    }
}

/// Concrete instances of a recurring task inside `window`, ordered by start. Non-recurring
/// tasks and unsupported rules yield nothing.
pub fn expand(task: &Task, window: &DateWindow) -> Vec<Occurrence> {
    let Schedule::Recurring { start, rule } = &task.schedule else {
        return Vec::new();
    };
    if matches!(rule.frequency, Frequency::Unsupported) {
        tracing::trace!(task = %task.id, "skipping unsupported recurrence rule");
        return Vec::new();
    }

    let series_start = start.date();
    let first = window.start().max(series_start);
    let mut occurrences = Vec::new();
    for day in first.iter_days().take_while(|day| *day <= window.end()) {
        if !rule.frequency.includes(day) {
            continue;
        }
        let Some((start, end)) = rule.instance_bounds(day) else {
            tracing::debug!(task = %task.id, %day, "instance end is out of range, skipped");
            continue;
        };
        occurrences.push(Occurrence {
            key: OccurrenceKey {
                task_id: task.id,
                date: day,
            },
            task_id: task.id,
            start,
            end: Some(end),
            recurring: true,
            date: day,
        });
    }
    occurrences
}

pub fn expand_between(task: &Task, start: NaiveDate, end: NaiveDate) -> Result<Vec<Occurrence>> {
    let window = DateWindow::new(start, end)?;
    Ok(expand(task, &window))
}

/// Every task as occurrences: recurring tasks expanded over `window`, the rest taken as they
/// are. Tasks with nothing to anchor on are left out.
pub fn occurrence_stream<'a>(
    tasks: &'a [Task],
    window: &DateWindow,
) -> Vec<(&'a Task, Occurrence)> {
    let mut stream = Vec::new();
    for task in tasks {
        if task.is_recurring() {
            stream.extend(expand(task, window).into_iter().map(|occ| (task, occ)));
        } else if let Some(occ) = Occurrence::single(task) {
            stream.push((task, occ));
        } else {
            tracing::trace!(task = %task.id, "task has no anchor instant, not renderable");
        }
    }
    stream
}
