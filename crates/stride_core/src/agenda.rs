use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{PlannerError, Result};
use crate::recurrence::{expand, DateWindow, Occurrence, MAX_WINDOW_DAYS};
use crate::task::{CategoryKey, Completion, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Overdue,
    Done,
}

/// Fraction of `[start, end]` that has elapsed at `now`, in `[0, 1]`. Missing or degenerate
/// intervals report 0.
pub fn progress(start: NaiveDateTime, end: Option<NaiveDateTime>, now: NaiveDateTime) -> f64 {
    let Some(end) = end else {
        return 0.0;
    };
    if end <= start || now <= start {
        return 0.0;
    }
    if now >= end {
        return 1.0;
    }
    let elapsed = (now - start).num_milliseconds() as f64;
    let total = (end - start).num_milliseconds() as f64;
    (elapsed / total).clamp(0.0, 1.0)
}

pub fn derive_status(
    completion: Completion,
    end: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> TaskStatus {
    if completion.is_completed() {
        return TaskStatus::Done;
    }
    match end {
        Some(end) if now >= end => TaskStatus::Overdue,
        _ => TaskStatus::Todo,
    }
}

fn day_pairs(tasks: &[Task], date: NaiveDate) -> Vec<(&Task, Occurrence)> {
    let window = DateWindow::single_day(date);
    let mut pairs: Vec<(&Task, Occurrence)> = Vec::new();
    for task in tasks {
        if task.is_recurring() {
            pairs.extend(expand(task, &window).into_iter().map(|occ| (task, occ)));
        } else if let Some(occ) = Occurrence::single(task) {
            if occ.start.date() == date {
                pairs.push((task, occ));
            }
        }
    }
    pairs.sort_by(|(_, a), (_, b)| a.start.cmp(&b.start).then_with(|| a.key.cmp(&b.key)));
    pairs
}

/// Everything happening on `date`, ordered by start.
pub fn select_day(tasks: &[Task], date: NaiveDate) -> Vec<Occurrence> {
    day_pairs(tasks, date)
        .into_iter()
        .map(|(_, occurrence)| occurrence)
        .collect()
}

pub fn select_day_str(tasks: &[Task], date: &str) -> Result<Vec<Occurrence>> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        PlannerError::InvalidDate {
            input: date.to_string(),
        }
    })?;
    Ok(select_day(tasks, parsed))
}

pub fn select_today(tasks: &[Task], now: NaiveDateTime) -> Vec<Occurrence> {
    select_day(tasks, now.date())
}

/// A day-view row. Status and progress are only valid for the `now` they were built with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaEntry {
    pub occurrence: Occurrence,
    pub title: String,
    pub category: CategoryKey,
    pub completion: Completion,
    pub status: TaskStatus,
    pub progress: f64,
}

impl AgendaEntry {
    fn new(task: &Task, occurrence: Occurrence, now: NaiveDateTime) -> Self {
        let status = derive_status(task.completed, occurrence.end, now);
        let progress = progress(occurrence.start, occurrence.end, now);
        Self {
            title: task.name.clone(),
            category: task.category(),
            completion: task.completed,
            status,
            progress,
            occurrence,
        }
    }
}

pub fn build_agenda(tasks: &[Task], date: NaiveDate, now: NaiveDateTime) -> Vec<AgendaEntry> {
    day_pairs(tasks, date)
        .into_iter()
        .map(|(task, occurrence)| AgendaEntry::new(task, occurrence, now))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgendaBuckets {
    pub overdue: Vec<AgendaEntry>,
    pub todo: Vec<AgendaEntry>,
    pub done: Vec<AgendaEntry>,
}

impl AgendaBuckets {
    pub fn from_entries(entries: impl IntoIterator<Item = AgendaEntry>) -> Self {
        let mut buckets = Self::default();
        for entry in entries {
            match entry.status {
                TaskStatus::Overdue => buckets.overdue.push(entry),
                TaskStatus::Todo => buckets.todo.push(entry),
                TaskStatus::Done => buckets.done.push(entry),
            }
        }
        buckets
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.todo.len() + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaDay {
    pub date: NaiveDate,
    pub entries: Vec<AgendaEntry>,
}

/// `days` consecutive day agendas starting at `first_day`.
pub fn agenda_span(
    tasks: &[Task],
    first_day: NaiveDate,
    days: usize,
    now: NaiveDateTime,
) -> Result<Vec<AgendaDay>> {
    if days == 0 {
        return Ok(Vec::new());
    }
    let span = i64::try_from(days).unwrap_or(i64::MAX);
    if span > MAX_WINDOW_DAYS {
        return Err(PlannerError::WindowTooLarge {
            days: span,
            limit: MAX_WINDOW_DAYS,
        });
    }
    let Some(last_day) = first_day.checked_add_signed(Duration::days(span - 1)) else {
        return Err(PlannerError::InvalidDate {
            input: format!("{first_day} + {span} days"),
        });
    };
    let window = DateWindow::new(first_day, last_day)?;
    Ok(window
        .days()
        .map(|date| AgendaDay {
            date,
            entries: build_agenda(tasks, date, now),
        })
        .collect())
}
