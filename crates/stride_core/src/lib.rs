//! Recurrence expansion and calendar aggregation for the Stride task tracker.
//!
//! Everything in this crate is a pure function of its inputs. Callers hand in task and goal
//! snapshots (plus `now` where it matters) and get rendering-ready structures back.

pub mod agenda;
pub mod calendar;
pub mod color;
pub mod error;
pub mod recurrence;
pub mod task;

pub use crate::agenda::{
    agenda_span, build_agenda, derive_status, progress, select_day, select_day_str, select_today,
    AgendaBuckets, AgendaDay, AgendaEntry, TaskStatus,
};
pub use crate::calendar::{
    build_calendar, CalendarMarks, CalendarRequest, CategorySelection, DayCell, PointMarker,
    SpanSegment,
};
pub use crate::color::{assign_colors, Color, ColorMap, LegendRow, NEUTRAL_COLOR, PALETTE};
pub use crate::error::{PlannerError, Result};
pub use crate::recurrence::{
    expand, expand_between, occurrence_stream, DateWindow, Frequency, Occurrence, OccurrenceKey,
    RecurrenceRule, MAX_WINDOW_DAYS,
};
pub use crate::task::{CategoryKey, Completion, Goal, GoalId, Schedule, Task, TaskId};
