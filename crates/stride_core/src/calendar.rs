use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::color::{Color, ColorMap};
use crate::recurrence::{
    occurrence_stream, DateWindow, Occurrence, OccurrenceKey, MAX_WINDOW_DAYS,
};
use crate::task::{CategoryKey, Goal, Task, TaskId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategorySelection {
    #[default]
    All,
    Only(HashSet<CategoryKey>),
}

impl CategorySelection {
    pub fn includes(&self, category: &CategoryKey) -> bool {
        match self {
            CategorySelection::All => true,
            CategorySelection::Only(selected) => selected.contains(category),
        }
    }
}

impl FromIterator<CategoryKey> for CategorySelection {
    fn from_iter<I: IntoIterator<Item = CategoryKey>>(iter: I) -> Self {
        CategorySelection::Only(iter.into_iter().collect())
    }
}

/// Per-call filters for [`build_calendar`]. Recurring tasks are expanded over `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRequest {
    pub window: DateWindow,
    pub hidden: HashSet<TaskId>,
    pub selection: CategorySelection,
}

impl CalendarRequest {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            hidden: HashSet::new(),
            selection: CategorySelection::All,
        }
    }

    pub fn with_hidden(mut self, hidden: impl IntoIterator<Item = TaskId>) -> Self {
        self.hidden.extend(hidden);
        self
    }

    pub fn with_selection(mut self, selection: CategorySelection) -> Self {
        self.selection = selection;
        self
    }
}

/// One day's slice of a timed occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanSegment {
    pub key: OccurrenceKey,
    pub task_id: TaskId,
    pub category: CategoryKey,
    pub color: Color,
    pub is_first_day: bool,
    pub is_last_day: bool,
}

/// Deadline indicator, only ever on the due day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointMarker {
    pub key: OccurrenceKey,
    pub task_id: TaskId,
    pub category: CategoryKey,
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub segments: Vec<SpanSegment>,
    pub markers: Vec<PointMarker>,
}

impl DayCell {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.markers.is_empty()
    }
}

pub type CalendarMarks = BTreeMap<NaiveDate, DayCell>;

/// Per-date markings for the calendar view.
///
/// Buckets are visited uncategorized first, then in `goals` order, then any goal ids missing
/// from `goals` by ascending id (drawn in the neutral color). Dates with nothing to show have no
/// entry.
pub fn build_calendar(
    tasks: &[Task],
    goals: &[Goal],
    colors: &ColorMap,
    request: &CalendarRequest,
) -> CalendarMarks {
    let mut buckets: HashMap<CategoryKey, Vec<(&Task, Occurrence)>> = HashMap::new();
    for (task, occurrence) in occurrence_stream(tasks, &request.window) {
        if request.hidden.contains(&task.id) {
            continue;
        }
        buckets
            .entry(task.category())
            .or_default()
            .push((task, occurrence));
    }

    let mut unknown: Vec<CategoryKey> = buckets
        .keys()
        .filter(|category| match category {
            CategoryKey::Uncategorized => false,
            CategoryKey::Goal(id) => !goals.iter().any(|goal| goal.id == *id),
        })
        .copied()
        .collect();
    unknown.sort();
    for category in &unknown {
        tracing::debug!(%category, "occurrences reference a goal that is not in the goal list");
    }

    let order = std::iter::once(CategoryKey::Uncategorized)
        .chain(goals.iter().map(|goal| CategoryKey::Goal(goal.id)))
        .chain(unknown);

    let mut marks = CalendarMarks::new();
    let mut visited: HashSet<CategoryKey> = HashSet::new();
    for category in order {
        if !visited.insert(category) || !request.selection.includes(&category) {
            continue;
        }
        let Some(mut bucket) = buckets.remove(&category) else {
            continue;
        };
        bucket.sort_by(|(_, a), (_, b)| a.start.cmp(&b.start).then_with(|| a.key.cmp(&b.key)));
        mark_bucket(&mut marks, category, colors.get(&category), &bucket);
    }

    marks
}

fn mark_bucket(
    marks: &mut CalendarMarks,
    category: CategoryKey,
    color: Color,
    bucket: &[(&Task, Occurrence)],
) {
    let mut emitted: HashSet<(OccurrenceKey, NaiveDate)> = HashSet::new();

    for (task, occurrence) in bucket {
        let Some(end) = occurrence.end else {
            tracing::trace!(key = %occurrence.key, "occurrence has no end, not rendered");
            continue;
        };

        if task.is_deadline() {
            let due = end.date();
            if emitted.insert((occurrence.key, due)) {
                marks.entry(due).or_default().markers.push(PointMarker {
                    key: occurrence.key,
                    task_id: task.id,
                    category,
                    color,
                });
            }
            continue;
        }

        if occurrence.start > end {
            tracing::debug!(key = %occurrence.key, "discarding inverted interval");
            continue;
        }

        let first_day = occurrence.start.date();
        let last_day = end.date();
        if last_day.signed_duration_since(first_day).num_days() >= MAX_WINDOW_DAYS {
            tracing::debug!(key = %occurrence.key, "discarding span longer than the window limit");
            continue;
        }

        for day in first_day.iter_days().take_while(|day| *day <= last_day) {
            if !emitted.insert((occurrence.key, day)) {
                continue;
            }
            marks.entry(day).or_default().segments.push(SpanSegment {
                key: occurrence.key,
                task_id: task.id,
                category,
                color,
                is_first_day: day == first_day,
                is_last_day: day == last_day,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{assign_colors, NEUTRAL_COLOR};
    use crate::recurrence::{Frequency, RecurrenceRule};
    use crate::task::{GoalId, Schedule};
    use chrono::{NaiveDateTime, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    fn single(id: u64, start: NaiveDateTime, end: NaiveDateTime) -> Task {
        Task::new(
            id,
            format!("task {id}"),
            Schedule::Single {
                start: Some(start),
                end: Some(end),
            },
        )
    }

    fn year_request() -> CalendarRequest {
        CalendarRequest::new(DateWindow::calendar_year(2025).unwrap())
    }

    fn render(tasks: &[Task], goals: &[Goal], request: &CalendarRequest) -> CalendarMarks {
        build_calendar(tasks, goals, &assign_colors(goals), request)
    }

    #[test]
    fn multi_day_span_is_split_per_day() {
        let tasks = vec![single(1, at(2025, 3, 1, 20, 0), at(2025, 3, 3, 6, 0))];
        let marks = render(&tasks, &[], &year_request());

        assert_eq!(marks.len(), 3);
        let flags: Vec<(NaiveDate, bool, bool)> = marks
            .iter()
            .map(|(day, cell)| {
                assert_eq!(cell.segments.len(), 1);
                assert!(cell.markers.is_empty());
                let segment = &cell.segments[0];
                (*day, segment.is_first_day, segment.is_last_day)
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                (date(2025, 3, 1), true, false),
                (date(2025, 3, 2), false, false),
                (date(2025, 3, 3), false, true),
            ]
        );
    }

    #[test]
    fn deadline_produces_single_marker() {
        let deadline = Task::new(
            2,
            "file taxes",
            Schedule::Deadline {
                end: Some(at(2025, 6, 10, 23, 59)),
            },
        );
        let tasks = vec![deadline];
        for window in [
            DateWindow::single_day(date(2025, 1, 1)),
            DateWindow::calendar_year(2025).unwrap(),
        ] {
            let marks = render(&tasks, &[], &CalendarRequest::new(window));
            assert_eq!(marks.len(), 1);
            let cell = &marks[&date(2025, 6, 10)];
            assert_eq!(cell.markers.len(), 1);
            assert!(cell.segments.is_empty());
            assert_eq!(cell.markers[0].color, NEUTRAL_COLOR);
        }
    }

    #[test]
    fn deadline_without_end_is_dropped() {
        let tasks = vec![Task::new(3, "someday", Schedule::Deadline { end: None })];
        assert!(render(&tasks, &[], &year_request()).is_empty());
    }

    #[test]
    fn inverted_and_open_intervals_are_dropped() {
        let inverted = single(4, at(2025, 5, 2, 10, 0), at(2025, 5, 1, 10, 0));
        let open = Task::new(
            5,
            "open",
            Schedule::Single {
                start: Some(at(2025, 5, 3, 10, 0)),
                end: None,
            },
        );
        let unanchored = Task::new(
            6,
            "floating",
            Schedule::Single {
                start: None,
                end: Some(at(2025, 5, 4, 10, 0)),
            },
        );
        let marks = render(&[inverted, open, unanchored], &[], &year_request());
        assert!(marks.is_empty());
    }

    #[test]
    fn distinct_tasks_keep_their_own_segments() {
        let goals = vec![Goal::new(1, "Work")];
        let tasks = vec![
            single(10, at(2025, 4, 1, 9, 0), at(2025, 4, 1, 10, 0)).with_goal(1),
            single(11, at(2025, 4, 1, 11, 0), at(2025, 4, 2, 10, 0)).with_goal(1),
        ];
        let marks = render(&tasks, &goals, &year_request());
        let first = &marks[&date(2025, 4, 1)];
        assert_eq!(first.segments.len(), 2);
        assert_eq!(first.segments[0].task_id, TaskId(10));
        assert_eq!(first.segments[1].task_id, TaskId(11));
        assert_eq!(marks[&date(2025, 4, 2)].segments.len(), 1);
    }

    #[test]
    fn duplicate_records_collapse_to_one_segment_per_day() {
        let span = single(12, at(2025, 7, 1, 8, 0), at(2025, 7, 2, 8, 0));
        let tasks = vec![span.clone(), span];
        let marks = render(&tasks, &[], &year_request());
        assert_eq!(marks.len(), 2);
        assert!(marks.values().all(|cell| cell.segments.len() == 1));
    }

    #[test]
    fn hidden_tasks_and_unselected_categories_are_filtered() {
        let goals = vec![Goal::new(1, "Work"), Goal::new(2, "Health")];
        let tasks = vec![
            single(20, at(2025, 8, 1, 9, 0), at(2025, 8, 1, 10, 0)).with_goal(1),
            single(21, at(2025, 8, 2, 9, 0), at(2025, 8, 2, 10, 0)).with_goal(2),
            single(22, at(2025, 8, 3, 9, 0), at(2025, 8, 3, 10, 0)),
            single(23, at(2025, 8, 4, 9, 0), at(2025, 8, 4, 10, 0)).with_goal(1),
        ];
        let request = year_request()
            .with_hidden([TaskId(23)])
            .with_selection(
                [CategoryKey::Goal(GoalId(1)), CategoryKey::Uncategorized]
                    .into_iter()
                    .collect(),
            );
        let marks = render(&tasks, &goals, &request);
        let days: Vec<NaiveDate> = marks.keys().copied().collect();
        assert_eq!(days, vec![date(2025, 8, 1), date(2025, 8, 3)]);

        let none = year_request().with_selection(CategorySelection::Only(HashSet::new()));
        assert!(render(&tasks, &goals, &none).is_empty());
    }

    #[test]
    fn unknown_goal_is_drawn_in_neutral_color() {
        let goals = vec![Goal::new(1, "Work")];
        let tasks = vec![single(30, at(2025, 9, 1, 9, 0), at(2025, 9, 1, 10, 0)).with_goal(77)];
        let marks = render(&tasks, &goals, &year_request());
        assert_eq!(marks.len(), 1);
        let segments = &marks[&date(2025, 9, 1)].segments;
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].task_id, TaskId(30));
        assert_eq!(segments[0].category, CategoryKey::Goal(GoalId(77)));
        assert_eq!(segments[0].color, NEUTRAL_COLOR);
    }

    #[test]
    fn unknown_goal_follows_the_category_selection() {
        let goals = vec![Goal::new(1, "Work")];
        let tasks = vec![
            single(31, at(2025, 9, 2, 9, 0), at(2025, 9, 3, 10, 0)).with_goal(77),
            single(32, at(2025, 9, 2, 8, 0), at(2025, 9, 2, 9, 0)).with_goal(1),
        ];

        let only_unknown = year_request()
            .with_selection([CategoryKey::Goal(GoalId(77))].into_iter().collect());
        let marks = render(&tasks, &goals, &only_unknown);
        assert_eq!(marks.len(), 2);
        assert!(marks
            .values()
            .flat_map(|cell| &cell.segments)
            .all(|segment| segment.task_id == TaskId(31)));

        let only_work =
            year_request().with_selection([CategoryKey::Goal(GoalId(1))].into_iter().collect());
        let marks = render(&tasks, &goals, &only_work);
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[&date(2025, 9, 2)].segments[0].task_id, TaskId(32));
    }

    #[test]
    fn unknown_goals_come_after_known_ones_by_id() {
        let goals = vec![Goal::new(1, "Work")];
        let tasks = vec![
            single(33, at(2025, 10, 1, 7, 0), at(2025, 10, 1, 8, 0)).with_goal(90),
            single(34, at(2025, 10, 1, 9, 0), at(2025, 10, 1, 10, 0)).with_goal(1),
            single(35, at(2025, 10, 1, 6, 0), at(2025, 10, 1, 7, 0)).with_goal(80),
            single(36, at(2025, 10, 1, 11, 0), at(2025, 10, 1, 12, 0)),
        ];
        let marks = render(&tasks, &goals, &year_request());
        let ids: Vec<TaskId> = marks[&date(2025, 10, 1)]
            .segments
            .iter()
            .map(|segment| segment.task_id)
            .collect();
        assert_eq!(ids, vec![TaskId(36), TaskId(34), TaskId(35), TaskId(33)]);
    }

    #[test]
    fn recurring_tasks_expand_into_colored_segments() {
        let goals = vec![Goal::new(5, "Fitness")];
        let colors = assign_colors(&goals);
        let task = Task::new(
            40,
            "swim",
            Schedule::Recurring {
                start: at(2025, 1, 1, 9, 0),
                rule: RecurrenceRule::new(
                    Frequency::Weekly {
                        days: [2].into_iter().collect(),
                    },
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                ),
            },
        )
        .with_goal(5);
        let request = CalendarRequest::new(
            DateWindow::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap(),
        );
        let marks = build_calendar(&[task], &goals, &colors, &request);
        assert_eq!(marks.len(), 5);
        for (day, cell) in &marks {
            let segment = &cell.segments[0];
            assert_eq!(segment.key.date, *day);
            assert_eq!(segment.color, colors.get(&CategoryKey::Goal(GoalId(5))));
            assert!(segment.is_first_day && segment.is_last_day);
        }
    }

    #[test]
    fn overnight_recurrences_share_a_day_without_collapsing() {
        let task = Task::new(
            41,
            "night shift",
            Schedule::Recurring {
                start: at(2025, 1, 1, 22, 0),
                rule: RecurrenceRule::new(
                    Frequency::Daily,
                    NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
                ),
            },
        );
        let request = CalendarRequest::new(
            DateWindow::new(date(2025, 1, 1), date(2025, 1, 2)).unwrap(),
        );
        let marks = render(&[task], &[], &request);
        assert_eq!(marks[&date(2025, 1, 1)].segments.len(), 1);
        let second = &marks[&date(2025, 1, 2)].segments;
        assert_eq!(second.len(), 2);
        assert!(second[0].is_last_day && !second[0].is_first_day);
        assert!(second[1].is_first_day && !second[1].is_last_day);
        assert_eq!(marks[&date(2025, 1, 3)].segments.len(), 1);
    }

    #[test]
    fn serializes_dates_as_iso_keys() {
        let tasks = vec![single(50, at(2025, 2, 14, 9, 0), at(2025, 2, 14, 10, 0))];
        let marks = render(&tasks, &[], &year_request());
        let json = serde_json::to_value(&marks).unwrap();
        let cell = &json["2025-02-14"];
        assert_eq!(cell["segments"][0]["is_first_day"], true);
        assert_eq!(cell["segments"][0]["category"], "uncategorized");
        assert_eq!(cell["segments"][0]["color"], NEUTRAL_COLOR.hex());
    }
}
