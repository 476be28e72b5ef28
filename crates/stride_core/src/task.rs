use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(pub u64);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which bucket a task renders under. Stored data uses `0`/absent for "no goal"; that never
/// makes it past deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKey {
    Uncategorized,
    Goal(GoalId),
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Uncategorized => f.write_str("uncategorized"),
            CategoryKey::Goal(id) => write!(f, "goal:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
}

impl Goal {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: GoalId(id),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Completion {
    Completed,
    NotCompleted,
    /// Never touched. Treated like `NotCompleted` when deriving status.
    #[default]
    Unset,
}

impl Completion {
    pub fn is_completed(self) -> bool {
        matches!(self, Completion::Completed)
    }
}

impl From<Option<bool>> for Completion {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Completion::Completed,
            Some(false) => Completion::NotCompleted,
            None => Completion::Unset,
        }
    }
}

impl From<Completion> for Option<bool> {
    fn from(value: Completion) -> Self {
        match value {
            Completion::Completed => Some(true),
            Completion::NotCompleted => Some(false),
            Completion::Unset => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Schedule {
    Single {
        #[serde(default)]
        start: Option<NaiveDateTime>,
        #[serde(default)]
        end: Option<NaiveDateTime>,
    },
    Recurring {
        /// When the series began; nothing is produced before this day.
        start: NaiveDateTime,
        rule: RecurrenceRule,
    },
    Deadline {
        #[serde(default)]
        end: Option<NaiveDateTime>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default, deserialize_with = "goal_or_uncategorized")]
    pub goal_id: Option<GoalId>,
    pub schedule: Schedule,
    #[serde(default)]
    pub completed: Completion,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    pub fn new(id: u64, name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            id: TaskId(id),
            name: name.into(),
            goal_id: None,
            schedule,
            completed: Completion::Unset,
            details: None,
            tags: Vec::new(),
        }
    }

    pub fn with_goal(mut self, goal: u64) -> Self {
        self.goal_id = (goal != 0).then_some(GoalId(goal));
        self
    }

    pub fn with_completion(mut self, completed: Completion) -> Self {
        self.completed = completed;
        self
    }

    pub fn category(&self) -> CategoryKey {
        match self.goal_id {
            Some(id) => CategoryKey::Goal(id),
            None => CategoryKey::Uncategorized,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, Schedule::Recurring { .. })
    }

    pub fn is_deadline(&self) -> bool {
        matches!(self.schedule, Schedule::Deadline { .. })
    }
}

fn goal_or_uncategorized<'de, D>(deserializer: D) -> Result<Option<GoalId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<u64> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != 0).map(GoalId))
}
