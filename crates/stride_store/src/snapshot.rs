use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stride_core::{assign_colors, ColorMap, Goal, Task};

/// Goals and tasks as delivered by the store, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub goals: Vec<Goal>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct DataFile {
    #[serde(default)]
    goals: Vec<Value>,
    #[serde(default)]
    tasks: Vec<Value>,
}

impl Snapshot {
    /// Parses a data file. Records that do not decode are skipped one by one; only a document
    /// that is not a `{ goals, tasks }` object fails.
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: DataFile =
            serde_json::from_str(raw).context("data file is not a goals/tasks document")?;

        let mut snapshot = Snapshot::default();
        for (idx, value) in file.goals.into_iter().enumerate() {
            match serde_json::from_value::<Goal>(value) {
                Ok(goal) if goal.id.0 == 0 => {
                    tracing::warn!(index = idx, "ignoring goal with reserved id 0");
                }
                Ok(goal) => snapshot.upsert_goal(goal),
                Err(err) => tracing::warn!(index = idx, %err, "skipping malformed goal"),
            }
        }
        for (idx, value) in file.tasks.into_iter().enumerate() {
            match serde_json::from_value::<Task>(value) {
                Ok(task) => snapshot.upsert_task(task),
                Err(err) => tracing::warn!(index = idx, %err, "skipping malformed task"),
            }
        }
        Ok(snapshot)
    }

    /// Folds `other` in. Records sharing an id with an existing one replace it in place.
    pub fn merge(&mut self, other: Snapshot) {
        for goal in other.goals {
            self.upsert_goal(goal);
        }
        for task in other.tasks {
            self.upsert_task(task);
        }
    }

    pub fn upsert_goal(&mut self, goal: Goal) {
        match self.goals.iter_mut().find(|existing| existing.id == goal.id) {
            Some(existing) => *existing = goal,
            None => self.goals.push(goal),
        }
    }

    pub fn upsert_task(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    pub fn colors(&self) -> ColorMap {
        assign_colors(&self.goals)
    }
}
