use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::task::{CategoryKey, Goal, GoalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    pub fn hex(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Color of the uncategorized bucket. Not part of [`PALETTE`].
pub const NEUTRAL_COLOR: Color = Color("#9E9E9E");

/// Goal colors, handed out in goal order and reused once exhausted.
pub const PALETTE: [(&str, Color); 12] = [
    ("red", Color("#E53935")),
    ("blue", Color("#1E88E5")),
    ("green", Color("#43A047")),
    ("orange", Color("#FB8C00")),
    ("purple", Color("#8E24AA")),
    ("teal", Color("#00897B")),
    ("pink", Color("#D81B60")),
    ("indigo", Color("#3949AB")),
    ("lime", Color("#C0CA33")),
    ("brown", Color("#6D4C41")),
    ("cyan", Color("#00ACC1")),
    ("amber", Color("#FFB300")),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendRow {
    pub category: CategoryKey,
    pub name: String,
    pub swatch: &'static str,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMap {
    rows: Vec<LegendRow>,
    by_goal: HashMap<GoalId, Color>,
}

impl ColorMap {
    pub fn get(&self, category: &CategoryKey) -> Color {
        match category {
            CategoryKey::Uncategorized => NEUTRAL_COLOR,
            CategoryKey::Goal(id) => self.by_goal.get(id).copied().unwrap_or(NEUTRAL_COLOR),
        }
    }

    /// Uncategorized first, then goals in the order they were assigned.
    pub fn legend(&self) -> Vec<LegendRow> {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(LegendRow {
            category: CategoryKey::Uncategorized,
            name: "Uncategorized".to_string(),
            swatch: "neutral",
            color: NEUTRAL_COLOR,
        });
        rows.extend(self.rows.iter().cloned());
        rows
    }
}

pub fn assign_colors(goals: &[Goal]) -> ColorMap {
    let mut rows = Vec::with_capacity(goals.len());
    let mut by_goal = HashMap::with_capacity(goals.len());
    for goal in goals {
        if goal.id.0 == 0 || by_goal.contains_key(&goal.id) {
            tracing::debug!(goal = %goal.id, "skipping reserved or duplicate goal id");
            continue;
        }
        let (swatch, color) = PALETTE[rows.len() % PALETTE.len()];
        by_goal.insert(goal.id, color);
        rows.push(LegendRow {
            category: CategoryKey::Goal(goal.id),
            name: goal.name.clone(),
            swatch,
            color,
        });
    }
    ColorMap { rows, by_goal }
}
