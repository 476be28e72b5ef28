use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use stride_core::{
    select_day_str, select_today, CalendarRequest, CategoryKey, CategorySelection, DateWindow,
    GoalId, TaskId,
};
use stride_store::PlannerService;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) agenda_span_days: usize,
    pub(crate) calendar_year: Option<i32>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_vars(|key| std::env::var(key).ok()))
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = var("STRIDE_ROOT") {
            config.push_root(PathBuf::from(root));
        }
        if let Some(list) = var("STRIDE_ROOTS") {
            for path in std::env::split_paths(&list) {
                config.push_root(path);
            }
        }
        if let Some(span) = var("STRIDE_AGENDA_SPAN_DAYS") {
            if let Ok(value) = span.trim().parse::<usize>() {
                if value > 0 {
                    config.agenda_span_days = value;
                }
            }
        }
        if let Some(year) = var("STRIDE_CALENDAR_YEAR") {
            if let Ok(value) = year.trim().parse::<i32>() {
                config.calendar_year = Some(value);
            }
        }
        config
    }

    pub(crate) fn push_root(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() || self.roots.contains(&path) {
            return;
        }
        info!(path = %path.display(), "registering data root");
        self.roots.push(path);
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            agenda_span_days: 7,
            calendar_year: None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "stride", about = "Calendar markings and day agendas for Stride tasks")]
pub struct Cli {
    /// Additional data root (file or directory); may be repeated.
    #[arg(long, global = true)]
    root: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Per-date calendar markings for a whole year.
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        /// Only show these goals; combine with --uncategorized.
        #[arg(long = "goal")]
        goals: Vec<u64>,
        #[arg(long)]
        uncategorized: bool,
        /// Task ids to leave out.
        #[arg(long = "hide")]
        hidden: Vec<u64>,
    },
    /// Occurrences on a single day (YYYY-MM-DD, default today).
    Day { date: Option<String> },
    /// Today's entries grouped into overdue, todo and done.
    Today,
    /// Consecutive day agendas starting today.
    Agenda {
        #[arg(long)]
        days: Option<usize>,
    },
    /// Goal colors.
    Legend,
}

fn category_selection(goals: &[u64], uncategorized: bool) -> CategorySelection {
    if goals.is_empty() && !uncategorized {
        return CategorySelection::All;
    }
    let mut selected: HashSet<CategoryKey> = goals
        .iter()
        .map(|id| match *id {
            0 => CategoryKey::Uncategorized,
            id => CategoryKey::Goal(GoalId(id)),
        })
        .collect();
    if uncategorized {
        selected.insert(CategoryKey::Uncategorized);
    }
    CategorySelection::Only(selected)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

pub fn run(cli: Cli, mut config: AppConfig) -> Result<()> {
    for root in cli.root {
        config.push_root(root);
    }
    if config.roots.is_empty() {
        bail!("no data roots configured; set STRIDE_ROOT or pass --root");
    }

    let mut builder = PlannerService::builder();
    for root in &config.roots {
        builder = builder.add_root(root);
    }
    let service = builder.build().context("failed to load task data")?;
    let now: NaiveDateTime = Local::now().naive_local();
    debug!(%now, roots = config.roots.len(), "service ready");

    match cli.command {
        Command::Calendar {
            year,
            goals,
            uncategorized,
            hidden,
        } => {
            let year = year.or(config.calendar_year).unwrap_or_else(|| now.year());
            let request = CalendarRequest::new(DateWindow::calendar_year(year)?)
                .with_hidden(hidden.into_iter().map(TaskId))
                .with_selection(category_selection(&goals, uncategorized));
            print_json(&service.calendar(&request))
        }
        Command::Day { date } => {
            let tasks = service.tasks();
            let occurrences = match date {
                Some(raw) => select_day_str(&tasks, &raw)?,
                None => select_today(&tasks, now),
            };
            print_json(&occurrences)
        }
        Command::Today => print_json(&service.agenda(now.date(), now)),
        Command::Agenda { days } => {
            let days = days.unwrap_or(config.agenda_span_days);
            print_json(&service.agenda_span(now.date(), days, now)?)
        }
        Command::Legend => print_json(&service.colors().legend()),
    }
}
