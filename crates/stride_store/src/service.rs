use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use stride_core::{
    agenda_span, build_agenda, build_calendar, select_day, AgendaBuckets, AgendaDay,
    CalendarMarks, CalendarRequest, ColorMap, Goal, Occurrence, Task,
};
use tracing::instrument;
use walkdir::WalkDir;

use crate::snapshot::Snapshot;

/// Loads goal/task data files from a set of roots and serves engine views over the latest
/// snapshot.
pub struct PlannerService {
    roots: Vec<PathBuf>,
    snapshot: Arc<RwLock<Snapshot>>,
    watcher: Option<RecommendedWatcher>,
}

#[derive(Default)]
pub struct PlannerServiceBuilder {
    roots: Vec<PathBuf>,
}

impl PlannerServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
        self
    }

    pub fn build(self) -> Result<PlannerService> {
        let service = PlannerService {
            roots: self.roots,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
            watcher: None,
        };
        service.reload_all()?;
        Ok(service)
    }
}

impl PlannerService {
    pub fn builder() -> PlannerServiceBuilder {
        PlannerServiceBuilder::new()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots = self.roots.clone();
        roots.sort();
        roots
    }

    /// Data files under every root, in the order they are merged.
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        list_files(&self.roots)
    }

    #[instrument(skip(self))]
    pub fn reload_all(&self) -> Result<()> {
        let merged = load_snapshot(&self.roots)?;
        *self.snapshot.write() = merged;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.snapshot.read().tasks.clone()
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.snapshot.read().goals.clone()
    }

    pub fn colors(&self) -> ColorMap {
        self.snapshot.read().colors()
    }

    #[instrument(
        skip(self, request),
        fields(start = %request.window.start(), end = %request.window.end())
    )]
    pub fn calendar(&self, request: &CalendarRequest) -> CalendarMarks {
        let snapshot = self.snapshot.read();
        let colors = snapshot.colors();
        build_calendar(&snapshot.tasks, &snapshot.goals, &colors, request)
    }

    pub fn day(&self, date: NaiveDate) -> Vec<Occurrence> {
        select_day(&self.snapshot.read().tasks, date)
    }

    #[instrument(skip(self))]
    pub fn agenda(&self, date: NaiveDate, now: NaiveDateTime) -> AgendaBuckets {
        let entries = build_agenda(&self.snapshot.read().tasks, date, now);
        AgendaBuckets::from_entries(entries)
    }

    pub fn agenda_span(
        &self,
        first_day: NaiveDate,
        days: usize,
        now: NaiveDateTime,
    ) -> Result<Vec<AgendaDay>> {
        Ok(agenda_span(&self.snapshot.read().tasks, first_day, days, now)?)
    }

    /// Reload the snapshot whenever a data file under one of the roots is created, modified or
    /// removed. A reload that fails keeps the previous snapshot.
    pub fn watch(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let roots = self.roots.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "data root watcher failed");
                    return;
                }
            };
            if !touches_data_file(&event) {
                return;
            }
            tracing::debug!(paths = ?event.paths, "data file change detected");
            match load_snapshot(&roots) {
                Ok(merged) => *snapshot.write() = merged,
                Err(err) => tracing::warn!(error = %err, "reload after change failed"),
            }
        })?;
        for root in &self.roots {
            let mode = if root.is_file() {
                RecursiveMode::NonRecursive
            } else {
                RecursiveMode::Recursive
            };
            watcher.watch(root, mode)?;
        }
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

fn list_files(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            if is_data_file(root) {
                files.push(root.clone());
            }
            continue;
        }
        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "data root does not exist");
            continue;
        }
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if entry.file_type().is_file() && is_data_file(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn load_snapshot(roots: &[PathBuf]) -> Result<Snapshot> {
    let mut merged = Snapshot::default();
    for path in list_files(roots)? {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let loaded = Snapshot::from_json(&raw)
            .with_context(|| format!("failed to load {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            goals = loaded.goals.len(),
            tasks = loaded.tasks.len(),
            "loaded data file"
        );
        merged.merge(loaded);
    }
    tracing::info!(
        goals = merged.goals.len(),
        tasks = merged.tasks.len(),
        "snapshot reloaded"
    );
    Ok(merged)
}

fn touches_data_file(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|path| is_data_file(path))
}

fn is_data_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
