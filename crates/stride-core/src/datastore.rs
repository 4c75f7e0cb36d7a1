use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::habit::Habit;
use crate::state::{AppState, Theme};
use crate::task::Task;

/// Persists the four durable slices as independent entries under the data
/// directory: tasks and habits as JSON lines, favorites as one JSON array,
/// theme as a plain string. There is no cross-entry transaction.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub habits_path: PathBuf,
    pub favorites_path: PathBuf,
    pub theme_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        let habits_path = data_dir.join("habits.data");
        let favorites_path = data_dir.join("favorites.data");
        let theme_path = data_dir.join("theme.data");

        for path in [&tasks_path, &habits_path, &favorites_path, &theme_path] {
            if !path.exists() {
                fs::write(path, "")?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            habits_path,
            favorites_path,
            theme_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_habits(&self) -> anyhow::Result<Vec<Habit>> {
        load_jsonl(&self.habits_path).context("failed to load habits.data")
    }

    /// Unparsable favorites are treated as absent, not fatal.
    #[tracing::instrument(skip(self))]
    pub fn load_favorites(&self) -> anyhow::Result<Vec<u64>> {
        let raw = match fs::read_to_string(&self.favorites_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading {}", self.favorites_path.display()));
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(vec![]);
        }

        match serde_json::from_str(trimmed) {
            Ok(favorites) => Ok(favorites),
            Err(err) => {
                warn!(
                    file = %self.favorites_path.display(),
                    error = %err,
                    "unparsable favorites entry; starting empty"
                );
                Ok(vec![])
            }
        }
    }

    /// Unknown or empty stored themes fall back to the default.
    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> anyhow::Result<Theme> {
        let raw = match fs::read_to_string(&self.theme_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Theme::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading {}", self.theme_path.display()));
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Theme::default());
        }

        match trimmed.parse() {
            Ok(theme) => Ok(theme),
            Err(err) => {
                warn!(
                    file = %self.theme_path.display(),
                    error = %err,
                    "unparsable theme entry; using default"
                );
                Ok(Theme::default())
            }
        }
    }

    /// Assembles the in-memory state from the four entries. Selection state
    /// always starts from defaults; it is never persisted.
    #[tracing::instrument(skip(self))]
    pub fn load_state(&self) -> anyhow::Result<AppState> {
        Ok(AppState {
            tasks: self.load_tasks()?,
            habits: self.load_habits()?,
            favorites: self.load_favorites()?,
            theme: self.load_theme()?,
            ..AppState::default()
        })
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    #[tracing::instrument(skip(self, habits))]
    pub fn save_habits(&self, habits: &[Habit]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.habits_path, habits).context("failed to save habits.data")
    }

    #[tracing::instrument(skip(self, favorites))]
    pub fn save_favorites(&self, favorites: &[u64]) -> anyhow::Result<()> {
        let payload = serde_json::to_string(favorites)?;
        fs::write(&self.favorites_path, payload)
            .with_context(|| format!("failed writing {}", self.favorites_path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        fs::write(&self.theme_path, theme.as_str())
            .with_context(|| format!("failed writing {}", self.theme_path.display()))
    }

    /// Overwrites all four entries from the current state.
    #[tracing::instrument(skip(self, state))]
    pub fn save_all(&self, state: &AppState) -> anyhow::Result<()> {
        self.save_tasks(&state.tasks)?;
        self.save_habits(&state.habits)?;
        self.save_favorites(&state.favorites)?;
        self.save_theme(state.theme)?;
        Ok(())
    }

    /// Truncates the three mutable entries. Theme is deliberately untouched.
    #[tracing::instrument(skip(self))]
    pub fn reset(&self) -> anyhow::Result<()> {
        for path in [&self.tasks_path, &self.habits_path, &self.favorites_path] {
            fs::write(path, "")
                .with_context(|| format!("failed clearing {}", path.display()))?;
        }
        info!("cleared tasks, habits and favorites");
        Ok(())
    }
}

/// Loads a JSON-lines file. A malformed line is skipped with a warning; a
/// missing file is an empty collection. Corruption is never fatal.
#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(err.into()),
    };
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str(trimmed) {
            Ok(record) => out.push(record),
            Err(err) => {
                warn!(
                    file = %path.display(),
                    line = idx + 1,
                    error = %err,
                    "skipping malformed record"
                );
            }
        }
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
