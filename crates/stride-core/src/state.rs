use anyhow::anyhow;
use uuid::Uuid;

use crate::habit::Habit;
use crate::resource::ResourceCollection;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl std::str::FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" | "open" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            other => Err(anyhow!(
                "unknown status filter: {other} (expected all, active or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DueDate,
    Priority,
    Title,
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "due" | "duedate" | "date" => Ok(SortKey::DueDate),
            "priority" | "pri" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            other => Err(anyhow!(
                "unknown sort key: {other} (expected due, priority or title)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("unknown theme: {other} (expected light or dark)")),
        }
    }
}

/// View-selection state. Only `favorites_only` outlives an invocation in
/// spirit; the rest is set from command arguments and defaults.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub status: StatusFilter,
    pub category: Option<String>,
    pub sort: SortKey,
    pub editing: Option<Uuid>,
    pub favorites_only: bool,
}

/// The whole application state, owned by the dispatcher and passed by
/// reference to managers. Never a global.
#[derive(Debug, Default)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub habits: Vec<Habit>,
    pub resources: ResourceCollection,
    pub favorites: Vec<u64>,
    pub selection: Selection,
    pub theme: Theme,
}

impl AppState {
    pub fn find_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn find_habit(&self, id: Uuid) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn is_favorite(&self, resource_id: u64) -> bool {
        self.favorites.contains(&resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{SortKey, StatusFilter, Theme};

    #[test]
    fn filter_and_sort_tokens_parse() {
        assert_eq!("active".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
        assert_eq!("done".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert_eq!("due".parse::<SortKey>().unwrap(), SortKey::DueDate);
        assert_eq!("pri".parse::<SortKey>().unwrap(), SortKey::Priority);
        assert!("oldest".parse::<SortKey>().is_err());
    }

    #[test]
    fn theme_toggle_round_trips() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().as_str(), "light");
    }
}
