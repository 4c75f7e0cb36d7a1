use chrono::{DateTime, NaiveDate, Utc};

use crate::datetime::{days_until, due_label, is_due_soon};
use crate::habits;
use crate::state::AppState;
use crate::task::{Priority, Task};

/// Summary metrics, recomputed from state on demand — nothing here is
/// cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub due_soon: usize,
    pub completed: usize,
    pub total: usize,
    pub goals_met: usize,
    pub habit_total: usize,
    pub completion_pct: u32,
}

pub fn summary(state: &AppState, now: DateTime<Utc>) -> Summary {
    let due_soon = state
        .tasks
        .iter()
        .filter(|task| !task.completed && is_due_soon(task.due, now))
        .count();
    let completed = state.tasks.iter().filter(|task| task.completed).count();
    let total = state.tasks.len();

    let completion_pct = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };

    Summary {
        due_soon,
        completed,
        total,
        goals_met: habits::goals_met(state),
        habit_total: state.habits.len(),
        completion_pct,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingRow {
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub due: NaiveDate,
    pub due_label: String,
}

/// Incomplete due-soon tasks, chronological.
pub fn upcoming(state: &AppState, now: DateTime<Utc>) -> Vec<UpcomingRow> {
    let mut soon: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|task| !task.completed && is_due_soon(task.due, now))
        .collect();
    soon.sort_by_key(|task| task.due);

    soon.into_iter()
        .map(|task| UpcomingRow {
            title: task.title.clone(),
            category: task.category.clone(),
            priority: task.priority,
            due: task.due,
            due_label: due_label(days_until(task.due, now)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Days, TimeZone, Utc};
    use tempfile::tempdir;

    use super::{summary, upcoming};
    use crate::datastore::DataStore;
    use crate::datetime::project_today;
    use crate::state::AppState;
    use crate::task::Priority;
    use crate::tasks::{self, TaskDraft};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).single().expect("valid now")
    }

    fn harness() -> (AppState, DataStore, tempfile::TempDir) {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        (AppState::default(), store, temp)
    }

    fn add_task(state: &mut AppState, store: &DataStore, title: &str, days_ahead: u64) {
        let due = project_today(now())
            .checked_add_days(Days::new(days_ahead))
            .expect("due date");
        tasks::create(
            state,
            store,
            TaskDraft {
                title: title.to_string(),
                due: Some(due),
                priority: Priority::High,
                category: "study".to_string(),
                ..TaskDraft::default()
            },
            now(),
        )
        .expect("create");
    }

    #[test]
    fn empty_state_is_all_zeroes() {
        let state = AppState::default();
        let s = summary(&state, now());
        assert_eq!(s.due_soon, 0);
        assert_eq!(s.total, 0);
        assert_eq!(s.completion_pct, 0);
        assert!(upcoming(&state, now()).is_empty());
    }

    #[test]
    fn completing_a_due_soon_task_moves_the_counters() {
        let (mut state, store, _temp) = harness();
        add_task(&mut state, &store, "Read chapter", 1);

        let before = summary(&state, now());
        assert_eq!(before.due_soon, 1);
        assert_eq!(before.completed, 0);
        assert_eq!(before.completion_pct, 0);

        let id = state.tasks[0].id;
        tasks::toggle_completed(&mut state, &store, id).expect("toggle");

        let after = summary(&state, now());
        assert_eq!(after.due_soon, 0);
        assert_eq!(after.completed, 1);
        assert_eq!(after.completion_pct, 100);
    }

    #[test]
    fn completion_percentage_rounds() {
        let (mut state, store, _temp) = harness();
        add_task(&mut state, &store, "one", 1);
        add_task(&mut state, &store, "two", 1);
        add_task(&mut state, &store, "three", 1);

        let id = state.tasks[0].id;
        tasks::toggle_completed(&mut state, &store, id).expect("toggle");

        assert_eq!(summary(&state, now()).completion_pct, 33);
    }

    #[test]
    fn upcoming_is_chronological_with_labels() {
        let (mut state, store, _temp) = harness();
        add_task(&mut state, &store, "day after", 2);
        add_task(&mut state, &store, "due today", 0);
        add_task(&mut state, &store, "too far out", 5);

        let list = upcoming(&state, now());
        let titles: Vec<&str> = list.iter().map(|row| row.title.as_str()).collect();
        assert_eq!(titles, vec!["due today", "day after"]);
        assert_eq!(list[0].due_label, "today");
        assert_eq!(list[1].due_label, "in 2 days");
    }

    #[test]
    fn habit_goals_feed_the_summary() {
        let (mut state, store, _temp) = harness();
        crate::habits::create(&mut state, &store, "Stretch", 1, now()).expect("create");
        let id = state.habits[0].id;
        crate::habits::toggle_day(&mut state, &store, id, 3).expect("toggle");

        let s = summary(&state, now());
        assert_eq!(s.goals_met, 1);
        assert_eq!(s.habit_total, 1);
    }
}
