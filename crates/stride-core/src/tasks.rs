use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::datastore::DataStore;
use crate::datetime::{days_until, due_label};
use crate::state::{AppState, SortKey, StatusFilter};
use crate::task::{Priority, Task};

/// Input to the validated create/update path. `due` is `None` when the user
/// supplied nothing; validation turns that into a field error.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub category: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due: None,
            priority: Priority::Medium,
            category: String::new(),
        }
    }
}

/// Per-field validation messages, reported next to the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<String>,
    pub due: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.due.is_none()
    }
}

#[derive(Debug)]
pub enum TaskOutcome {
    Created(Uuid),
    Updated(Uuid),
    Toggled { id: Uuid, completed: bool },
    Deleted(Uuid),
    /// Validation failed; nothing was mutated.
    Invalid(FieldErrors),
    /// Quick add with a missing field; silently no-ops.
    Rejected,
    NotFound,
}

fn validate(draft: &TaskDraft) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if draft.title.trim().is_empty() {
        errors.title = Some("a task title is required".to_string());
    }
    if draft.due.is_none() {
        errors.due = Some("a due date is required".to_string());
    }
    errors
}

#[instrument(skip(state, store, draft, now))]
pub fn create(
    state: &mut AppState,
    store: &DataStore,
    draft: TaskDraft,
    now: DateTime<Utc>,
) -> anyhow::Result<TaskOutcome> {
    let errors = validate(&draft);
    if !errors.is_empty() {
        debug!(?errors, "task create rejected by validation");
        return Ok(TaskOutcome::Invalid(errors));
    }
    let Some(due) = draft.due else {
        return Ok(TaskOutcome::Invalid(errors));
    };

    let mut task = Task::new(
        draft.title.trim().to_string(),
        due,
        draft.priority,
        draft.category.trim().to_string(),
        now,
    );
    task.description = draft.description.trim().to_string();
    let id = task.id;

    state.tasks.push(task);
    store.save_tasks(&state.tasks)?;

    info!(%id, count = state.tasks.len(), "task created");
    Ok(TaskOutcome::Created(id))
}

/// The quick-add path: no per-field reporting, fixed medium priority, caller
/// supplies the default category.
#[instrument(skip(state, store, now))]
pub fn quick_create(
    state: &mut AppState,
    store: &DataStore,
    title: &str,
    due: Option<NaiveDate>,
    category: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<TaskOutcome> {
    let title = title.trim();
    let Some(due) = due else {
        debug!("quick add missing due date");
        return Ok(TaskOutcome::Rejected);
    };
    if title.is_empty() {
        debug!("quick add missing title");
        return Ok(TaskOutcome::Rejected);
    }

    let task = Task::new(
        title.to_string(),
        due,
        Priority::Medium,
        category.to_string(),
        now,
    );
    let id = task.id;

    state.tasks.push(task);
    store.save_tasks(&state.tasks)?;

    info!(%id, "task quick-added");
    Ok(TaskOutcome::Created(id))
}

/// Replaces an existing task's editable fields. `completed` and `created`
/// are always carried forward from the prior record.
#[instrument(skip(state, store, draft), fields(id = %id))]
pub fn update(
    state: &mut AppState,
    store: &DataStore,
    id: Uuid,
    draft: TaskDraft,
) -> anyhow::Result<TaskOutcome> {
    let Some(idx) = state.tasks.iter().position(|task| task.id == id) else {
        debug!("update target not found");
        return Ok(TaskOutcome::NotFound);
    };

    let errors = validate(&draft);
    if !errors.is_empty() {
        debug!(?errors, "task update rejected by validation");
        return Ok(TaskOutcome::Invalid(errors));
    }
    let Some(due) = draft.due else {
        return Ok(TaskOutcome::Invalid(errors));
    };

    let (completed, created) = {
        let prior = &state.tasks[idx];
        (prior.completed, prior.created)
    };
    state.tasks[idx] = Task {
        id,
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        due,
        priority: draft.priority,
        category: draft.category.trim().to_string(),
        completed,
        created,
    };
    store.save_tasks(&state.tasks)?;

    info!("task updated");
    Ok(TaskOutcome::Updated(id))
}

#[instrument(skip(state, store), fields(id = %id))]
pub fn toggle_completed(
    state: &mut AppState,
    store: &DataStore,
    id: Uuid,
) -> anyhow::Result<TaskOutcome> {
    let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) else {
        debug!("toggle target not found");
        return Ok(TaskOutcome::NotFound);
    };

    task.completed = !task.completed;
    let completed = task.completed;
    store.save_tasks(&state.tasks)?;

    info!(completed, "task completion toggled");
    Ok(TaskOutcome::Toggled { id, completed })
}

#[instrument(skip(state, store), fields(id = %id))]
pub fn delete(state: &mut AppState, store: &DataStore, id: Uuid) -> anyhow::Result<TaskOutcome> {
    let before = state.tasks.len();
    state.tasks.retain(|task| task.id != id);
    if state.tasks.len() == before {
        debug!("delete target not found");
        return Ok(TaskOutcome::NotFound);
    }

    store.save_tasks(&state.tasks)?;
    info!("task deleted");
    Ok(TaskOutcome::Deleted(id))
}

/// One row of the derived task view, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: String,
    pub completed: bool,
    pub due: NaiveDate,
    pub days_until: i64,
    pub due_label: String,
    pub past_due: bool,
}

/// The filter + sort pipeline: status filter, then exact category match,
/// then a stable sort by the selected key. Works on a copy; ties keep the
/// collection's original order.
pub fn rows(state: &AppState, now: DateTime<Utc>) -> Vec<TaskRow> {
    let selection = &state.selection;
    let mut visible: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|task| match selection.status {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        })
        .filter(|task| {
            selection
                .category
                .as_deref()
                .map(|category| task.category == category)
                .unwrap_or(true)
        })
        .collect();

    match selection.sort {
        SortKey::DueDate => visible.sort_by_key(|task| task.due),
        SortKey::Priority => visible.sort_by_key(|task| Reverse(task.priority.rank())),
        SortKey::Title => {
            visible.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        }
    }

    visible
        .into_iter()
        .map(|task| {
            let days = days_until(task.due, now);
            TaskRow {
                id: task.id,
                title: task.title.clone(),
                description: task.description.clone(),
                priority: task.priority,
                category: task.category.clone(),
                completed: task.completed,
                due: task.due,
                days_until: days,
                due_label: due_label(days),
                past_due: days < 0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use super::{TaskDraft, TaskOutcome, create, delete, quick_create, rows, toggle_completed, update};
    use crate::datastore::DataStore;
    use crate::state::{AppState, SortKey, StatusFilter};
    use crate::task::Priority;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).single().expect("valid now")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn draft(title: &str, due: Option<NaiveDate>, priority: Priority) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            due,
            priority,
            category: "study".to_string(),
            ..TaskDraft::default()
        }
    }

    fn harness() -> (AppState, DataStore, tempfile::TempDir) {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        (AppState::default(), store, temp)
    }

    #[test]
    fn create_rejects_missing_fields_without_mutating() {
        let (mut state, store, _temp) = harness();

        let outcome = create(&mut state, &store, draft("  ", None, Priority::Low), now())
            .expect("create");
        let TaskOutcome::Invalid(errors) = outcome else {
            panic!("expected validation failure");
        };
        assert!(errors.title.is_some());
        assert!(errors.due.is_some());
        assert!(state.tasks.is_empty());
        assert!(store.load_tasks().expect("load").is_empty());
    }

    #[test]
    fn quick_add_rejects_silently() {
        let (mut state, store, _temp) = harness();

        let outcome = quick_create(&mut state, &store, "Skim notes", None, "study", now())
            .expect("quick create");
        assert!(matches!(outcome, TaskOutcome::Rejected));
        assert!(state.tasks.is_empty());

        let outcome = quick_create(
            &mut state,
            &store,
            "Skim notes",
            Some(date(2026, 3, 11)),
            "study",
            now(),
        )
        .expect("quick create");
        assert!(matches!(outcome, TaskOutcome::Created(_)));
        assert_eq!(state.tasks[0].priority, Priority::Medium);
        assert_eq!(state.tasks[0].category, "study");
    }

    #[test]
    fn update_preserves_identity_completion_and_creation_stamp() {
        let (mut state, store, _temp) = harness();

        create(
            &mut state,
            &store,
            draft("Original", Some(date(2026, 3, 12)), Priority::Low),
            now(),
        )
        .expect("create");
        let id = state.tasks[0].id;
        let created = state.tasks[0].created;
        toggle_completed(&mut state, &store, id).expect("toggle");

        let outcome = update(
            &mut state,
            &store,
            id,
            draft("Renamed", Some(date(2026, 3, 20)), Priority::High),
        )
        .expect("update");
        assert!(matches!(outcome, TaskOutcome::Updated(_)));

        let task = &state.tasks[0];
        assert_eq!(task.id, id);
        assert_eq!(task.created, created);
        assert!(task.completed, "completion survives an edit");
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn update_unknown_id_is_a_silent_no_op() {
        let (mut state, store, _temp) = harness();
        let outcome = update(
            &mut state,
            &store,
            uuid::Uuid::new_v4(),
            draft("Ghost", Some(date(2026, 3, 12)), Priority::Low),
        )
        .expect("update");
        assert!(matches!(outcome, TaskOutcome::NotFound));
        assert!(state.tasks.is_empty());
    }

    #[test]
    fn toggle_twice_round_trips() {
        let (mut state, store, _temp) = harness();
        create(
            &mut state,
            &store,
            draft("Flip me", Some(date(2026, 3, 12)), Priority::Low),
            now(),
        )
        .expect("create");
        let id = state.tasks[0].id;

        toggle_completed(&mut state, &store, id).expect("first toggle");
        assert!(state.tasks[0].completed);
        toggle_completed(&mut state, &store, id).expect("second toggle");
        assert!(!state.tasks[0].completed);
    }

    #[test]
    fn delete_removes_and_persists() {
        let (mut state, store, _temp) = harness();
        create(
            &mut state,
            &store,
            draft("Doomed", Some(date(2026, 3, 12)), Priority::Low),
            now(),
        )
        .expect("create");
        let id = state.tasks[0].id;

        let outcome = delete(&mut state, &store, id).expect("delete");
        assert!(matches!(outcome, TaskOutcome::Deleted(_)));
        assert!(state.tasks.is_empty());
        assert!(store.load_tasks().expect("load").is_empty());
    }

    #[test]
    fn priority_sort_descends_regardless_of_insertion_order() {
        let (mut state, store, _temp) = harness();
        let due = Some(date(2026, 3, 15));
        for (title, priority) in [
            ("low one", Priority::Low),
            ("high one", Priority::High),
            ("medium one", Priority::Medium),
        ] {
            create(&mut state, &store, draft(title, due, priority), now()).expect("create");
        }

        state.selection.sort = SortKey::Priority;
        let ordered: Vec<Priority> = rows(&state, now()).iter().map(|row| row.priority).collect();
        assert_eq!(ordered, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn due_date_sort_is_chronological_not_insertion_order() {
        let (mut state, store, _temp) = harness();
        create(
            &mut state,
            &store,
            draft("later", Some(date(2026, 4, 1)), Priority::Medium),
            now(),
        )
        .expect("create");
        create(
            &mut state,
            &store,
            draft("sooner", Some(date(2026, 3, 11)), Priority::Medium),
            now(),
        )
        .expect("create");

        let titles: Vec<String> = rows(&state, now()).iter().map(|row| row.title.clone()).collect();
        assert_eq!(titles, vec!["sooner".to_string(), "later".to_string()]);
    }

    #[test]
    fn status_and_category_filters_compose() {
        let (mut state, store, _temp) = harness();
        let due = Some(date(2026, 3, 15));
        create(&mut state, &store, draft("study task", due, Priority::Low), now())
            .expect("create");
        let mut other = draft("errand", due, Priority::Low);
        other.category = "errands".to_string();
        create(&mut state, &store, other, now()).expect("create");
        let done_id = state.tasks[0].id;
        toggle_completed(&mut state, &store, done_id).expect("toggle");

        state.selection.status = StatusFilter::Active;
        state.selection.category = Some("errands".to_string());
        let view = rows(&state, now());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "errand");

        state.selection.status = StatusFilter::Completed;
        state.selection.category = None;
        let view = rows(&state, now());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "study task");
    }

    #[test]
    fn rows_carry_due_labels() {
        let (mut state, store, _temp) = harness();
        let today = crate::datetime::project_today(now());
        let tomorrow = today.checked_add_days(Days::new(1)).expect("tomorrow");
        create(
            &mut state,
            &store,
            draft("due tomorrow", Some(tomorrow), Priority::Medium),
            now(),
        )
        .expect("create");

        let view = rows(&state, now());
        assert_eq!(view[0].due_label, "tomorrow");
        assert!(!view[0].past_due);
    }
}
