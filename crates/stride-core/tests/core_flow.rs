use chrono::{Days, Utc};
use stride_core::dashboard;
use stride_core::datastore::DataStore;
use stride_core::datetime::project_today;
use stride_core::state::Theme;
use stride_core::task::Priority;
use stride_core::tasks::{self, TaskDraft, TaskOutcome};
use stride_core::{habits, resources};
use tempfile::tempdir;

#[test]
fn create_complete_and_dashboard_flow() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut state = store.load_state().expect("load state");
    assert!(state.tasks.is_empty());

    let now = Utc::now();
    let tomorrow = project_today(now)
        .checked_add_days(Days::new(1))
        .expect("tomorrow");

    let outcome = tasks::create(
        &mut state,
        &store,
        TaskDraft {
            title: "Read".to_string(),
            due: Some(tomorrow),
            priority: Priority::High,
            category: "Study".to_string(),
            ..TaskDraft::default()
        },
        now,
    )
    .expect("create task");
    let TaskOutcome::Created(id) = outcome else {
        panic!("expected task creation");
    };

    let summary = dashboard::summary(&state, now);
    assert_eq!(summary.due_soon, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.completion_pct, 0);

    // A fresh process sees the persisted task.
    let reloaded = store.load_state().expect("reload state");
    assert_eq!(reloaded.tasks.len(), 1);
    assert_eq!(reloaded.tasks[0].id, id);
    assert_eq!(reloaded.tasks[0].category, "Study");

    tasks::toggle_completed(&mut state, &store, id).expect("complete");
    let summary = dashboard::summary(&state, now);
    assert_eq!(summary.due_soon, 0);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.completion_pct, 100);
}

#[test]
fn habit_week_survives_a_reload() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut state = store.load_state().expect("load state");

    habits::create(&mut state, &store, "Flashcards", 2, Utc::now()).expect("create habit");
    let id = state.habits[0].id;
    habits::toggle_day(&mut state, &store, id, 0).expect("toggle monday");
    habits::toggle_day(&mut state, &store, id, 4).expect("toggle friday");

    let reloaded = store.load_state().expect("reload state");
    assert_eq!(reloaded.habits.len(), 1);
    assert_eq!(reloaded.habits[0].days_done(), 2);
    assert!(reloaded.habits[0].goal_met());
    assert_eq!(habits::goals_met(&reloaded), 1);
}

#[test]
fn favorites_and_theme_survive_reset_rules() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut state = store.load_state().expect("load state");

    resources::toggle_favorite(&mut state, &store, 42).expect("favorite");
    state.theme = Theme::Dark;
    store.save_theme(state.theme).expect("save theme");

    let reloaded = store.load_state().expect("reload state");
    assert_eq!(reloaded.favorites, vec![42]);
    assert_eq!(reloaded.theme, Theme::Dark);

    store.reset().expect("reset");
    let after_reset = store.load_state().expect("load after reset");
    assert!(after_reset.tasks.is_empty());
    assert!(after_reset.habits.is_empty());
    assert!(after_reset.favorites.is_empty());
    assert_eq!(after_reset.theme, Theme::Dark, "reset leaves the theme alone");
}

#[test]
fn resource_list_loads_from_a_file_source() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut state = store.load_state().expect("load state");

    let source = temp.path().join("resources.json");
    std::fs::write(
        &source,
        r#"[
            {"id": 1, "title": "Pomodoro timers", "description": "Focus sprints", "category": "technique", "link": "https://example.com/1"},
            {"id": 2, "title": "Citation guide", "description": "APA and MLA", "category": "writing", "link": "https://example.com/2"}
        ]"#,
    )
    .expect("write source");

    resources::ensure_loaded(&mut state, &source.to_string_lossy()).expect("load resources");
    assert_eq!(state.resources.items().len(), 2);

    resources::toggle_favorite(&mut state, &store, 2).expect("favorite");
    state.selection.favorites_only = true;
    let rows = resources::rows(&state, &resources::ResourceQuery::default());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Citation guide");
    assert!(rows[0].favorite);
}
