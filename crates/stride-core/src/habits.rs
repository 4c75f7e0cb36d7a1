use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::datastore::DataStore;
use crate::datetime::WEEK_DAYS;
use crate::habit::{Habit, WEEK_LEN};
use crate::state::AppState;

#[derive(Debug)]
pub enum HabitOutcome {
    Created(Uuid),
    Toggled { id: Uuid, day: usize, done: bool },
    Deleted(Uuid),
    /// Empty name or goal outside 1..=7; silently no-ops.
    Rejected,
    /// Day index outside 0..=6.
    InvalidDay,
    NotFound,
}

#[instrument(skip(state, store, now))]
pub fn create(
    state: &mut AppState,
    store: &DataStore,
    name: &str,
    goal: u8,
    now: DateTime<Utc>,
) -> anyhow::Result<HabitOutcome> {
    let name = name.trim();
    if name.is_empty() || goal == 0 || usize::from(goal) > WEEK_LEN {
        debug!(goal, "habit create rejected");
        return Ok(HabitOutcome::Rejected);
    }

    let habit = Habit::new(name.to_string(), goal, now);
    let id = habit.id;
    state.habits.push(habit);
    store.save_habits(&state.habits)?;

    info!(%id, count = state.habits.len(), "habit created");
    Ok(HabitOutcome::Created(id))
}

/// Flips exactly one day of one habit's week.
#[instrument(skip(state, store), fields(id = %id))]
pub fn toggle_day(
    state: &mut AppState,
    store: &DataStore,
    id: Uuid,
    day: usize,
) -> anyhow::Result<HabitOutcome> {
    if day >= WEEK_LEN {
        debug!(day, "day index out of range");
        return Ok(HabitOutcome::InvalidDay);
    }
    let Some(habit) = state.habits.iter_mut().find(|habit| habit.id == id) else {
        debug!("toggle target not found");
        return Ok(HabitOutcome::NotFound);
    };

    habit.progress[day] = !habit.progress[day];
    let done = habit.progress[day];
    store.save_habits(&state.habits)?;

    info!(day, done, "habit day toggled");
    Ok(HabitOutcome::Toggled { id, day, done })
}

#[instrument(skip(state, store), fields(id = %id))]
pub fn delete(state: &mut AppState, store: &DataStore, id: Uuid) -> anyhow::Result<HabitOutcome> {
    let before = state.habits.len();
    state.habits.retain(|habit| habit.id != id);
    if state.habits.len() == before {
        debug!("delete target not found");
        return Ok(HabitOutcome::NotFound);
    }

    store.save_habits(&state.habits)?;
    info!("habit deleted");
    Ok(HabitOutcome::Deleted(id))
}

/// Habits whose done-count meets their goal this week. Always a snapshot of
/// the current week; nothing accumulates across weeks.
pub fn goals_met(state: &AppState) -> usize {
    state.habits.iter().filter(|habit| habit.goal_met()).count()
}

/// `(met, total)` for the weekly summary line.
pub fn weekly_summary(state: &AppState) -> (usize, usize) {
    (goals_met(state), state.habits.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayMark {
    pub label: &'static str,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitRow {
    pub id: Uuid,
    pub name: String,
    pub goal: u8,
    pub days: Vec<DayMark>,
    pub days_done: usize,
    pub achieved: bool,
}

pub fn rows(state: &AppState) -> Vec<HabitRow> {
    state
        .habits
        .iter()
        .map(|habit| HabitRow {
            id: habit.id,
            name: habit.name.clone(),
            goal: habit.goal,
            days: habit
                .progress
                .iter()
                .zip(WEEK_DAYS)
                .map(|(done, label)| DayMark { label, done: *done })
                .collect(),
            days_done: habit.days_done(),
            achieved: habit.goal_met(),
        })
        .collect()
}
