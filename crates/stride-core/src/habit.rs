use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::compact_stamp_serde;

/// Days tracked per habit; progress index 0 is Monday.
pub const WEEK_LEN: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,

    pub name: String,

    pub goal: u8,

    pub progress: [bool; WEEK_LEN],

    #[serde(with = "compact_stamp_serde")]
    pub created: DateTime<Utc>,
}

impl Habit {
    pub fn new(name: String, goal: u8, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            goal,
            progress: [false; WEEK_LEN],
            created: now,
        }
    }

    pub fn days_done(&self) -> usize {
        self.progress.iter().filter(|done| **done).count()
    }

    /// Achieved for the week iff the done-count meets the goal.
    pub fn goal_met(&self) -> bool {
        self.days_done() >= usize::from(self.goal)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::Habit;

    #[test]
    fn new_habit_starts_with_empty_week() {
        let habit = Habit::new("Review flashcards".to_string(), 5, Utc::now());
        assert_eq!(habit.days_done(), 0);
        assert!(!habit.goal_met());
    }

    #[test]
    fn goal_met_at_exactly_goal_days() {
        let mut habit = Habit::new("Read".to_string(), 5, Utc::now());
        for day in 0..4 {
            habit.progress[day] = true;
        }
        assert!(!habit.goal_met());

        habit.progress[4] = true;
        assert!(habit.goal_met());
    }
}
