use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::compact_stamp_serde;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Rank used for descending-priority sort: high=3, medium=2, low=1.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(anyhow!("unknown priority: {other} (expected low, medium or high)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub due: NaiveDate,

    pub priority: Priority,

    pub category: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(with = "compact_stamp_serde")]
    pub created: DateTime<Utc>,
}

impl Task {
    pub fn new(
        title: String,
        due: NaiveDate,
        priority: Priority,
        category: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description: String::new(),
            due,
            priority,
            category,
            completed: false,
            created: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Priority;

    #[test]
    fn priority_ranks_descend_from_high() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn priority_parses_names_and_abbreviations() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("MED".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("l".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
