/// Goal-mode habit entities
///
/// A goal-mode habit tracks the interval between logs against an
/// adaptive target (`goal_seconds`) and counts consecutive on-time logs
/// as a streak. The entities here are plain data; the adaptive algorithm
/// lives in the store that owns them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HabitId, HabitStatus, LogId, DEFAULT_GOAL_SECONDS};

/// A tracked activity with an adaptive target interval and streak counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Target interval between logs, always within [3600, 2592000]
    pub goal_seconds: u32,
    /// Count of consecutive goal-meeting logs
    pub streak: u32,
    /// Cache of the most recent log timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: HabitStatus,
}

impl Habit {
    /// Create a fresh habit with default goal and no streak
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: HabitId::new(),
            name: name.into(),
            created_at,
            goal_seconds: DEFAULT_GOAL_SECONDS,
            streak: 0,
            last_logged_at: None,
            status: HabitStatus::Active,
        }
    }
}

/// One recorded occurrence of a goal-mode habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: LogId,
    pub habit_id: HabitId,
    pub at: DateTime<Utc>,
    /// Elapsed seconds since the previous log; absent on the first log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Persisted/exported document shape for the goal-mode store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NegativeDocument {
    pub habits: Vec<Habit>,
    pub logs: Vec<Log>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_habit_defaults() {
        let habit = Habit::new("bedtime scroll", Utc::now());
        assert_eq!(habit.goal_seconds, DEFAULT_GOAL_SECONDS);
        assert_eq!(habit.streak, 0);
        assert_eq!(habit.status, HabitStatus::Active);
        assert!(habit.last_logged_at.is_none());
    }

    #[test]
    fn test_habit_wire_shape() {
        let habit = Habit::new("test", Utc::now());
        let value = serde_json::to_value(&habit).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("goalSeconds"));
        assert!(obj.contains_key("createdAt"));
        assert_eq!(obj.get("status").unwrap(), "active");
        // optional cache field is omitted until populated
        assert!(!obj.contains_key("lastLoggedAt"));
    }
}
