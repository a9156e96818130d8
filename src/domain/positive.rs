/// Freeform habit entities
///
/// A freeform habit is logged whenever the user likes, optionally with a
/// time-of-day metric sample. Timestamps on this side are epoch
/// milliseconds, which is the persisted wire format for this store.

use serde::{Deserialize, Serialize};

use crate::domain::metric::{HabitMetricConfig, TimeOfDayMetric};
use crate::domain::{HabitId, HabitStatus, LogId};

/// A tracked activity logged freely, with optional quantitative metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositiveHabit {
    pub id: HabitId,
    pub name: String,
    /// Creation instant, epoch milliseconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<HabitMetricConfig>,
    #[serde(default)]
    pub status: HabitStatus,
}

/// One freeform log entry, optionally carrying a metric sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositiveHabitLog {
    pub id: LogId,
    pub habit_id: HabitId,
    /// Log instant, epoch milliseconds; may be explicitly backdated
    pub ts: i64,
    pub note: String,
    /// Present only when the owning habit declares a matching metric kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<TimeOfDayMetric>,
}

/// Flattened habit/log sequences, the shape used by export and replace
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositiveDocument {
    pub habits: Vec<PositiveHabit>,
    pub logs: Vec<PositiveHabitLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_wire_shape() {
        let log = PositiveHabitLog {
            id: LogId::from("l1"),
            habit_id: HabitId::from("h1"),
            ts: 1000,
            note: "done".to_string(),
            metric: None,
        };
        let value = serde_json::to_value(&log).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("habitId").unwrap(), "h1");
        assert_eq!(obj.get("ts").unwrap(), 1000);
        assert!(!obj.contains_key("metric"));
    }

    #[test]
    fn test_habit_status_defaults_on_deserialize() {
        let habit: PositiveHabit =
            serde_json::from_value(serde_json::json!({
                "id": "p",
                "name": "walk",
                "createdAt": 1
            }))
            .unwrap();
        assert_eq!(habit.status, HabitStatus::Active);
        assert!(habit.metric.is_none());
    }
}
