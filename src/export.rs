/// Versioned export and all-or-nothing import
///
/// Export builds a combined snapshot of both stores. Import dispatches
/// on the payload version and is strictly all-or-nothing: every section
/// must validate before either store is touched, and a failure leaves
/// both stores exactly as they were. This is the loud counterpart to the
/// tolerant per-record sanitization in `storage::migrate`. A hand-edited
/// file should be rejected wholesale, not silently trimmed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{NegativeDocument, PositiveDocument};
use crate::storage::migrate;
use crate::stores::{NegativeHabitStore, PositiveHabitStore};

/// Current export schema version
pub const EXPORT_VERSION: u8 = 2;

/// Combined snapshot of both stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayloadV2 {
    pub version: u8,
    /// Snapshot instant, epoch milliseconds
    pub exported_at: i64,
    pub negative: NegativeDocument,
    pub positive: PositiveDocument,
}

/// Build a version-2 snapshot from the live state of both stores
pub fn export_all(
    negative: &NegativeHabitStore,
    positive: &PositiveHabitStore,
    now_ms: i64,
) -> ExportPayloadV2 {
    ExportPayloadV2 {
        version: EXPORT_VERSION,
        exported_at: now_ms,
        negative: negative.document(),
        positive: positive.document(),
    }
}

/// Validate and apply a payload; returns false (zero mutation) on any failure
pub fn import_all(
    negative: &mut NegativeHabitStore,
    positive: &mut PositiveHabitStore,
    payload: &Value,
    now: DateTime<Utc>,
) -> bool {
    if !payload.is_object() {
        return false;
    }
    match payload.get("version").and_then(Value::as_i64) {
        Some(2) => {
            let (Some(neg_section), Some(pos_section)) =
                (payload.get("negative"), payload.get("positive"))
            else {
                return false;
            };
            // both sections must pass before either store is replaced
            if !validate_negative_strict(neg_section)
                || !validate_positive_strict(pos_section)
            {
                return false;
            }
            negative.replace(migrate::migrate_negative(neg_section, now));
            positive.replace(migrate::sanitize_positive_import(pos_section));
            true
        }
        Some(1) => {
            // legacy negative-only payload: the freeform store is untouched
            if !validate_negative_strict(payload) {
                return false;
            }
            negative.replace(migrate::migrate_negative(payload, now));
            true
        }
        _ => false,
    }
}

/// Strict shape check for a goal-mode `{habits, logs}` section
pub fn validate_negative_strict(section: &Value) -> bool {
    let Some(obj) = section.as_object() else {
        return false;
    };
    let (Some(habits), Some(logs)) = (
        obj.get("habits").and_then(Value::as_array),
        obj.get("logs").and_then(Value::as_array),
    ) else {
        return false;
    };
    habits.iter().all(valid_negative_habit) && logs.iter().all(valid_negative_log)
}

fn valid_negative_habit(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    required_string(obj.get("id"))
        && required_string(obj.get("name"))
        && required_string(obj.get("createdAt"))
        && optional_number(obj.get("goalSeconds"))
        && optional_number(obj.get("streak"))
        && optional_string(obj.get("lastLoggedAt"))
        && optional_string(obj.get("status"))
}

fn valid_negative_log(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    required_string(obj.get("habitId"))
        && required_string(obj.get("at"))
        && optional_string(obj.get("id"))
        && optional_number(obj.get("deltaSeconds"))
        && optional_string(obj.get("note"))
}

/// Strict shape check for a freeform `{habits, logs}` section, including
/// optional metric-config and metric-sample shapes
pub fn validate_positive_strict(section: &Value) -> bool {
    let Some(obj) = section.as_object() else {
        return false;
    };
    let (Some(habits), Some(logs)) = (
        obj.get("habits").and_then(Value::as_array),
        obj.get("logs").and_then(Value::as_array),
    ) else {
        return false;
    };
    habits.iter().all(valid_positive_habit) && logs.iter().all(valid_positive_log)
}

fn valid_positive_habit(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    required_string(obj.get("id"))
        && required_string(obj.get("name"))
        && obj.get("createdAt").map(Value::is_number).unwrap_or(false)
        && optional_string(obj.get("status"))
        && obj.get("metric").map(valid_metric_config).unwrap_or(true)
}

fn valid_positive_log(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    required_string(obj.get("id"))
        && required_string(obj.get("habitId"))
        && obj.get("ts").map(Value::is_number).unwrap_or(false)
        && required_string(obj.get("note"))
        && obj.get("metric").map(valid_metric_sample).unwrap_or(true)
}

fn valid_metric_config(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    obj.get("kind").and_then(Value::as_str) == Some("timeOfDay")
        && optional_number(obj.get("wrapHour"))
        && obj
            .get("lowerIsBetter")
            .map(Value::is_boolean)
            .unwrap_or(true)
}

fn valid_metric_sample(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    obj.get("kind").and_then(Value::as_str) == Some("timeOfDay")
        && obj
            .get("minutesSinceMidnight")
            .map(Value::is_number)
            .unwrap_or(false)
        && optional_number(obj.get("normalizedMinutes"))
        && optional_string(obj.get("display"))
        && optional_number(obj.get("tzOffsetMin"))
}

fn required_string(value: Option<&Value>) -> bool {
    value.map(Value::is_string).unwrap_or(false)
}

fn optional_string(value: Option<&Value>) -> bool {
    value.map(Value::is_string).unwrap_or(true)
}

fn optional_number(value: Option<&Value>) -> bool {
    value.map(Value::is_number).unwrap_or(true)
}
