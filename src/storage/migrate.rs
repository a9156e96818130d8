/// Document migration and load-path sanitization
///
/// Raw persisted documents of any known prior generation are upgraded
/// into the current in-memory shape. This path is partial-tolerant by
/// design: an individually malformed record is dropped with a diagnostic
/// while the rest of the document survives. The strict all-or-nothing
/// validation used by import lives in `export`, not here.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::domain::{
    clamp_goal_seconds, metric, Habit, HabitId, HabitStatus, Log, LogId,
    NegativeDocument, PositiveDocument, PositiveHabit, PositiveHabitLog,
    DEFAULT_GOAL_SECONDS,
};

/// Upgrade a raw goal-mode document into the current shape
///
/// Accepts either the legacy flat-array layout
/// (`[{id, name, logs: [{ts, diff}]}]`) or the current
/// `{habits, logs}` object. Anything else yields an empty document.
pub fn migrate_negative(raw: &Value, now: DateTime<Utc>) -> NegativeDocument {
    match raw {
        Value::Array(entries) => migrate_negative_legacy(entries, now),
        Value::Object(_) => sanitize_negative_current(raw, now),
        _ => {
            tracing::warn!("negative document has unknown shape, starting empty");
            NegativeDocument::default()
        }
    }
}

/// Legacy layout: habits embedded their logs, no goal/streak fields
fn migrate_negative_legacy(entries: &[Value], now: DateTime<Utc>) -> NegativeDocument {
    let mut doc = NegativeDocument::default();
    for entry in entries {
        let Some(obj) = entry.as_object() else {
            tracing::warn!("dropping malformed legacy habit: not an object");
            continue;
        };
        let (Some(id), Some(name)) = (
            obj.get("id").and_then(Value::as_str),
            obj.get("name").and_then(Value::as_str),
        ) else {
            tracing::warn!("dropping malformed legacy habit: missing id/name");
            continue;
        };

        let habit_id = HabitId::from(id);
        let mut last_logged_at = None;
        for raw_log in obj
            .get("logs")
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or(&[])
        {
            let Some(ts) = raw_log.get("ts").and_then(Value::as_i64) else {
                tracing::warn!(habit = id, "dropping malformed legacy log: bad ts");
                continue;
            };
            let Some(at) = Utc.timestamp_millis_opt(ts).single() else {
                tracing::warn!(habit = id, ts, "dropping legacy log: ts out of range");
                continue;
            };
            let delta_seconds = raw_log
                .get("diff")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite())
                .map(|ms| (ms / 1000.0).round() as i64);
            last_logged_at = Some(at);
            doc.logs.push(Log {
                id: LogId::new(),
                habit_id: habit_id.clone(),
                at,
                delta_seconds,
                note: None,
            });
        }

        doc.habits.push(Habit {
            id: habit_id,
            name: name.to_string(),
            created_at: now,
            goal_seconds: DEFAULT_GOAL_SECONDS,
            streak: 0,
            last_logged_at,
            status: HabitStatus::Active,
        });
    }
    doc
}

/// Current layout: field-level defaulting, malformed records dropped
fn sanitize_negative_current(raw: &Value, now: DateTime<Utc>) -> NegativeDocument {
    let mut doc = NegativeDocument::default();

    for entry in raw
        .get("habits")
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
    {
        match sanitize_negative_habit(entry, now) {
            Some(habit) => doc.habits.push(habit),
            None => tracing::warn!("dropping malformed negative habit record"),
        }
    }

    for entry in raw
        .get("logs")
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
    {
        let Some(log) = sanitize_negative_log(entry) else {
            tracing::warn!("dropping malformed negative log record");
            continue;
        };
        if !doc.habits.iter().any(|h| h.id == log.habit_id) {
            tracing::warn!(habit = %log.habit_id, "dropping negative log for absent habit");
            continue;
        }
        doc.logs.push(log);
    }

    doc
}

fn sanitize_negative_habit(raw: &Value, now: DateTime<Utc>) -> Option<Habit> {
    let obj = raw.as_object()?;
    let id = obj.get("id").and_then(Value::as_str)?;
    let name = obj.get("name").and_then(Value::as_str)?;
    let created_at = obj
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now);
    let goal_seconds = clamp_goal_seconds(
        obj.get("goalSeconds")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_GOAL_SECONDS as f64),
    );
    let streak = obj
        .get("streak")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u32)
        .unwrap_or(0);
    let last_logged_at = obj
        .get("lastLoggedAt")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .map(HabitStatus::sanitize)
        .unwrap_or_default();

    Some(Habit {
        id: HabitId::from(id),
        name: name.to_string(),
        created_at,
        goal_seconds,
        streak,
        last_logged_at,
        status,
    })
}

fn sanitize_negative_log(raw: &Value) -> Option<Log> {
    let obj = raw.as_object()?;
    let habit_id = obj.get("habitId").and_then(Value::as_str)?;
    // `at` orders the timeline, so an unparseable value drops the record
    let at = obj
        .get("at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(LogId::from)
        .unwrap_or_default();
    let delta_seconds = obj
        .get("deltaSeconds")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64);
    let note = obj
        .get("note")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Log {
        id,
        habit_id: HabitId::from(habit_id),
        at,
        delta_seconds,
        note,
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Sanitize a current-generation freeform document (`version: 2`)
///
/// Returns None when the payload is not a version-2 object at all; the
/// caller then treats the generation as unusable. Individual records are
/// validated field-by-field and dropped when malformed. The per-habit
/// index is never trusted from storage.
pub fn sanitize_positive_v2(raw: &Value) -> Option<PositiveDocument> {
    let obj = raw.as_object()?;
    if obj.get("version").and_then(Value::as_i64) != Some(2) {
        return None;
    }
    Some(sanitize_positive_records(raw, true))
}

/// Sanitize a legacy freeform document (`version: 1`, pre-metric/status)
pub fn sanitize_positive_v1(raw: &Value) -> Option<PositiveDocument> {
    let obj = raw.as_object()?;
    if obj.get("version").and_then(Value::as_i64) != Some(1) {
        return None;
    }
    Some(sanitize_positive_records(raw, false))
}

/// Convert an already strictly-validated import section into a document
///
/// Import payloads carry the flattened array shape; the same per-record
/// sanitization applies (clamping, status defaulting, metric gating).
pub fn sanitize_positive_import(raw: &Value) -> PositiveDocument {
    sanitize_positive_records(raw, true)
}

fn sanitize_positive_records(raw: &Value, with_metric: bool) -> PositiveDocument {
    let mut doc = PositiveDocument::default();

    for entry in collect_records(raw.get("habits")) {
        match sanitize_positive_habit(&entry, with_metric) {
            Some(habit) => doc.habits.push(habit),
            None => tracing::warn!("dropping malformed positive habit record"),
        }
    }

    for entry in collect_records(raw.get("logs")) {
        let Some(mut log) = sanitize_positive_log(&entry) else {
            tracing::warn!("dropping malformed positive log record");
            continue;
        };
        let Some(habit) = doc.habits.iter().find(|h| h.id == log.habit_id) else {
            tracing::warn!(habit = %log.habit_id, "dropping positive log for absent habit");
            continue;
        };
        // the metric field survives only when the owning habit declares
        // a matching metric kind
        log.metric = match (&habit.metric, with_metric) {
            (Some(cfg), true) => entry
                .get("metric")
                .and_then(|m| metric::sanitize_metric_value(m, cfg.effective_wrap_hour())),
            _ => None,
        };
        doc.logs.push(log);
    }

    doc
}

/// Persisted freeform state keeps habits/logs as id-keyed maps; accept
/// either that or a plain array of records.
fn collect_records(raw: Option<&Value>) -> Vec<Value> {
    match raw {
        Some(Value::Object(map)) => map.values().cloned().collect(),
        Some(Value::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    }
}

fn sanitize_positive_habit(raw: &Value, with_metric: bool) -> Option<PositiveHabit> {
    let obj = raw.as_object()?;
    let id = obj.get("id").and_then(Value::as_str)?;
    let name = obj.get("name").and_then(Value::as_str)?;
    let created_at = obj.get("createdAt").and_then(Value::as_i64)?;
    let metric_cfg = if with_metric {
        obj.get("metric").and_then(metric::sanitize_metric_config)
    } else {
        None
    };
    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .map(HabitStatus::sanitize)
        .unwrap_or_default();

    Some(PositiveHabit {
        id: HabitId::from(id),
        name: name.to_string(),
        created_at,
        metric: metric_cfg,
        status,
    })
}

fn sanitize_positive_log(raw: &Value) -> Option<PositiveHabitLog> {
    let obj = raw.as_object()?;
    let id = obj.get("id").and_then(Value::as_str)?;
    let habit_id = obj.get("habitId").and_then(Value::as_str)?;
    let ts = obj.get("ts").and_then(Value::as_i64)?;
    let note = obj
        .get("note")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(PositiveHabitLog {
        id: LogId::from(id),
        habit_id: HabitId::from(habit_id),
        ts,
        note,
        // attached by the caller once the owning habit's config is known
        metric: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_negative_array_is_upgraded() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap();
        let raw = json!([
            {"id": "h1", "name": "late snack", "logs": [
                {"ts": 1000},
                {"ts": 61_000, "diff": 60_000}
            ]},
            {"id": "h2", "name": "no logs", "logs": []}
        ]);
        let doc = migrate_negative(&raw, now);
        assert_eq!(doc.habits.len(), 2);
        assert_eq!(doc.logs.len(), 2);

        let h1 = &doc.habits[0];
        assert_eq!(h1.goal_seconds, DEFAULT_GOAL_SECONDS);
        assert_eq!(h1.streak, 0);
        assert_eq!(h1.created_at, now);
        assert_eq!(
            h1.last_logged_at.unwrap().timestamp_millis(),
            61_000
        );
        assert_eq!(doc.logs[1].delta_seconds, Some(60));
        assert!(doc.habits[1].last_logged_at.is_none());
    }

    #[test]
    fn test_legacy_negative_drops_malformed_records() {
        let now = Utc::now();
        let raw = json!([
            {"id": "ok", "name": "fine", "logs": [{"ts": "nope"}, {"ts": 5}]},
            {"name": "missing id"},
            42
        ]);
        let doc = migrate_negative(&raw, now);
        assert_eq!(doc.habits.len(), 1);
        assert_eq!(doc.logs.len(), 1);
        assert_eq!(doc.logs[0].at.timestamp_millis(), 5);
    }

    #[test]
    fn test_current_negative_defaults_fields() {
        let now = Utc::now();
        let raw = json!({
            "habits": [
                {"id": "h", "name": "n", "createdAt": "2023-01-01T00:00:00Z"},
                {"id": "clamped", "name": "c", "createdAt": "not a date",
                 "goalSeconds": 1.0, "streak": -3, "status": "bogus"}
            ],
            "logs": [
                {"habitId": "h", "at": "2023-01-02T00:00:00Z", "deltaSeconds": 9.7},
                {"habitId": "h", "at": "garbage"},
                {"habitId": "ghost", "at": "2023-01-02T00:00:00Z"}
            ]
        });
        let doc = migrate_negative(&raw, now);
        assert_eq!(doc.habits.len(), 2);
        assert_eq!(doc.habits[0].goal_seconds, DEFAULT_GOAL_SECONDS);
        assert_eq!(doc.habits[1].goal_seconds, 3600);
        assert_eq!(doc.habits[1].streak, 0);
        assert_eq!(doc.habits[1].status, HabitStatus::Active);
        assert_eq!(doc.habits[1].created_at, now);
        // bad `at` and orphan logs dropped, good one kept with truncated delta
        assert_eq!(doc.logs.len(), 1);
        assert_eq!(doc.logs[0].delta_seconds, Some(9));
    }

    #[test]
    fn test_positive_v2_round_trip_with_metric() {
        let raw = json!({
            "version": 2,
            "habits": {
                "p": {"id": "p", "name": "sleep", "createdAt": 1,
                       "metric": {"kind": "timeOfDay", "wrapHour": 20},
                       "status": "paused"}
            },
            "logs": {
                "l": {"id": "l", "habitId": "p", "ts": 10, "note": "x",
                       "metric": {"kind": "timeOfDay", "minutesSinceMidnight": 1320}}
            },
            "habitLogIndex": {"p": ["bogus", "l"]}
        });
        let doc = sanitize_positive_v2(&raw).unwrap();
        assert_eq!(doc.habits.len(), 1);
        assert_eq!(doc.habits[0].status, HabitStatus::Paused);
        let metric = doc.logs[0].metric.as_ref().unwrap();
        assert_eq!(metric.minutes_since_midnight, 1320);
        // normalized against the habit's own wrap hour (20:00 -> 1200)
        assert_eq!(metric.normalized_minutes, 120);
    }

    #[test]
    fn test_positive_v2_drops_metric_on_kind_mismatch() {
        let raw = json!({
            "version": 2,
            "habits": {"p": {"id": "p", "name": "n", "createdAt": 1}},
            "logs": {"l": {"id": "l", "habitId": "p", "ts": 1, "note": "",
                            "metric": {"kind": "timeOfDay", "minutesSinceMidnight": 60}}}
        });
        let doc = sanitize_positive_v2(&raw).unwrap();
        // habit declares no metric, so the sample cannot survive
        assert!(doc.logs[0].metric.is_none());
    }

    #[test]
    fn test_positive_v2_drops_malformed_and_orphans() {
        let raw = json!({
            "version": 2,
            "habits": {
                "ok": {"id": "ok", "name": "n", "createdAt": 1},
                "bad": {"id": "bad", "createdAt": "nope"}
            },
            "logs": {
                "keep": {"id": "keep", "habitId": "ok", "ts": 1},
                "orphan": {"id": "orphan", "habitId": "ghost", "ts": 2, "note": ""},
                "broken": {"id": "broken", "habitId": "ok", "ts": "later"}
            }
        });
        let doc = sanitize_positive_v2(&raw).unwrap();
        assert_eq!(doc.habits.len(), 1);
        assert_eq!(doc.logs.len(), 1);
        assert_eq!(doc.logs[0].id.as_str(), "keep");
        assert_eq!(doc.logs[0].note, "");
    }

    #[test]
    fn test_positive_version_gate() {
        assert!(sanitize_positive_v2(&json!({"version": 1})).is_none());
        assert!(sanitize_positive_v2(&json!("junk")).is_none());
        assert!(sanitize_positive_v1(&json!({"version": 2})).is_none());
    }

    #[test]
    fn test_positive_v1_gains_defaults() {
        let raw = json!({
            "version": 1,
            "habits": {"p": {"id": "p", "name": "old", "createdAt": 5,
                              "metric": {"kind": "timeOfDay"}}},
            "logs": {"l": {"id": "l", "habitId": "p", "ts": 9, "note": "n"}}
        });
        let doc = sanitize_positive_v1(&raw).unwrap();
        assert_eq!(doc.habits[0].status, HabitStatus::Active);
        // the legacy generation predates metrics: config is ignored
        assert!(doc.habits[0].metric.is_none());
        assert_eq!(doc.logs.len(), 1);
    }
}
