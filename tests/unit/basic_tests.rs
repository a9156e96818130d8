/// Basic unit tests to verify core functionality
use habit_state::*;

use std::sync::Arc;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    #[test]
    fn test_goal_habit_creation() {
        let clock = ManualClock::new(1_700_000_000_000);
        let habit = Habit::new("No sugar".to_string(), clock.now_utc());

        assert_eq!(habit.name, "No sugar");
        assert_eq!(habit.goal_seconds, DEFAULT_GOAL_SECONDS);
        assert_eq!(habit.streak, 0);
        assert!(habit.last_logged_at.is_none());
        assert_eq!(habit.status, HabitStatus::Active);
    }

    #[test]
    fn test_goal_clamping() {
        assert_eq!(clamp_goal_seconds(100.0), GOAL_MIN_SECONDS);
        assert_eq!(clamp_goal_seconds(10_000_000.0), GOAL_MAX_SECONDS);
        assert_eq!(clamp_goal_seconds(f64::NAN), DEFAULT_GOAL_SECONDS);
        assert_eq!(clamp_goal_seconds(7200.4), 7200);
    }

    #[test]
    fn test_status_sanitize() {
        assert_eq!(HabitStatus::sanitize("paused"), HabitStatus::Paused);
        assert_eq!(HabitStatus::sanitize("archived"), HabitStatus::Archived);
        assert_eq!(HabitStatus::sanitize("bogus"), HabitStatus::Active);
    }

    #[test]
    fn test_wrap_normalization_fixed_points() {
        // 6pm anchors the day boundary at zero
        assert_eq!(normalize_by_wrap(18 * 60, 18), 0);
        assert_eq!(normalize_by_wrap(23 * 60, 18), 300);
        assert_eq!(normalize_by_wrap(2 * 60, 18), 480);
        // Round trip back to wall-clock minutes
        assert_eq!(denormalize_by_wrap(480, 18), 2 * 60);
    }

    #[test]
    fn test_adaptive_goal_grows_and_resets() {
        let clock = Arc::new(ManualClock::new(0));
        let mut store = NegativeHabitStore::new(clock.clone());
        let id = store.add("late night snacking");
        assert!(store.edit_goal(&id, 3600.0));

        // First log establishes the baseline without judging it
        assert!(store.log(&id));
        assert_eq!(store.get(&id).unwrap().streak, 0);
        assert_eq!(store.get(&id).unwrap().goal_seconds, 3600);

        // A hit: waited past the goal, so the target stretches by 10%
        clock.advance_ms(3_700_000);
        assert!(store.log(&id));
        assert_eq!(store.get(&id).unwrap().streak, 1);
        assert_eq!(store.get(&id).unwrap().goal_seconds, 3960);

        // A miss: streak resets and the target shrinks, clamped to the floor
        clock.advance_ms(60_000);
        assert!(store.log(&id));
        assert_eq!(store.get(&id).unwrap().streak, 0);
        assert_eq!(store.get(&id).unwrap().goal_seconds, 3600);
    }

    #[test]
    fn test_duplicate_log_window() {
        let clock = Arc::new(ManualClock::new(0));
        let mut store = NegativeHabitStore::new(clock.clone());
        let id = store.add("doomscrolling");

        assert!(store.log(&id));
        clock.advance_ms(29_999);
        assert!(!store.log(&id));
        assert_eq!(store.logs().len(), 1);

        clock.advance_ms(1);
        assert!(store.log(&id));
        assert_eq!(store.logs().len(), 2);
    }

    #[test]
    fn test_positive_backdated_logs_sort_newest_first() {
        let clock = Arc::new(ManualClock::new(10_000));
        let mut store = PositiveHabitStore::new(clock);
        let id = store.add("reading", None);

        assert!(store.log(&id, "now", LogOptions::default()).is_some());
        let backdated = LogOptions {
            at_ms: Some(1_000),
            ..Default::default()
        };
        assert!(store.log(&id, "earliest", backdated).is_some());
        let backdated = LogOptions {
            at_ms: Some(5_000),
            ..Default::default()
        };
        assert!(store.log(&id, "middle", backdated).is_some());

        let notes: Vec<String> = store.get_logs(&id).into_iter().map(|l| l.note).collect();
        assert_eq!(notes, ["now", "middle", "earliest"]);
    }

    #[test]
    fn test_metric_built_from_local_time() {
        let cfg = HabitMetricConfig::time_of_day();
        let at = chrono::DateTime::parse_from_rfc3339("2024-03-01T23:00:00+02:00")
            .expect("valid timestamp");
        let metric = build_time_of_day_metric(&at, Some(&cfg));

        assert_eq!(metric.minutes_since_midnight, 23 * 60);
        assert_eq!(metric.normalized_minutes, 300);
        assert_eq!(metric.tz_offset_min, 120);
        assert_eq!(metric.display, "11:00 PM");
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(csv::escape_csv("plain"), "plain");
        assert_eq!(
            csv::escape_csv("a,\"b\"\nline"),
            "\"a,\"\"b\"\"\nline\""
        );
    }

    #[test]
    fn test_csv_output_shape() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let mut store = PositiveHabitStore::new(clock);
        let id = store.add("journaling", None);
        assert!(store.log(&id, "two pages", LogOptions::default()).is_some());

        let rows: Vec<CsvLog> = store.document().logs.iter().map(CsvLog::from).collect();
        let out = csv::logs_to_csv(&rows);

        assert!(out.starts_with('\u{feff}'));
        let mut lines = out.trim_start_matches('\u{feff}').split("\r\n");
        assert!(lines.next().unwrap().starts_with("log_id,habit_id,epoch_ms,"));
        assert!(lines.next().unwrap().contains("two pages"));
    }

    #[test]
    fn test_export_payload_version() {
        let clock = Arc::new(ManualClock::new(42_000));
        let negative = NegativeHabitStore::new(clock.clone());
        let positive = PositiveHabitStore::new(clock);

        let payload = export_all(&negative, &positive, 42_000);
        assert_eq!(payload.version, 2);
        assert_eq!(payload.exported_at, 42_000);

        let value = serde_json::to_value(&payload).expect("serializable");
        assert!(value.get("negative").is_some());
        assert!(value.get("positive").is_some());
    }

    #[test]
    fn test_import_rejects_garbage_without_touching_state() {
        let clock = Arc::new(ManualClock::new(0));
        let mut negative = NegativeHabitStore::new(clock.clone());
        let mut positive = PositiveHabitStore::new(clock.clone());
        let id = negative.add("baseline");

        let garbage = serde_json::json!({ "version": 2, "negative": 3, "positive": [] });
        assert!(!import_all(
            &mut negative,
            &mut positive,
            &garbage,
            clock.now_utc()
        ));
        assert!(negative.get(&id).is_some());
    }
}
