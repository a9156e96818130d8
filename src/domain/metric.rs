/// Time-of-day metric normalization subsystem
///
/// A time-of-day metric compares wall-clock times relative to a
/// configurable day boundary (the "wrap hour"), so a bedtime habit can
/// compare 11 PM against 2 AM across midnight. All functions here are
/// pure; the sanitization path never fails and instead degrades invalid
/// input to clamped or defaulted values.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default day boundary: 6 PM
pub const DEFAULT_WRAP_HOUR: u8 = 18;
/// Minutes in a day; all minute values live in [0, 1439]
pub const MINUTES_PER_DAY: i32 = 1440;

/// Kinds of quantitative metric a habit can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    TimeOfDay,
}

/// Per-habit metric configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitMetricConfig {
    pub kind: MetricKind,
    /// Day boundary hour, 0-23. Defaults to 18 (6 PM) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_hour: Option<u8>,
    /// Whether a smaller normalized value wins. Defaults to true
    /// (earlier relative to the wrap hour is better, e.g. bedtime).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_is_better: Option<bool>,
}

impl HabitMetricConfig {
    /// A time-of-day config with defaults
    pub fn time_of_day() -> Self {
        Self {
            kind: MetricKind::TimeOfDay,
            wrap_hour: None,
            lower_is_better: None,
        }
    }

    /// Effective wrap hour after defaulting and clamping
    pub fn effective_wrap_hour(&self) -> u8 {
        self.wrap_hour.map(|h| h.min(23)).unwrap_or(DEFAULT_WRAP_HOUR)
    }

    /// Clamp the stored wrap hour into range
    pub fn sanitized(mut self) -> Self {
        self.wrap_hour = self.wrap_hour.map(|h| h.min(23));
        self
    }
}

/// A captured time-of-day measurement attached to a log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayMetric {
    pub kind: MetricKind,
    /// Local wall-clock minutes since midnight, 0-1439, as logged
    pub minutes_since_midnight: u16,
    /// Minutes relative to the wrap hour, 0-1439, used for comparisons
    pub normalized_minutes: u16,
    /// Human rendering like "11:23 PM"
    pub display: String,
    /// Local timezone offset in minutes east of UTC at capture time
    pub tz_offset_min: i32,
}

/// Clamp an untrusted wrap hour; absent or NaN stays absent
pub fn clamp_wrap_hour(value: Option<f64>) -> Option<u8> {
    let v = value?;
    if v.is_nan() {
        return None;
    }
    let truncated = v.trunc();
    Some(if truncated < 0.0 {
        0
    } else if truncated > 23.0 {
        23
    } else {
        truncated as u8
    })
}

/// Local wall-clock minutes since midnight
pub fn minutes_since_midnight(at: &DateTime<FixedOffset>) -> u16 {
    (at.hour() * 60 + at.minute()) as u16
}

/// Rotate the 24-hour cycle so `wrap_hour` maps to zero
pub fn normalize_by_wrap(minutes: u16, wrap_hour: u8) -> u16 {
    let shift = (wrap_hour.min(23) as i32) * 60;
    (minutes as i32 - shift).rem_euclid(MINUTES_PER_DAY) as u16
}

/// Exact inverse of [`normalize_by_wrap`]
pub fn denormalize_by_wrap(normalized: u16, wrap_hour: u8) -> u16 {
    let shift = (wrap_hour.min(23) as i32) * 60;
    (normalized as i32 + shift).rem_euclid(MINUTES_PER_DAY) as u16
}

/// Render minutes-of-day as "11:23 PM"
pub fn minutes_to_display(minutes: u16) -> String {
    let m = minutes.min(1439) as u32;
    let time = NaiveTime::from_hms_opt(m / 60, m % 60, 0)
        .unwrap_or(NaiveTime::MIN);
    time.format("%-I:%M %p").to_string()
}

/// Build a fully populated metric from a local wall-clock instant
pub fn build_time_of_day_metric(
    at: &DateTime<FixedOffset>,
    cfg: Option<&HabitMetricConfig>,
) -> TimeOfDayMetric {
    let wrap_hour = cfg
        .map(|c| c.effective_wrap_hour())
        .unwrap_or(DEFAULT_WRAP_HOUR);
    let minutes = minutes_since_midnight(at);
    TimeOfDayMetric {
        kind: MetricKind::TimeOfDay,
        minutes_since_midnight: minutes,
        normalized_minutes: normalize_by_wrap(minutes, wrap_hour),
        display: minutes_to_display(minutes),
        tz_offset_min: at.offset().fix().local_minus_utc() / 60,
    }
}

/// Compare two samples under the habit's configuration
pub fn is_better_time_of_day(
    a: &TimeOfDayMetric,
    b: &TimeOfDayMetric,
    cfg: Option<&HabitMetricConfig>,
) -> bool {
    let lower_is_better = cfg.and_then(|c| c.lower_is_better).unwrap_or(true);
    if lower_is_better {
        a.normalized_minutes < b.normalized_minutes
    } else {
        a.normalized_minutes > b.normalized_minutes
    }
}

fn clamp_minutes(value: f64) -> u16 {
    if !value.is_finite() {
        return 0;
    }
    let rounded = value.round();
    if rounded < 0.0 {
        0
    } else if rounded > 1439.0 {
        1439
    } else {
        rounded as u16
    }
}

/// Re-sanitize a caller-supplied sample against the owning habit's wrap hour
///
/// Normalized minutes are always recomputed here; the caller's value may
/// have been produced under a different wrap hour.
pub fn sanitize_sample(sample: &TimeOfDayMetric, wrap_hour: u8) -> TimeOfDayMetric {
    let minutes = sample.minutes_since_midnight.min(1439);
    let display = if sample.display.is_empty() {
        minutes_to_display(minutes)
    } else {
        sample.display.clone()
    };
    TimeOfDayMetric {
        kind: MetricKind::TimeOfDay,
        minutes_since_midnight: minutes,
        normalized_minutes: normalize_by_wrap(minutes, wrap_hour),
        display,
        tz_offset_min: sample.tz_offset_min,
    }
}

/// Reconstruct a metric config from an untrusted JSON value
///
/// Returns None when the kind is absent or not `timeOfDay`; the caller
/// drops the field entirely in that case.
pub fn sanitize_metric_config(raw: &Value) -> Option<HabitMetricConfig> {
    let obj = raw.as_object()?;
    if obj.get("kind").and_then(Value::as_str) != Some("timeOfDay") {
        return None;
    }
    Some(HabitMetricConfig {
        kind: MetricKind::TimeOfDay,
        wrap_hour: clamp_wrap_hour(obj.get("wrapHour").and_then(Value::as_f64)),
        lower_is_better: obj.get("lowerIsBetter").and_then(Value::as_bool),
    })
}

/// Reconstruct a metric sample from an untrusted JSON value
///
/// Minutes are range-clamped; normalized minutes are recomputed from the
/// wrap hour when missing or non-finite; a missing display is rebuilt
/// from the minutes. Never fails for `timeOfDay` input.
pub fn sanitize_metric_value(raw: &Value, wrap_hour: u8) -> Option<TimeOfDayMetric> {
    let obj = raw.as_object()?;
    if obj.get("kind").and_then(Value::as_str) != Some("timeOfDay") {
        return None;
    }
    let minutes = clamp_minutes(
        obj.get("minutesSinceMidnight")
            .and_then(Value::as_f64)
            .unwrap_or(f64::NAN),
    );
    let normalized = match obj.get("normalizedMinutes").and_then(Value::as_f64) {
        Some(v) if v.is_finite() => clamp_minutes(v),
        _ => normalize_by_wrap(minutes, wrap_hour),
    };
    let display = match obj.get("display").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => minutes_to_display(minutes),
    };
    let tz_offset_min = obj
        .get("tzOffsetMin")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i32)
        .unwrap_or(0);
    Some(TimeOfDayMetric {
        kind: MetricKind::TimeOfDay,
        minutes_since_midnight: minutes,
        normalized_minutes: normalized,
        display,
        tz_offset_min,
    })
}
