/// CSV rendering of habit logs
///
/// Output is UTF-8 with a leading byte-order mark and CRLF line
/// terminators so spreadsheet tools open it cleanly. Quoting follows
/// RFC 4180: fields containing a comma, quote or newline are wrapped in
/// double quotes with internal quotes doubled. Metric columns render
/// empty when a log carries no sample.

use chrono::{Local, SecondsFormat, TimeZone, Utc};

use crate::domain::metric::TimeOfDayMetric;
use crate::domain::{HabitId, Log, LogId, PositiveHabitLog};

/// Byte-order mark prefixed to every CSV document
const BOM: &str = "\u{feff}";

/// Column header shared by both log kinds
const HEADER: &str = "log_id,habit_id,epoch_ms,iso_utc,local_iso,note,\
metric_kind,metric_minutes,metric_normalized,metric_display,metric_tz_offset";

/// A log flattened for CSV output, from either store
#[derive(Debug, Clone)]
pub struct CsvLog {
    pub id: LogId,
    pub habit_id: HabitId,
    /// Epoch milliseconds
    pub ts: i64,
    pub note: String,
    pub metric: Option<TimeOfDayMetric>,
}

impl From<&Log> for CsvLog {
    fn from(log: &Log) -> Self {
        Self {
            id: log.id.clone(),
            habit_id: log.habit_id.clone(),
            ts: log.at.timestamp_millis(),
            note: log.note.clone().unwrap_or_default(),
            metric: None,
        }
    }
}

impl From<&PositiveHabitLog> for CsvLog {
    fn from(log: &PositiveHabitLog) -> Self {
        Self {
            id: log.id.clone(),
            habit_id: log.habit_id.clone(),
            ts: log.ts,
            note: log.note.clone(),
            metric: log.metric.clone(),
        }
    }
}

/// Quote a field if it contains a comma, quote, CR or LF
pub fn escape_csv(value: &str) -> String {
    let needs_quote = value.contains([',', '"', '\n', '\r']);
    if needs_quote {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render logs as a BOM-prefixed, CRLF-terminated CSV document
pub fn logs_to_csv(logs: &[CsvLog]) -> String {
    let mut out = String::new();
    out.push_str(BOM);
    out.push_str(HEADER);
    out.push_str("\r\n");

    for log in logs {
        let utc = Utc.timestamp_millis_opt(log.ts).single();
        let iso_utc = utc
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let local_iso = utc
            .map(|dt| {
                dt.with_timezone(&Local)
                    .to_rfc3339_opts(SecondsFormat::Millis, false)
            })
            .unwrap_or_default();

        let metric_cols: [String; 5] = match &log.metric {
            Some(m) => [
                "timeOfDay".to_string(),
                m.minutes_since_midnight.to_string(),
                m.normalized_minutes.to_string(),
                m.display.clone(),
                m.tz_offset_min.to_string(),
            ],
            None => Default::default(),
        };

        let fields = [
            escape_csv(log.id.as_str()),
            escape_csv(log.habit_id.as_str()),
            log.ts.to_string(),
            escape_csv(&iso_utc),
            escape_csv(&local_iso),
            escape_csv(&log.note),
            escape_csv(&metric_cols[0]),
            escape_csv(&metric_cols[1]),
            escape_csv(&metric_cols[2]),
            escape_csv(&metric_cols[3]),
            escape_csv(&metric_cols[4]),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }

    out
}
