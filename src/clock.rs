/// Wall-clock and timezone source
///
/// The stores never call `Utc::now()` directly; they go through this
/// trait so the adaptive-goal timing, the dedup guard and the debounce
/// scheduler can all be driven deterministically in tests.

use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant as local wall-clock time with its UTC offset
    fn now_local(&self) -> DateTime<FixedOffset>;

    /// Current instant as epoch milliseconds
    fn now_ms(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }
}

/// System clock in the process-local timezone
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Settable clock for deterministic tests
///
/// Holds an instant plus a fixed local offset; `set_ms`/`advance_ms`
/// move virtual time without any real sleeping.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self::with_offset(start_ms, FixedOffset::east_opt(0).unwrap())
    }

    pub fn with_offset(start_ms: i64, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_millis_opt(start_ms).unwrap()),
            offset,
        }
    }

    pub fn set_ms(&self, ms: i64) {
        *self.now.lock().unwrap() = Utc.timestamp_millis_opt(ms).unwrap();
    }

    pub fn advance_ms(&self, delta: i64) {
        let mut now = self.now.lock().unwrap();
        *now = Utc.timestamp_millis_opt(now.timestamp_millis() + delta).unwrap();
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.offset)
    }
}
