/// Trailing-debounce write scheduling
///
/// Every store mutation re-arms a single pending write a fixed delay
/// out; a new mutation inside the window restarts the timer instead of
/// issuing one write per mutation. Modeled as a plain state machine over
/// millisecond timestamps so it can be tested by advancing virtual time;
/// the async driver that actually sleeps lives in `app.rs`.

/// Delay between the last mutation and the persisted write
pub const SAVE_DEBOUNCE_MS: i64 = 200;

/// A cancellable trailing-debounce deadline
#[derive(Debug)]
pub struct Debounce {
    delay_ms: i64,
    deadline: Option<i64>,
}

impl Debounce {
    pub fn new(delay_ms: i64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// (Re)arm the deadline `delay_ms` after `now_ms`
    pub fn touch(&mut self, now_ms: i64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the deadline if it has elapsed
    pub fn fire_due(&mut self, now_ms: i64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending deadline, e.g. after a forced flush
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new(SAVE_DEBOUNCE_MS)
    }
}
