/// Goal-mode habit store
///
/// Owns goal-mode habits and their logs and runs the adaptive goal
/// algorithm: a log that arrives after the target interval tightens the
/// goal by 10% and extends the streak; an early log relaxes the goal by
/// 10% and resets the streak. All mutations are synchronous; each one
/// bumps the revision channel and re-arms the debounced save.

use std::sync::Arc;

use tokio::sync::watch;

use crate::clock::Clock;
use crate::domain::{
    clamp_goal_seconds, Habit, HabitId, HabitStatus, Log, LogId, NegativeDocument,
};
use crate::persist::Debounce;

/// Logs closer together than this are treated as accidental double-taps
/// and silently ignored.
const DEDUP_WINDOW_MS: i64 = 30_000;

pub struct NegativeHabitStore {
    habits: Vec<Habit>,
    logs: Vec<Log>,
    clock: Arc<dyn Clock>,
    debounce: Debounce,
    revision: u64,
    notify: watch::Sender<u64>,
}

impl NegativeHabitStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            habits: Vec::new(),
            logs: Vec::new(),
            clock,
            debounce: Debounce::default(),
            revision: 0,
            notify,
        }
    }

    /// Observe the revision counter; it bumps on every completed mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// True until the first mutation lands (used to gate the startup load)
    pub fn is_pristine(&self) -> bool {
        self.revision == 0
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn get(&self, id: &HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| &h.id == id)
    }

    /// Create a habit with the default goal and an empty streak
    pub fn add(&mut self, name: &str) -> HabitId {
        let habit = Habit::new(name, self.clock.now_utc());
        let id = habit.id.clone();
        self.habits.push(habit);
        self.touched();
        id
    }

    /// Record an occurrence and run the adaptive goal update
    ///
    /// Within 30 s of the previous log this is a silent no-op (double-tap
    /// guard). The first-ever log records no delta and leaves goal and
    /// streak untouched.
    pub fn log(&mut self, id: &HabitId) -> bool {
        let now = self.clock.now_utc();
        let Some(habit) = self.habits.iter_mut().find(|h| &h.id == id) else {
            tracing::debug!(habit = %id, "log: unknown habit");
            return false;
        };

        let delta_seconds = match habit.last_logged_at {
            Some(last) => {
                let elapsed_ms = now.timestamp_millis() - last.timestamp_millis();
                if elapsed_ms < DEDUP_WINDOW_MS {
                    return false;
                }
                let hit = elapsed_ms >= habit.goal_seconds as i64 * 1000;
                if hit {
                    habit.streak += 1;
                    habit.goal_seconds =
                        clamp_goal_seconds(habit.goal_seconds as f64 * 1.1);
                } else {
                    habit.streak = 0;
                    habit.goal_seconds =
                        clamp_goal_seconds(habit.goal_seconds as f64 * 0.9);
                }
                Some(elapsed_ms.div_euclid(1000))
            }
            None => None,
        };

        habit.last_logged_at = Some(now);
        let entry = Log {
            id: LogId::new(),
            habit_id: habit.id.clone(),
            at: now,
            delta_seconds,
            note: None,
        };
        self.logs.push(entry);
        self.touched();
        true
    }

    /// Set the goal directly, independent of streak state
    pub fn edit_goal(&mut self, id: &HabitId, seconds: f64) -> bool {
        let Some(habit) = self.habits.iter_mut().find(|h| &h.id == id) else {
            return false;
        };
        habit.goal_seconds = clamp_goal_seconds(seconds);
        self.touched();
        true
    }

    pub fn reset_streak(&mut self, id: &HabitId) -> bool {
        let Some(habit) = self.habits.iter_mut().find(|h| &h.id == id) else {
            return false;
        };
        habit.streak = 0;
        self.touched();
        true
    }

    pub fn rename(&mut self, id: &HabitId, name: &str) -> bool {
        let Some(habit) = self.habits.iter_mut().find(|h| &h.id == id) else {
            return false;
        };
        habit.name = name.to_string();
        self.touched();
        true
    }

    pub fn set_status(&mut self, id: &HabitId, status: HabitStatus) -> bool {
        let Some(habit) = self.habits.iter_mut().find(|h| &h.id == id) else {
            return false;
        };
        habit.status = status;
        self.touched();
        true
    }

    /// Remove a habit and every log that references it, in one update
    pub fn delete_habit(&mut self, id: &HabitId) -> bool {
        if !self.habits.iter().any(|h| &h.id == id) {
            tracing::warn!(habit = %id, "deleteHabit: missing habit");
            return false;
        }
        self.habits.retain(|h| &h.id != id);
        self.logs.retain(|l| &l.habit_id != id);
        self.touched();
        true
    }

    /// Update the note only; a goal/streak change the log originally
    /// drove is NOT recomputed.
    pub fn edit_log(&mut self, log_id: &LogId, note: &str) -> bool {
        let Some(log) = self.logs.iter_mut().find(|l| &l.id == log_id) else {
            return false;
        };
        log.note = Some(note.to_string());
        self.touched();
        true
    }

    /// Remove a log and recompute the habit's `last_logged_at` cache from
    /// the most recent survivor. The goal/streak mutation the deleted log
    /// originally caused is NOT reverted.
    pub fn delete_log(&mut self, log_id: &LogId) -> bool {
        let Some(position) = self.logs.iter().position(|l| &l.id == log_id) else {
            return false;
        };
        let removed = self.logs.remove(position);
        let latest = self
            .logs
            .iter()
            .filter(|l| l.habit_id == removed.habit_id)
            .map(|l| l.at)
            .max();
        if let Some(habit) = self.habits.iter_mut().find(|h| h.id == removed.habit_id) {
            habit.last_logged_at = latest;
        }
        self.touched();
        true
    }

    /// This habit's logs, newest-first; ties keep insertion order
    pub fn timeline(&self, id: &HabitId) -> Vec<Log> {
        let mut logs: Vec<Log> = self
            .logs
            .iter()
            .filter(|l| &l.habit_id == id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.at.cmp(&a.at));
        logs
    }

    /// Full-state replacement used by migration and import
    pub fn replace(&mut self, doc: NegativeDocument) {
        self.habits = doc.habits;
        self.logs = doc.logs;
        // defensive: no path may leave the goal outside its range
        for habit in &mut self.habits {
            habit.goal_seconds = clamp_goal_seconds(habit.goal_seconds as f64);
        }
        self.touched();
    }

    /// Snapshot in the persisted/exported document shape
    pub fn document(&self) -> NegativeDocument {
        NegativeDocument {
            habits: self.habits.clone(),
            logs: self.logs.clone(),
        }
    }

    pub fn save_due(&mut self, now_ms: i64) -> bool {
        self.debounce.fire_due(now_ms)
    }

    pub fn has_pending_save(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn cancel_pending_save(&mut self) {
        self.debounce.cancel();
    }

    fn touched(&mut self) {
        self.revision += 1;
        self.notify.send_replace(self.revision);
        self.debounce.touch(self.clock.now_ms());
    }
}
