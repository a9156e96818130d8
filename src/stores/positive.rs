/// Freeform habit store
///
/// Owns freeform habits, their logs and the derived per-habit log index.
/// The index is a materialized view ordered newest-first; it is never
/// authoritative and is rebuilt from the log collection on any full
/// replacement. Metric samples are attached only when the owning habit
/// declares a matching metric kind, and are re-sanitized against the
/// habit's own wrap hour before storage.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::domain::metric::{self, HabitMetricConfig, MetricKind, TimeOfDayMetric};
use crate::domain::{
    HabitId, HabitStatus, LogId, PositiveDocument, PositiveHabit, PositiveHabitLog,
};
use crate::persist::Debounce;

/// Optional knobs for [`PositiveHabitStore::log`]
#[derive(Debug, Default)]
pub struct LogOptions {
    /// Explicit log instant (epoch ms); defaults to now. Supports backdating.
    pub at_ms: Option<i64>,
    /// Caller-captured metric sample; attached only when the habit's
    /// metric kind matches.
    pub metric: Option<TimeOfDayMetric>,
}

pub struct PositiveHabitStore {
    habits: HashMap<HabitId, PositiveHabit>,
    logs: HashMap<LogId, PositiveHabitLog>,
    habit_log_index: HashMap<HabitId, Vec<LogId>>,
    clock: Arc<dyn Clock>,
    debounce: Debounce,
    revision: u64,
    notify: watch::Sender<u64>,
}

impl PositiveHabitStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            habits: HashMap::new(),
            logs: HashMap::new(),
            habit_log_index: HashMap::new(),
            clock,
            debounce: Debounce::default(),
            revision: 0,
            notify,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// True until the first mutation lands (used to gate the startup load)
    pub fn is_pristine(&self) -> bool {
        self.revision == 0
    }

    pub fn habits(&self) -> &HashMap<HabitId, PositiveHabit> {
        &self.habits
    }

    pub fn get(&self, id: &HabitId) -> Option<&PositiveHabit> {
        self.habits.get(id)
    }

    /// Create a habit, optionally with a (sanitized) metric configuration
    pub fn add(&mut self, name: &str, metric_cfg: Option<HabitMetricConfig>) -> HabitId {
        self.insert_habit(name, metric_cfg, HabitStatus::Active)
    }

    /// Deferred "add later" workflow: trims the name, refuses empty input
    /// and queues the habit instead of activating it.
    pub fn quick_add_queued(&mut self, name: &str) -> Option<HabitId> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(self.insert_habit(trimmed, None, HabitStatus::Queued))
    }

    fn insert_habit(
        &mut self,
        name: &str,
        metric_cfg: Option<HabitMetricConfig>,
        status: HabitStatus,
    ) -> HabitId {
        let id = HabitId::new();
        self.habits.insert(
            id.clone(),
            PositiveHabit {
                id: id.clone(),
                name: name.to_string(),
                created_at: self.clock.now_ms(),
                metric: metric_cfg.map(HabitMetricConfig::sanitized),
                status,
            },
        );
        self.habit_log_index.entry(id.clone()).or_default();
        self.touched();
        id
    }

    pub fn rename(&mut self, id: &HabitId, name: &str) -> bool {
        let Some(habit) = self.habits.get_mut(id) else {
            return false;
        };
        habit.name = name.to_string();
        self.touched();
        true
    }

    /// Replace or clear the metric configuration
    pub fn set_metric(&mut self, id: &HabitId, metric_cfg: Option<HabitMetricConfig>) -> bool {
        let Some(habit) = self.habits.get_mut(id) else {
            return false;
        };
        habit.metric = metric_cfg.map(HabitMetricConfig::sanitized);
        self.touched();
        true
    }

    pub fn set_status(&mut self, id: &HabitId, status: HabitStatus) -> bool {
        let Some(habit) = self.habits.get_mut(id) else {
            return false;
        };
        habit.status = status;
        self.touched();
        true
    }

    /// Record a log entry; returns the new id, or None for an absent habit
    pub fn log(&mut self, habit_id: &HabitId, note: &str, options: LogOptions) -> Option<LogId> {
        let Some(habit) = self.habits.get(habit_id) else {
            tracing::debug!(habit = %habit_id, "log: unknown habit");
            return None;
        };

        let sample = match (&habit.metric, options.metric) {
            (Some(cfg), Some(sample)) if cfg.kind == MetricKind::TimeOfDay => {
                Some(metric::sanitize_sample(&sample, cfg.effective_wrap_hour()))
            }
            _ => None,
        };

        let id = LogId::new();
        let ts = options.at_ms.unwrap_or_else(|| self.clock.now_ms());
        self.logs.insert(
            id.clone(),
            PositiveHabitLog {
                id: id.clone(),
                habit_id: habit_id.clone(),
                ts,
                note: note.to_string(),
                metric: sample,
            },
        );

        let ids = self.habit_log_index.entry(habit_id.clone()).or_default();
        ids.push(id.clone());
        let logs = &self.logs;
        // newest-first; stable sort keeps insertion order on tied stamps
        ids.sort_by_key(|log_id| {
            std::cmp::Reverse(logs.get(log_id).map(|l| l.ts).unwrap_or(i64::MIN))
        });

        self.touched();
        Some(id)
    }

    pub fn edit_log(&mut self, log_id: &LogId, note: &str) -> bool {
        let Some(log) = self.logs.get_mut(log_id) else {
            return false;
        };
        log.note = note.to_string();
        self.touched();
        true
    }

    /// Remove a log from both the log map and the per-habit index
    pub fn delete_log(&mut self, log_id: &LogId) -> bool {
        let Some(log) = self.logs.remove(log_id) else {
            return false;
        };
        if let Some(ids) = self.habit_log_index.get_mut(&log.habit_id) {
            ids.retain(|id| id != log_id);
        }
        self.touched();
        true
    }

    /// Remove a habit, its logs and its index entry in one update
    pub fn delete_habit(&mut self, habit_id: &HabitId) -> bool {
        if self.habits.remove(habit_id).is_none() {
            tracing::warn!(habit = %habit_id, "deleteHabit: missing habit");
            return false;
        }
        if let Some(ids) = self.habit_log_index.remove(habit_id) {
            for id in ids {
                self.logs.remove(&id);
            }
        }
        self.touched();
        true
    }

    /// This habit's logs newest-first, with dangling ids filtered out
    pub fn get_logs(&self, habit_id: &HabitId) -> Vec<PositiveHabitLog> {
        self.habit_log_index
            .get(habit_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.logs.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full-state replacement used by migration and import
    ///
    /// Everything is re-sanitized: habit metric configs are clamped, log
    /// metric samples are re-normalized against the owning habit's wrap
    /// hour (and dropped when the habit declares no matching kind), logs
    /// referencing an absent habit are dropped, and the index is
    /// re-derived from scratch.
    pub fn replace(&mut self, doc: PositiveDocument) {
        let mut habits = HashMap::new();
        for mut habit in doc.habits {
            habit.metric = habit.metric.map(HabitMetricConfig::sanitized);
            habits.insert(habit.id.clone(), habit);
        }

        // Kept as a sequence until the index is built: tied timestamps
        // must keep their incoming relative order.
        let mut kept: Vec<PositiveHabitLog> = Vec::with_capacity(doc.logs.len());
        for mut log in doc.logs {
            let Some(habit) = habits.get(&log.habit_id) else {
                tracing::debug!(habit = %log.habit_id, "replace: dropping orphan log");
                continue;
            };
            log.metric = match (&habit.metric, log.metric) {
                (Some(cfg), Some(sample)) if cfg.kind == MetricKind::TimeOfDay => {
                    Some(metric::sanitize_sample(&sample, cfg.effective_wrap_hour()))
                }
                _ => None,
            };
            kept.push(log);
        }

        self.habit_log_index = build_index(habits.keys(), &kept);
        self.logs = kept.into_iter().map(|log| (log.id.clone(), log)).collect();
        self.habits = habits;
        self.touched();
    }

    /// Flattened snapshot in the export document shape, deterministic order
    pub fn document(&self) -> PositiveDocument {
        let mut habits: Vec<PositiveHabit> = self.habits.values().cloned().collect();
        habits.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        let mut logs: Vec<PositiveHabitLog> = self.logs.values().cloned().collect();
        logs.sort_by(|a, b| {
            b.ts.cmp(&a.ts)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        PositiveDocument { habits, logs }
    }

    /// Snapshot in the persisted (current-generation) key-value shape
    pub fn persisted_state(&self) -> Value {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PersistedState<'a> {
            habits: &'a HashMap<HabitId, PositiveHabit>,
            logs: &'a HashMap<LogId, PositiveHabitLog>,
            habit_log_index: &'a HashMap<HabitId, Vec<LogId>>,
            version: u8,
        }
        serde_json::to_value(PersistedState {
            habits: &self.habits,
            logs: &self.logs,
            habit_log_index: &self.habit_log_index,
            version: 2,
        })
        .unwrap_or(Value::Null)
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

/// Derive the newest-first index from the log sequence alone; the
/// stable sort keeps tied timestamps in the sequence's relative order
fn build_index<'a>(
    habit_ids: impl Iterator<Item = &'a HabitId>,
    logs: &[PositiveHabitLog],
) -> HashMap<HabitId, Vec<LogId>> {
    let mut index: HashMap<HabitId, Vec<LogId>> =
        habit_ids.map(|id| (id.clone(), Vec::new())).collect();
    let mut ordered: Vec<&PositiveHabitLog> = logs.iter().collect();
    ordered.sort_by_key(|l| std::cmp::Reverse(l.ts));
    for log in ordered {
        index.entry(log.habit_id.clone()).or_default().push(log.id.clone());
    }
    index
}
