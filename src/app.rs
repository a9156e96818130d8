/// Application context owning both stores and their persistence wiring
///
/// This replaces the source system's module-level singletons: state is
/// constructed explicitly, loads are driven by the owner, and teardown
/// is a plain drop. In-memory state is authoritative; the persisted copy
/// trails it by up to the debounce window and write failures are
/// swallowed (durability is best-effort, no retry, no write-ahead log).

use std::sync::Arc;

use serde_json::Value;

use crate::clock::Clock;
use crate::export::{self, ExportPayloadV2};
use crate::storage::{
    migrate, KeyValueBackend, NEGATIVE_KEY, POSITIVE_KEY_V1, POSITIVE_KEY_V2,
};
use crate::stores::{NegativeHabitStore, PositiveHabitStore};

pub struct HabitApp {
    backend: Arc<dyn KeyValueBackend>,
    clock: Arc<dyn Clock>,
    pub negative: NegativeHabitStore,
    pub positive: PositiveHabitStore,
}

impl HabitApp {
    pub fn new(backend: Arc<dyn KeyValueBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            negative: NegativeHabitStore::new(clock.clone()),
            positive: PositiveHabitStore::new(clock.clone()),
            backend,
            clock,
        }
    }

    /// Load, migrate and install both persisted documents
    ///
    /// The install is gated to a true cold start: a store that has
    /// already been mutated is not overwritten by a late-arriving load.
    /// Backend failures keep the empty state and log a warning.
    pub async fn load(&mut self) {
        self.load_negative().await;
        self.load_positive().await;
    }

    async fn load_negative(&mut self) {
        let raw = match self.backend.get(NEGATIVE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "negative load failed, starting empty");
                return;
            }
        };
        if !self.negative.is_pristine() {
            tracing::warn!("negative store mutated before load completed, skipping install");
            return;
        }
        let doc = migrate::migrate_negative(&raw, self.clock.now_utc());
        self.negative.replace(doc);
        // installing the loaded state is not a user mutation; nothing new
        // to persist yet
        self.negative.cancel_pending_save();
    }

    async fn load_positive(&mut self) {
        let current = match self.backend.get(POSITIVE_KEY_V2).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "positive load failed, starting empty");
                return;
            }
        };

        let (doc, migrated_from_legacy) = match current {
            Some(raw) => match migrate::sanitize_positive_v2(&raw) {
                Some(doc) => (doc, false),
                None => {
                    tracing::warn!("positive document unusable, starting empty");
                    return;
                }
            },
            None => {
                // current generation absent: fall back to the legacy key
                let legacy = match self.backend.get(POSITIVE_KEY_V1).await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => return,
                    Err(e) => {
                        tracing::warn!(error = %e, "positive legacy load failed");
                        return;
                    }
                };
                match migrate::sanitize_positive_v1(&legacy) {
                    Some(doc) => (doc, true),
                    None => {
                        tracing::warn!("positive legacy document unusable, starting empty");
                        return;
                    }
                }
            }
        };

        if !self.positive.is_pristine() {
            tracing::warn!("positive store mutated before load completed, skipping install");
            return;
        }
        self.positive.replace(doc);
        self.positive.cancel_pending_save();

        if migrated_from_legacy {
            // promote the migrated document so the fallback never runs again
            tracing::info!("migrated positive state from legacy generation");
            self.write_positive().await;
        }
    }

    /// Fire any due debounced saves
    pub async fn tick(&mut self) {
        let now_ms = self.clock.now_ms();
        if self.negative.save_due(now_ms) {
            self.write_negative().await;
        }
        if self.positive.save_due(now_ms) {
            self.write_positive().await;
        }
    }

    /// Persist both stores immediately, cancelling pending deadlines
    pub async fn flush_all(&mut self) {
        self.negative.cancel_pending_save();
        self.positive.cancel_pending_save();
        self.write_negative().await;
        self.write_positive().await;
    }

    /// Drive `tick` on a short interval until saves stop being scheduled
    ///
    /// Intended for long-running hosts; short-lived callers should just
    /// `flush_all` before exit.
    pub async fn run_autosave(&mut self, rounds: usize) {
        for _ in 0..rounds {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.tick().await;
        }
    }

    pub fn export_all(&self) -> ExportPayloadV2 {
        export::export_all(&self.negative, &self.positive, self.clock.now_ms())
    }

    pub fn import_all(&mut self, payload: &Value) -> bool {
        export::import_all(
            &mut self.negative,
            &mut self.positive,
            payload,
            self.clock.now_utc(),
        )
    }

    async fn write_negative(&self) {
        let doc = match serde_json::to_value(self.negative.document()) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "negative snapshot serialization failed");
                return;
            }
        };
        if let Err(e) = self.backend.set(NEGATIVE_KEY, doc).await {
            tracing::warn!(error = %e, "negative save failed");
        }
    }

    async fn write_positive(&self) {
        let state = self.positive.persisted_state();
        if let Err(e) = self.backend.set(POSITIVE_KEY_V2, state).await {
            tracing::warn!(error = %e, "positive save failed");
        }
    }
}
