/// Core identifier and lifecycle types shared by both habit stores
///
/// This module defines the typed id wrappers, the habit lifecycle enum,
/// and the adaptive-goal clamp used everywhere goal seconds are written.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a habit (either mode)
///
/// A thin wrapper over an opaque string so habit ids and log ids cannot
/// be mixed up. Freshly generated ids are UUID v4; imported documents may
/// carry arbitrary opaque ids and those are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub String);

impl HabitId {
    /// Generate a fresh random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for HabitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a log record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub String);

impl LogId {
    /// Generate a fresh random log ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LogId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for LogId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for LogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a habit
///
/// `Queued` supports the deferred "add later" workflow; everything else
/// is a plain visibility state. Unknown persisted values fall back to
/// `Active` via [`HabitStatus::sanitize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitStatus {
    Queued,
    #[default]
    Active,
    Paused,
    Archived,
}

impl HabitStatus {
    /// Map an untrusted string onto the lifecycle enum, defaulting to `Active`
    pub fn sanitize(value: &str) -> Self {
        match value {
            "queued" => HabitStatus::Queued,
            "active" => HabitStatus::Active,
            "paused" => HabitStatus::Paused,
            "archived" => HabitStatus::Archived,
            _ => HabitStatus::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HabitStatus::Queued => "queued",
            HabitStatus::Active => "active",
            HabitStatus::Paused => "paused",
            HabitStatus::Archived => "archived",
        }
    }
}

/// Minimum adaptive goal: one hour
pub const GOAL_MIN_SECONDS: u32 = 3_600;
/// Maximum adaptive goal: thirty days
pub const GOAL_MAX_SECONDS: u32 = 2_592_000;
/// Goal assigned to newly created habits: one day
pub const DEFAULT_GOAL_SECONDS: u32 = 86_400;

/// Round and clamp a goal interval into the allowed range
///
/// Every write path for `goal_seconds` goes through this, so the stored
/// value can never leave [3600, 2592000]. Non-finite input degrades to
/// the default rather than being rejected.
pub fn clamp_goal_seconds(seconds: f64) -> u32 {
    if !seconds.is_finite() {
        return DEFAULT_GOAL_SECONDS;
    }
    let rounded = seconds.round();
    if rounded <= GOAL_MIN_SECONDS as f64 {
        GOAL_MIN_SECONDS
    } else if rounded >= GOAL_MAX_SECONDS as f64 {
        GOAL_MAX_SECONDS
    } else {
        rounded as u32
    }
}
