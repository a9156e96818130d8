/// Domain module containing the dual habit/log data model
///
/// Goal-mode (negative) habits carry the adaptive target and streak;
/// freeform (positive) habits carry optional metric configuration and a
/// lifecycle status. The time-of-day metric subsystem lives here too
/// since both migration and the positive store depend on it.

pub mod habit;
pub mod metric;
pub mod positive;
pub mod types;

pub use habit::*;
pub use metric::*;
pub use positive::*;
pub use types::*;
