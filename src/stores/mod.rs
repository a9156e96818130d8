/// In-memory habit stores
///
/// Each store is the exclusive owner of its entities. Mutations run
/// synchronously to completion on a single logical thread; persistence
/// is decoupled behind the debounce scheduler in `persist`.

pub mod negative;
pub mod positive;

pub use negative::NegativeHabitStore;
pub use positive::{LogOptions, PositiveHabitStore};
