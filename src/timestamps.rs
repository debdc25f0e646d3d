//! Creation and update timestamps.

use crate::value::Value;
use chrono::NaiveDateTime;

/// Column stamped once, when a record is first inserted.
pub const CREATED_AT: &str = "created_at";
/// Column stamped on every save that writes.
pub const UPDATED_AT: &str = "updated_at";

/// Decides which timestamp columns a save should write.
#[derive(Debug, Clone, Copy)]
pub struct TimestampManager {
    enabled: bool,
}

impl TimestampManager {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// The `(column, value)` pairs to set before a save.
    ///
    /// `is_dirty` reports whether a column was already changed by the caller; such a
    /// column is never overwritten. `created_at` is only stamped for new records.
    /// One timestamp is taken and shared by both columns.
    pub fn stamp_for_save(
        &self,
        is_new_record: bool,
        now: impl FnOnce() -> NaiveDateTime,
        is_dirty: impl Fn(&str) -> bool,
    ) -> Vec<(&'static str, Value)> {
        if !self.enabled {
            return Vec::new();
        }

        let time = Value::DateTime(now());
        let mut stamps = Vec::with_capacity(2);

        if !is_dirty(UPDATED_AT) {
            stamps.push((UPDATED_AT, time.clone()));
        }
        if is_new_record && !is_dirty(CREATED_AT) {
            stamps.push((CREATED_AT, time));
        }

        log::trace!("timestamp stamps for save: {:?}", stamps);
        stamps
    }
}
