//! Append-only completion history shared by all runners.
//!
//! This is the one cross-task mutation point in the simulator; appends are
//! serialized behind a mutex so concurrent completions never interleave.

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format and append the completion record for a recipe, returning a copy
    /// of the appended entry.
    pub fn record_completion(&self, recipe_name: &str) -> String {
        let record = completion_record(recipe_name);
        self.entries.lock().push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the entries in append order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

/// `"<recipe-name> completed at <local HH:MM:SS>"`, falling back to UTC when
/// the local offset cannot be determined.
fn completion_record(recipe_name: &str) -> String {
    let fmt = time::macros::format_description!("[hour]:[minute]:[second]");
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let stamp = now.format(&fmt).unwrap_or_else(|_| "??:??:??".into());
    format!("{recipe_name} completed at {stamp}")
}
