//! The tracked table: a logical prefix resolved to a dated physical table.

use chrono::{Days, NaiveDate};

/// The physical table currently backing the logical analytics stream.
///
/// The physical identifier is always derived as `{prefix}_{YYYYMMDD}`;
/// keeping the fields private makes that derivation the only way to name
/// the table. A `TrackedTable` is replaced, never mutated, when rotation
/// is detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTable {
    prefix: String,
    date: NaiveDate,
}

impl TrackedTable {
    pub fn new(prefix: impl Into<String>, date: NaiveDate) -> TrackedTable {
        TrackedTable {
            prefix: prefix.into(),
            date,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Physical table identifier, `{prefix}_{YYYYMMDD}`.
    pub fn physical_id(&self) -> String {
        format!("{}_{}", self.prefix, self.date.format("%Y%m%d"))
    }

    /// The next day's table, the rotation successor.
    pub fn successor(&self) -> TrackedTable {
        TrackedTable {
            prefix: self.prefix.clone(),
            date: self.date + Days::new(1),
        }
    }
}

impl std::fmt::Display for TrackedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.physical_id())
    }
}
