//! The sync window: the `[start, end)` range bounding one change-feed read.

use crate::SyncError;
use chrono::{DateTime, SecondsFormat, Utc};

/// Half-open time range `[start, end)` for one iteration's range query.
///
/// The orchestrator replaces the window wholesale each iteration via
/// [`SyncWindow::advance`], which makes the "previous end becomes next
/// start" invariant a single assignment rather than two field mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWindow {
    /// `None` only for the first window of a process's lifetime, meaning
    /// "from the beginning of the feed's retention".
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// First window of the loop, from a caller-supplied start (or the
    /// feed's retention start) up to the current wall clock.
    pub fn initial(
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<SyncWindow, SyncError> {
        if let Some(start) = start {
            if start > end {
                return Err(SyncError::Configuration(format!(
                    "sync start {start} is after the current time {end}"
                )));
            }
        }
        Ok(SyncWindow { start, end })
    }

    /// Next window: the previous end becomes the new start.
    ///
    /// Wall clocks can step backwards; the new end is clamped so the
    /// window never inverts.
    #[must_use]
    pub fn advance(self, end: DateTime<Utc>) -> SyncWindow {
        let start = self.end;
        SyncWindow {
            start: Some(start),
            end: end.max(start),
        }
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.start {
            Some(start) => write!(
                f,
                "[{}, {})",
                start.to_rfc3339_opts(SecondsFormat::Micros, true),
                self.end.to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
            None => write!(
                f,
                "[start-of-retention, {})",
                self.end.to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn advance_chains_without_gap_or_overlap() {
        let mut window = SyncWindow::initial(Some(ts(100)), ts(200)).unwrap();
        for i in 1..=5 {
            let next_end = ts(200 + i * 10);
            let previous_end = window.end;
            window = window.advance(next_end);
            assert_eq!(window.start, Some(previous_end));
            assert_eq!(window.end, next_end);
        }
    }

    #[test]
    fn initial_rejects_inverted_range() {
        let err = SyncWindow::initial(Some(ts(300)), ts(200)).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn initial_accepts_open_start() {
        let window = SyncWindow::initial(None, ts(200)).unwrap();
        assert!(window.start.is_none());
    }

    #[test]
    fn advance_clamps_backwards_clock() {
        let window = SyncWindow::initial(Some(ts(100)), ts(200)).unwrap();
        let advanced = window.advance(ts(150));
        assert_eq!(advanced.start, Some(ts(200)));
        assert_eq!(advanced.end, ts(200));
    }
}
