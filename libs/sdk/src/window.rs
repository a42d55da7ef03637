use std::fmt::{self, Display, Formatter};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The smallest representable event time, in milliseconds.
pub const MIN_TIMESTAMP: i64 = i64::MIN / 1000;

/// The largest representable event time, in milliseconds.
pub const MAX_TIMESTAMP: i64 = i64::MAX / 1000;

/// The last timestamp that belongs to the global window.
///
/// One day before [`MAX_TIMESTAMP`], so that timers set at the end of the
/// global window still fire before the end of time.
pub const END_OF_GLOBAL_WINDOW: i64 = MAX_TIMESTAMP - 24 * 60 * 60 * 1000;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BoundedWindow {
    /// The single window covering all of event time.
    Global,

    /// The half-open interval `[start, end)`.
    Interval { start: i64, end: i64 },
}

impl BoundedWindow {
    pub fn interval(start: i64, end: i64) -> Result<Self> {
        anyhow::ensure!(
            start < end,
            "invalid interval window: start {} is not before end {}",
            start,
            end
        );
        Ok(BoundedWindow::Interval { start, end })
    }

    /// The largest timestamp that can be included in this window.
    pub fn max_timestamp(&self) -> i64 {
        match self {
            BoundedWindow::Global => END_OF_GLOBAL_WINDOW,
            BoundedWindow::Interval { end, .. } => end - 1,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        match self {
            BoundedWindow::Global => (MIN_TIMESTAMP..=END_OF_GLOBAL_WINDOW).contains(&timestamp),
            BoundedWindow::Interval { start, end } => (*start..*end).contains(&timestamp),
        }
    }
}

impl Display for BoundedWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BoundedWindow::Global => f.write_str("GlobalWindow"),
            BoundedWindow::Interval { start, end } => write!(f, "[{}, {})", start, end),
        }
    }
}
