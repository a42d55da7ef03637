use anyhow::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{BoundedWindow, PaneInfo, MIN_TIMESTAMP};

/// A value with its event timestamp, the windows it was assigned to and the
/// pane that produced it.
///
/// A windowed value always belongs to at least one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedValue<T> {
    value: T,
    timestamp: i64,
    windows: SmallVec<[BoundedWindow; 1]>,
    pane: PaneInfo,
}

impl<T> WindowedValue<T> {
    pub fn try_new(
        value: T,
        timestamp: i64,
        windows: impl IntoIterator<Item = BoundedWindow>,
        pane: PaneInfo,
    ) -> Result<Self> {
        let windows: SmallVec<[BoundedWindow; 1]> = windows.into_iter().collect();
        anyhow::ensure!(
            !windows.is_empty(),
            "windowed value must belong to at least one window"
        );
        Ok(Self {
            value,
            timestamp,
            windows,
            pane,
        })
    }

    /// A value in the global window at the minimum timestamp.
    pub fn in_global_window(value: T) -> Self {
        Self::timestamped_in_global_window(value, MIN_TIMESTAMP)
    }

    /// A value in the global window, in its only on-time pane.
    pub fn timestamped_in_global_window(value: T, timestamp: i64) -> Self {
        let mut windows = SmallVec::new();
        windows.push(BoundedWindow::Global);
        Self {
            value,
            timestamp,
            windows,
            pane: PaneInfo::ON_TIME_AND_ONLY_FIRING,
        }
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }

    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[inline]
    pub fn windows(&self) -> &[BoundedWindow] {
        &self.windows
    }

    #[inline]
    pub fn pane(&self) -> PaneInfo {
        self.pane
    }

    pub fn map_value<U, F: FnOnce(T) -> U>(self, f: F) -> WindowedValue<U> {
        let WindowedValue {
            value,
            timestamp,
            windows,
            pane,
        } = self;
        WindowedValue {
            value: f(value),
            timestamp,
            windows,
            pane,
        }
    }
}

impl<T: Clone> WindowedValue<T> {
    /// Splits into one value per assigned window.
    pub fn explode_windows(&self) -> Vec<WindowedValue<T>> {
        self.windows
            .iter()
            .map(|window| {
                let mut windows = SmallVec::new();
                windows.push(*window);
                WindowedValue {
                    value: self.value.clone(),
                    timestamp: self.timestamp,
                    windows,
                    pane: self.pane,
                }
            })
            .collect()
    }
}
