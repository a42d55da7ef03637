use anyhow::Result;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// When a pane fired relative to the watermark.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Serialize, Deserialize)]
pub enum Timing {
    #[display(fmt = "early")]
    Early,

    #[display(fmt = "on_time")]
    OnTime,

    #[display(fmt = "late")]
    Late,

    #[display(fmt = "unknown")]
    Unknown,
}

/// Describes which firing of a window produced a value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PaneInfo {
    is_first: bool,
    is_last: bool,
    timing: Timing,
    index: u64,
    non_speculative_index: i64,
}

impl PaneInfo {
    /// The pane of a value that has not been through any trigger.
    pub const NO_FIRING: PaneInfo = PaneInfo {
        is_first: true,
        is_last: true,
        timing: Timing::Unknown,
        index: 0,
        non_speculative_index: 0,
    };

    /// The only pane of a window, fired on time.
    pub const ON_TIME_AND_ONLY_FIRING: PaneInfo = PaneInfo {
        is_first: true,
        is_last: true,
        timing: Timing::OnTime,
        index: 0,
        non_speculative_index: 0,
    };

    pub fn try_new(
        is_first: bool,
        is_last: bool,
        timing: Timing,
        index: u64,
        non_speculative_index: i64,
    ) -> Result<Self> {
        anyhow::ensure!(
            index > 0 || is_first,
            "only the first pane can have index 0"
        );
        anyhow::ensure!(
            timing != Timing::Early || non_speculative_index == -1,
            "early panes must have non-speculative index -1"
        );
        Ok(Self {
            is_first,
            is_last,
            timing,
            index,
            non_speculative_index,
        })
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.is_first
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.is_last
    }

    #[inline]
    pub fn timing(&self) -> Timing {
        self.timing
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[inline]
    pub fn non_speculative_index(&self) -> i64 {
        self.non_speculative_index
    }
}

impl Default for PaneInfo {
    fn default() -> Self {
        PaneInfo::ON_TIME_AND_ONLY_FIRING
    }
}
