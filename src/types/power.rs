//! Power mode for bulb control.

use serde::{Deserialize, Serialize};

/// Power state for a bulb.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Turn the bulb on
    On,
    /// Turn the bulb off
    Off,
}

impl PowerMode {
    /// Wire representation of this power state.
    pub(crate) fn as_state(self) -> bool {
        matches!(self, PowerMode::On)
    }
}
