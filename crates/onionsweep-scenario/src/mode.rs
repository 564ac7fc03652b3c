//! Access-control modes of the latency benchmark.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a deaddrop is restricted to an allow-list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    Open,
    SenderRestricted,
    ReceiverRestricted,
    FullyRestricted,
}

impl AccessMode {
    /// Every mode, in sweep order.
    pub const ALL: [AccessMode; 4] = [
        AccessMode::Open,
        AccessMode::SenderRestricted,
        AccessMode::ReceiverRestricted,
        AccessMode::FullyRestricted,
    ];

    /// Name used on the measurement binary's command line and in ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Open => "open",
            AccessMode::SenderRestricted => "sender-restricted",
            AccessMode::ReceiverRestricted => "receiver-restricted",
            AccessMode::FullyRestricted => "fully-restricted",
        }
    }

    pub fn restricts_senders(&self) -> bool {
        matches!(self, AccessMode::SenderRestricted | AccessMode::FullyRestricted)
    }

    pub fn restricts_receivers(&self) -> bool {
        matches!(self, AccessMode::ReceiverRestricted | AccessMode::FullyRestricted)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown access mode: {}", s))
    }
}
