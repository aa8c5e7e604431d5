use std::time::Duration;

use crate::codec::DEFAULT_TIMEOUT;
use crate::freshness::FreshnessPolicy;

/// Configuration for a packet engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PacketConfig {
    /// Staleness timeout for partially received packets. Default: 50 ms.
    pub timeout: Duration,
    /// Stuff delimiter bytes out of payloads. Both ends must agree.
    pub packed: bool,
    /// How staleness is measured.
    pub freshness: FreshnessPolicy,
}

impl PacketConfig {
    /// Timeout in whole milliseconds, saturating at `u32::MAX`.
    pub fn timeout_millis(&self) -> u32 {
        u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX)
    }

    /// A configuration whose packets never go stale.
    pub fn without_timeout() -> Self {
        Self {
            timeout: Duration::from_millis(u64::from(u32::MAX)),
            ..Self::default()
        }
    }
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            packed: false,
            freshness: FreshnessPolicy::default(),
        }
    }
}
