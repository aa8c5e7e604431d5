/// Rule deciding whether a partially received packet may keep accumulating
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FreshnessPolicy {
    /// The whole packet must arrive within the timeout, measured from the
    /// start byte.
    MaxMessageTime,
    /// Successive bytes must arrive within the timeout of each other.
    #[default]
    MinInterByteDelta,
}

impl FreshnessPolicy {
    /// Milliseconds counted against the timeout, or `None` when no packet is
    /// in progress.
    pub fn elapsed(self, packet_start: Option<u32>, packet_last: u32, now: u32) -> Option<u32> {
        let start = packet_start?;
        let reference = match self {
            FreshnessPolicy::MaxMessageTime => start,
            FreshnessPolicy::MinInterByteDelta => packet_last,
        };
        Some(now.wrapping_sub(reference))
    }

    /// Whether a packet in the given timing state is still fresh.
    pub fn is_fresh(self, packet_start: Option<u32>, packet_last: u32, now: u32, timeout: u32) -> bool {
        match self.elapsed(packet_start, packet_last, now) {
            Some(elapsed) => elapsed < timeout,
            None => true,
        }
    }
}
