/// Tuning for the status polling loops.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlashConfig {
    /// Status reads before a busy/WEL wait gives up with `FlashError::Timeout`.
    pub max_polls: u32,
    /// Delay between two consecutive status reads, in ms. 0 polls back to back.
    pub poll_delay_ms: u32,
}

impl FlashConfig {
    pub const fn new(max_polls: u32, poll_delay_ms: u32) -> Self {
        FlashConfig {
            max_polls,
            poll_delay_ms,
        }
    }
}

impl Default for FlashConfig {
    /// Enough for a full chip erase on a 64 Mbit part (~100 s typical worst case).
    fn default() -> Self {
        FlashConfig::new(200_000, 1)
    }
}
