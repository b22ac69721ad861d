use embassy_time::{Duration, block_for};
use waterer_core::hardware::TickSource;

/// Busy-waits on the embassy time driver; one unit is one millisecond.
pub struct BlockingTicks;

impl TickSource for BlockingTicks {
    fn delay(&mut self, units: u32) {
        block_for(Duration::from_millis(u64::from(units)));
    }
}
