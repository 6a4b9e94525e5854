//! System timer — converts elapsed time into dispatcher ticks
//!
//! On real hardware the tick ISR simply calls `tick()` once per interrupt.
//! When the caller only knows elapsed microseconds (tickless idle, host
//! simulation), `SysTimer` accumulates them and reports how many whole tick
//! periods have passed, carrying the remainder forward.
//!
//! Author: Moroya Sakamoto

/// Default tick period: 1 ms
pub const DEFAULT_TICK_US: u32 = 1000;

/// Tick-period timer
///
/// Size: 32 bytes
pub struct SysTimer {
    /// Current time (microseconds)
    now_us: u64,
    /// Whole ticks elapsed
    ticks: u64,
    /// Tick period in microseconds (never zero)
    tick_period_us: u32,
    /// Microseconds into the current, unfinished tick
    residual_us: u32,
    /// Overflow count
    overflows: u32,
}

impl SysTimer {
    /// Create a timer with the given tick period (`0` is treated as `1`)
    pub const fn new(tick_period_us: u32) -> Self {
        Self {
            now_us: 0,
            ticks: 0,
            tick_period_us: if tick_period_us == 0 { 1 } else { tick_period_us },
            residual_us: 0,
            overflows: 0,
        }
    }

    /// Advance time by microseconds, returning the whole ticks completed
    pub fn advance(&mut self, us: u64) -> u64 {
        let new = self.now_us.wrapping_add(us);
        if new < self.now_us {
            self.overflows += 1;
        }
        self.now_us = new;

        let period = self.tick_period_us as u64;
        let mut elapsed = us / period;
        let mut residual = self.residual_us as u64 + us % period;
        if residual >= period {
            residual -= period;
            elapsed += 1;
        }
        self.residual_us = residual as u32;
        self.ticks = self.ticks.wrapping_add(elapsed);
        elapsed
    }

    /// Current time in microseconds
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Current time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_us / 1000
    }

    /// Whole ticks elapsed since creation or reset
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tick period in microseconds
    pub fn tick_period_us(&self) -> u32 {
        self.tick_period_us
    }

    /// Microseconds left until the next tick boundary
    pub fn until_next_tick_us(&self) -> u32 {
        self.tick_period_us - self.residual_us
    }

    /// Number of overflows
    pub fn overflows(&self) -> u32 {
        self.overflows
    }

    /// Reset timer
    pub fn reset(&mut self) {
        self.now_us = 0;
        self.ticks = 0;
        self.residual_us = 0;
        self.overflows = 0;
    }
}

impl Default for SysTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_US)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_ticks() {
        let mut timer = SysTimer::new(1000);
        assert_eq!(timer.advance(3000), 3);
        assert_eq!(timer.ticks(), 3);
        assert_eq!(timer.now_ms(), 3);
    }

    #[test]
    fn test_residual_carried() {
        let mut timer = SysTimer::new(1000);
        assert_eq!(timer.advance(600), 0);
        assert_eq!(timer.until_next_tick_us(), 400);
        assert_eq!(timer.advance(600), 1);
        assert_eq!(timer.advance(800), 1);
        assert_eq!(timer.ticks(), 2);
        assert_eq!(timer.now_us(), 2000);
    }

    #[test]
    fn test_zero_period_clamped() {
        let mut timer = SysTimer::new(0);
        assert_eq!(timer.tick_period_us(), 1);
        assert_eq!(timer.advance(5), 5);
    }

    #[test]
    fn test_timer_reset() {
        let mut timer = SysTimer::default();
        timer.advance(10_500);
        timer.reset();
        assert_eq!(timer.now_us(), 0);
        assert_eq!(timer.ticks(), 0);
        assert_eq!(timer.until_next_tick_us(), DEFAULT_TICK_US);
    }

    #[test]
    fn test_overflow_counted() {
        let mut timer = SysTimer::new(1);
        timer.advance(u64::MAX);
        timer.advance(2);
        assert_eq!(timer.overflows(), 1);
    }
}
