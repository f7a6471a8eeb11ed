//! Front-panel indicator state shared with the timer context.
//!
//! The interpreter publishes a [`BlinkMode`] through a [`BlinkCell`]; the
//! periodic timer context owns a [`BlinkDriver`] that divides its tick down
//! to LED toggles. Single writer, single reader, no locking.

use core::sync::atomic::{AtomicU8, Ordering::SeqCst};

/// Indicator blink pattern.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlinkMode {
    /// Steady on.
    Off = 0,
    Slow = 1,
    Fast = 2,
}

/// Single-writer cell carrying the blink mode to the timer context.
#[derive(Debug, Default)]
pub struct BlinkCell(AtomicU8);

impl BlinkCell {
    pub const fn new() -> Self {
        BlinkCell(AtomicU8::new(0))
    }

    pub fn set(&self, mode: BlinkMode) {
        self.0.store(mode as u8, SeqCst);
    }

    pub fn get(&self) -> BlinkMode {
        match self.0.load(SeqCst) {
            1 => BlinkMode::Slow,
            2 => BlinkMode::Fast,
            _ => BlinkMode::Off,
        }
    }
}

// Timer ticks per LED half-period; the tick is ~10 ms on target hardware.
const SLOW_DIVIDER: u8 = 25;
const FAST_DIVIDER: u8 = 5;

/// Timer-context side of the indicator.
#[derive(Debug)]
pub struct BlinkDriver {
    ticks: u8,
    led: bool,
}

impl Default for BlinkDriver {
    fn default() -> Self {
        BlinkDriver {
            ticks: 0,
            led: true,
        }
    }
}

impl BlinkDriver {
    pub fn new() -> Self {
        BlinkDriver::default()
    }

    /// Advance one timer tick; returns the LED level to drive.
    pub fn tick(&mut self, cell: &BlinkCell) -> bool {
        match cell.get() {
            BlinkMode::Off => {
                self.ticks = 0;
                self.led = true;
            }
            mode => {
                let divider = if mode == BlinkMode::Slow {
                    SLOW_DIVIDER
                } else {
                    FAST_DIVIDER
                };
                self.ticks += 1;
                if self.ticks >= divider {
                    self.ticks = 0;
                    self.led = !self.led;
                }
            }
        }
        self.led
    }
}
