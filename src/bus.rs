use core::sync::atomic::{AtomicU8, Ordering};
use embedded_hal::i2c::{Error as _, I2c};

use crate::BusError;

/// Consecutive failures after which the backoff delay stops growing.
pub const MAX_ERROR_COUNT: u8 = 50;
/// Backoff delay added per consecutive failure.
pub const BACKOFF_STEP_MS: u32 = 10;
/// Maximum number of dedicated interrupt lines a port can own.
pub const MAX_LINES: usize = 4;

pub(crate) trait I2cExt {
    type Error;

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Self::Error>;
    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8, Self::Error>;
}

impl<I2C: I2c> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[reg, value])
    }

    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.write_read(addr, &[reg], &mut buf)?;
        Ok(buf[0])
    }
}

/// Counts consecutive bus failures and derives the retry delay from it.
#[derive(Debug)]
pub struct Backoff {
    count: AtomicU8,
    max: u8,
}

impl Backoff {
    pub const fn new(max: u8) -> Self {
        Self {
            count: AtomicU8::new(0),
            max,
        }
    }

    /// Record a failure and return the new error count.
    pub fn record_failure(&self) -> u8 {
        let max = self.max;
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.saturating_add(1).min(max))
            })
            .unwrap_or(max);
        previous.saturating_add(1).min(max)
    }

    pub fn record_success(&self) {
        self.count.store(0, Ordering::Release);
    }

    pub fn error_count(&self) -> u8 {
        self.count.load(Ordering::Acquire)
    }

    /// How long the worker should sleep before its next iteration.
    pub fn delay_ms(&self) -> u32 {
        u32::from(self.error_count()) * BACKOFF_STEP_MS
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(MAX_ERROR_COUNT)
    }
}

/// The hardware side of an extender: the bus and any dedicated interrupt
/// lines.
///
/// A port is only touched while an update pass is running.
pub struct Port<I2C, INT = NoLine> {
    pub(crate) i2c: I2C,
    pub(crate) lines: [Option<INT>; MAX_LINES],
    /// Last sampled level of each line, one bit per line.
    pub(crate) levels: u8,
}

impl<I2C, INT> Port<I2C, INT> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            lines: [None, None, None, None],
            levels: 0,
        }
    }

    pub fn with_line(mut self, line: usize, pin: INT) -> Self {
        self.lines[line] = Some(pin);
        self.levels |= 1 << line;
        self
    }

    /// Bitmask of the lines that are connected.
    pub fn line_mask(&self) -> u8 {
        self.lines
            .iter()
            .enumerate()
            .fold(0, |m, (i, l)| if l.is_some() { m | (1 << i) } else { m })
    }

    /// Drop all interrupt lines, handing them back to the platform.
    pub(crate) fn release_lines(&mut self) {
        self.lines = [None, None, None, None];
    }
}

/// Runs register transactions for one update pass.
///
/// Failures are logged, counted and remembered; the pass keeps going so that
/// one unresponsive device does not starve the others.  Success is only
/// recorded for the pass as a whole, see [`Transfer::complete`].
pub(crate) struct Transfer<'a, I2C> {
    i2c: &'a mut I2C,
    backoff: &'a Backoff,
    failed: bool,
}

impl<'a, I2C: I2c> Transfer<'a, I2C> {
    pub fn new(i2c: &'a mut I2C, backoff: &'a Backoff) -> Self {
        Self {
            i2c,
            backoff,
            failed: false,
        }
    }

    pub fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let result = self.i2c.read_reg(address, register);
        self.finish(address, register, result)
    }

    pub fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        let result = self.i2c.write_reg(address, register, value);
        self.finish(address, register, result)
    }

    /// End the pass and return whether any of its transactions failed.
    ///
    /// Only a pass without failures resets the backoff, so a single dead
    /// chip in a chain keeps the delay growing.
    pub fn complete(self) -> bool {
        if !self.failed {
            self.backoff.record_success();
        }
        self.failed
    }

    fn finish<T>(
        &mut self,
        address: u8,
        register: u8,
        result: Result<T, I2C::Error>,
    ) -> Result<T, BusError> {
        result.map_err(|e| {
            let err = BusError {
                address,
                register,
                kind: e.kind(),
            };
            let count = self.backoff.record_failure();
            log::warn!("{err} (consecutive errors: {count})");
            self.failed = true;
            err
        })
    }
}

/// Stand-in for extenders without a dedicated interrupt line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLine;

impl embedded_hal::digital::ErrorType for NoLine {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for NoLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}
