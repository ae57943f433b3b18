use crate::{Error, PinExtenderDriver};

/// A single virtual pin of an extender.
///
/// Implements the `embedded-hal` digital traits, so extender pins can be
/// handed to any driver expecting native GPIO.  Setting the output state
/// flushes right away; use [`write_multiple`](crate::write_multiple) to
/// change several pins in one bus write.
pub struct Pin<'a, D> {
    index: u8,
    driver: &'a D,
}

impl<'a, D: PinExtenderDriver> Pin<'a, D> {
    /// Handle for pin `index`, which must already be claimed and set up.
    pub fn new(driver: &'a D, index: u8) -> Self {
        Self { index, driver }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub(crate) fn driver(&self) -> &'a D {
        self.driver
    }

    pub fn set_state(&mut self, high: bool) -> Result<(), Error> {
        self.driver.write_pin(self.index, high)?;
        self.driver.flush_writes()
    }

    pub fn set_high(&mut self) -> Result<(), Error> {
        self.set_state(true)
    }

    pub fn set_low(&mut self) -> Result<(), Error> {
        self.set_state(false)
    }

    pub fn is_high(&self) -> Result<bool, Error> {
        self.driver.read_pin(self.index)
    }

    pub fn is_low(&self) -> Result<bool, Error> {
        self.is_high().map(|v| !v)
    }
}

impl<D> embedded_hal::digital::ErrorType for Pin<'_, D> {
    type Error = Error;
}

impl<D: PinExtenderDriver> embedded_hal::digital::OutputPin for Pin<'_, D> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self)
    }
}

impl<D: PinExtenderDriver> embedded_hal::digital::InputPin for Pin<'_, D> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Pin::is_high(self)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Pin::is_low(self)
    }
}
