use embedded_hal::i2c::ErrorKind;

/// Configuration and usage errors.
///
/// These are programmer errors and are reported synchronously by the call
/// which caused them.  Bus failures never show up here; see [`BusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("pin index {index} is out of range, the extender has {capacity} pins")]
    Range { index: u8, capacity: u8 },
    #[error("pin {0} is already claimed")]
    AlreadyClaimed(u8),
    #[error("pin {0} was used without being claimed")]
    NotClaimed(u8),
    #[error("pin {0} already has an interrupt handler attached")]
    DuplicateInterrupt(u8),
    #[error("unknown port-expander device family")]
    UnknownDevice,
    #[error("no pin extender driver is registered under that name")]
    UnknownDriver,
    #[error("pin extender works through I2C, but no I2C bus is configured")]
    MissingBus,
    #[error("driver registry is full")]
    RegistryFull,
    #[error("pin extender has been stopped")]
    Stopped,
}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// A failed register transaction.
///
/// Only the worker sees these.  They drive the backoff policy and are
/// reported through logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("I2C transaction with device {address:#04x}, register {register:#04x} failed: {kind:?}")]
pub struct BusError {
    pub address: u8,
    pub register: u8,
    pub kind: ErrorKind,
}
