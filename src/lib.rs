//! Virtual GPIO pins backed by I2C port-expanders.
//!
//! Up to 64 pins spread over one or more expander chips are exposed through
//! [`PinExtenderDriver`].  Pin operations only touch an in-memory register
//! model; a [`Worker`] moves that model to and from the bus, so they are
//! cheap and can be called from any task.
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "std")]
extern crate std;

mod bits;
mod bus;
mod claim;
mod common;
pub mod dev;
mod error;
mod extender;
mod interrupt;
mod multi;
mod mutex;
mod pin;
mod registers;
mod registry;
mod status;
#[cfg(test)]
mod testing;
#[cfg(any(test, feature = "std"))]
mod thread;
mod worker;

pub use bus::{Backoff, NoLine, Port, BACKOFF_STEP_MS, MAX_ERROR_COUNT, MAX_LINES};
pub use common::{
    InterruptCallback, InterruptMode, Pass, PinAttributes, PinExtenderDriver, Platform, Worker,
    POLL_INTERVAL_MS, SYNC_WAIT_MS, TEARDOWN_RETRIES,
};
pub use error::{BusError, Error};
pub use extender::{I2cExtender, CAPACITY};
pub use multi::write_multiple;
pub use mutex::PortMutex;
pub use pin::Pin;
pub use registry::{AnyExtender, Constructor, ExtenderConfig, Registry, MAX_DRIVERS};
pub use status::Status;
#[cfg(feature = "std")]
pub use thread::{spawn_worker, StdPlatform, WorkerConfig};

pub use dev::family::{Device, Family};
pub use dev::tca6408::Tca6408;
