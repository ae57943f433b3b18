//! Register-polling extender for chains of `PCA9539`, `PCA9555`, `TCA6408`,
//! `PCA9554` and `PCA9538` chips.
//!
//! Up to 64 virtual pins are spread over one or more chips of the same
//! family at consecutive addresses.  Client calls only touch the in-memory
//! model and the status word; the bus is driven by update passes, which run
//! on the worker or inline from `flush_writes` / `read_pin`.
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;

use crate::bus::{Backoff, Port};
use crate::common::{InterruptCallback, InterruptMode, Pass, Platform, SYNC_WAIT_MS};
use crate::dev::family::Family;
use crate::registers::{Layout, Registers};
use crate::status::{Status, StatusWord, UpdateGuard};
use crate::{Error, PinAttributes, PinExtenderDriver, PortMutex, Worker};

/// Number of virtual pins one extender can serve.
pub const CAPACITY: u8 = 64;

/// Generic I2C port-expander engine.
pub struct I2cExtender<M, P> {
    pub(crate) regs: Registers<{ CAPACITY as usize }>,
    pub(crate) layout: Layout,
    pub(crate) status: StatusWord,
    /// Requests OR-ed into every pass, e.g. polling reads.
    pub(crate) operation: AtomicU8,
    pub(crate) guard: UpdateGuard,
    pub(crate) backoff: Backoff,
    pub(crate) halted: AtomicBool,
    has_interrupt_line: bool,
    pub(crate) platform: P,
    pub(crate) port: M,
}

impl<I2C, INT, P> I2cExtender<core::cell::RefCell<Port<I2C, INT>>, P>
where
    I2C: I2c,
    INT: InputPin,
    P: Platform,
{
    pub fn new(
        i2c: I2C,
        family: &'static Family,
        device_id: u8,
        interrupt: Option<INT>,
        platform: P,
    ) -> Self {
        Self::with_mutex(i2c, family, device_id, interrupt, platform)
    }
}

impl<I2C, INT, M, P> I2cExtender<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    pub fn with_mutex(
        i2c: I2C,
        family: &'static Family,
        device_id: u8,
        interrupt: Option<INT>,
        platform: P,
    ) -> Self {
        let has_interrupt_line = interrupt.is_some();
        let mut port = Port::new(i2c);
        if let Some(line) = interrupt {
            port = port.with_line(0, line);
        }

        Self {
            regs: Registers::new(),
            layout: Layout {
                family,
                address: family.base_address + device_id,
            },
            status: StatusWord::new(),
            operation: AtomicU8::new(0),
            guard: UpdateGuard::new(),
            backoff: Backoff::default(),
            halted: AtomicBool::new(false),
            has_interrupt_line,
            platform,
            port: PortMutex::create(port),
        }
    }

    pub fn family(&self) -> &'static Family {
        self.layout.family
    }

    /// Address of the first chip in the chain.
    pub fn address(&self) -> u8 {
        self.layout.address
    }

    /// Number of claimed pins.
    pub fn claimed_pins(&self) -> u32 {
        self.regs.claims.count()
    }

    /// Consecutive bus failures so far.
    pub fn error_count(&self) -> u8 {
        self.backoff.error_count()
    }

    /// Entry point for the handler of the dedicated interrupt line.
    ///
    /// Safe to call from interrupt context: it only flags the status word and
    /// wakes the worker.
    pub fn on_interrupt(&self) {
        self.status.request(Status::ISR_PENDING);
        self.platform.notify();
    }

    fn ensure_running(&self) -> Result<(), Error> {
        if self.halted.load(Ordering::Acquire) || self.status.load().contains(Status::STOP) {
            Err(Error::Stopped)
        } else {
            Ok(())
        }
    }

    fn request(&self, bits: Status) {
        self.status.request(bits);
        self.platform.notify();
    }

    /// Run a pass right away unless we are in interrupt context.  If one is
    /// already running elsewhere, give it time to finish.
    fn sync_pass(&self) {
        if self.platform.in_interrupt_context() {
            return;
        }
        if self.update() == Pass::Contended {
            self.platform.delay_ms(SYNC_WAIT_MS);
        }
    }

    /// Without an interrupt line, edges can only be seen by polling, so
    /// every pass reads inputs for as long as any handler is attached.
    fn update_polling(&self) {
        let polling = !self.has_interrupt_line && self.regs.handlers.any();
        let op = if polling { Status::READ_DIRTY.bits() } else { 0 };
        if self.operation.swap(op, Ordering::AcqRel) != op {
            log::debug!(
                "{}@{:#04x}: input polling {}",
                self.layout.family.name,
                self.layout.address,
                if polling { "enabled" } else { "disabled" }
            );
        }
    }
}

impl<I2C, INT, M, P> PinExtenderDriver for I2cExtender<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    fn claim(&mut self, index: u8) -> Result<(), Error> {
        self.ensure_running()?;
        self.regs.claims.claim(index)
    }

    fn free(&mut self, index: u8) {
        if self.regs.claims.check_range(index).is_ok() {
            // a freed pin keeps no handler and no polling behind it
            self.regs.handlers.remove(index);
            self.update_polling();
        }
        self.regs.claims.free(index);
    }

    fn setup_pin(&self, index: u8, attrs: PinAttributes) -> Result<(), Error> {
        self.ensure_running()?;
        self.regs.setup(index, attrs)?;
        self.request(Status::CONFIG_DIRTY);
        Ok(())
    }

    fn write_pin(&self, index: u8, high: bool) -> Result<(), Error> {
        self.ensure_running()?;
        self.regs.write(index, high)
    }

    fn read_pin(&self, index: u8) -> Result<bool, Error> {
        self.ensure_running()?;
        self.regs.claims.check_range(index)?;

        if !self.has_interrupt_line {
            self.request(Status::READ_DIRTY);
            self.sync_pass();
        }
        self.regs.read(index)
    }

    fn flush_writes(&self) -> Result<(), Error> {
        self.ensure_running()?;
        self.regs.commit_writes();
        self.request(Status::WRITE_DIRTY);
        self.sync_pass();
        Ok(())
    }

    fn attach_interrupt(
        &self,
        index: u8,
        callback: InterruptCallback,
        argument: usize,
        mode: InterruptMode,
    ) -> Result<(), Error> {
        self.ensure_running()?;
        self.regs.check_claimed(index)?;
        self.regs.handlers.install(index, callback, argument, mode)?;
        self.update_polling();
        self.request(Status::READ_DIRTY);
        Ok(())
    }

    fn detach_interrupt(&self, index: u8) -> Result<(), Error> {
        self.regs.claims.check_range(index)?;
        self.regs.handlers.remove(index);
        self.update_polling();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "i2c_extender"
    }
}
