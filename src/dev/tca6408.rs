//! Queue-driven engine for up to four `TCA6408A` chips.
//!
//! Each chip at `0x20 + n` has its own interrupt line.  The line handlers
//! push the chip number into a lock-free queue and the worker only reads the
//! chips it finds there, instead of polling everything.  Chips without a
//! line fall back to being read on every pass once a handler is attached.
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use heapless::mpmc::MpMcQueue;

use crate::bus::{Backoff, Port, Transfer};
use crate::common::{
    InterruptCallback, InterruptMode, Pass, Platform, POLL_INTERVAL_MS, SYNC_WAIT_MS,
    TEARDOWN_RETRIES,
};
use crate::dev::family::TCA6408;
use crate::registers::{Layout, Registers};
use crate::status::{Status, StatusWord, UpdateGuard};
use crate::{Error, PinAttributes, PinExtenderDriver, PortMutex, Worker};

/// Chips one engine can serve.
pub const CHIPS: usize = 4;
/// Virtual pins, 8 per chip.
pub const PINS: u8 = 32;
const QUEUE_DEPTH: usize = 16;

pub struct Tca6408<M, P> {
    pub(crate) regs: Registers<{ PINS as usize }>,
    layout: Layout,
    status: StatusWord,
    guard: UpdateGuard,
    backoff: Backoff,
    halted: AtomicBool,
    queue: MpMcQueue<u8, QUEUE_DEPTH>,
    /// Chips with an interrupt line.
    lines: u8,
    /// Chips without a line that have handlers attached.
    polled: AtomicU8,
    platform: P,
    port: M,
}

impl<I2C, INT, P> Tca6408<core::cell::RefCell<Port<I2C, INT>>, P>
where
    I2C: I2c,
    INT: InputPin,
    P: Platform,
{
    pub fn new(i2c: I2C, interrupts: [Option<INT>; CHIPS], platform: P) -> Self {
        Self::with_mutex(i2c, interrupts, platform)
    }
}

impl<I2C, INT, M, P> Tca6408<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    pub fn with_mutex(i2c: I2C, interrupts: [Option<INT>; CHIPS], platform: P) -> Self {
        let mut port = Port::new(i2c);
        for (chip, line) in interrupts.into_iter().enumerate() {
            if let Some(line) = line {
                port = port.with_line(chip, line);
            }
        }
        let lines = port.line_mask();

        Self {
            regs: Registers::new(),
            layout: Layout {
                family: &TCA6408,
                address: TCA6408.base_address,
            },
            status: StatusWord::new(),
            guard: UpdateGuard::new(),
            backoff: Backoff::default(),
            halted: AtomicBool::new(false),
            queue: MpMcQueue::new(),
            lines,
            polled: AtomicU8::new(0),
            platform,
            port: PortMutex::create(port),
        }
    }

    pub fn claimed_pins(&self) -> u32 {
        self.regs.claims.count()
    }

    pub fn error_count(&self) -> u8 {
        self.backoff.error_count()
    }

    /// Entry point for the handler of chip `chip`'s interrupt line.
    ///
    /// Never blocks.  If the queue is full (or `chip` is out of range), the
    /// next pass reads every chip.
    pub fn on_interrupt(&self, chip: u8) {
        if usize::from(chip) >= CHIPS || self.queue.enqueue(chip).is_err() {
            self.status.request(Status::READ_DIRTY);
        }
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

    fn sync_pass(&self) {
        if self.platform.in_interrupt_context() {
            return;
        }
        if self.update() == Pass::Contended {
            self.platform.delay_ms(SYNC_WAIT_MS);
        }
    }

    fn update_polling(&self) {
        let polled = (0..CHIPS)
            .filter(|&chip| self.lines & (1 << chip) == 0)
            .filter(|&chip| self.regs.handlers.any_in(chip * 8, 8))
            .fold(0u8, |m, chip| m | (1 << chip));

        let previous = self.polled.swap(polled, Ordering::AcqRel);
        if previous != polled {
            log::debug!("tca6408: polling chips {:#06b}", polled);
        }
    }

    fn service(&self, port: &mut Port<I2C, INT>, mut pending: Status) {
        let mut bus = Transfer::new(&mut port.i2c, &self.backoff);

        let mut refresh = self.polled.load(Ordering::Acquire);
        while let Some(chip) = self.queue.dequeue() {
            refresh |= 1 << chip;
        }

        if pending.contains(Status::CONFIG_DIRTY) {
            self.regs.sync_config(&mut bus, &self.layout);
            pending |= Status::WRITE_DIRTY | Status::READ_DIRTY;
        }
        if pending.contains(Status::WRITE_DIRTY) {
            self.regs.sync_writes(&mut bus, &self.layout);
        }
        if pending.contains(Status::READ_DIRTY) {
            refresh = 0xff;
        }
        if refresh != 0 {
            self.regs.sync_reads(&mut bus, &self.layout, refresh);
        }

        if bus.complete() {
            self.regs.mark_all_dirty();
            self.status.request(Status::RESYNC);
        }
    }

    /// Stop the worker and release the interrupt lines.  See
    /// [`I2cExtender::shutdown`](crate::I2cExtender::shutdown).
    pub fn shutdown(&self) -> bool {
        self.request(Status::STOP);

        for _ in 0..TEARDOWN_RETRIES {
            if self.update() == Pass::Stopped {
                self.port.lock(|port| port.release_lines());
                return true;
            }
            self.platform.delay_ms(POLL_INTERVAL_MS);
        }
        log::warn!("tca6408: worker did not acknowledge stop");
        false
    }
}

impl<I2C, INT, M, P> Worker for Tca6408<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    fn update(&self) -> Pass {
        let Some(_lease) = self.guard.try_acquire() else {
            return Pass::Contended;
        };
        if self.halted.load(Ordering::Acquire) {
            return Pass::Stopped;
        }

        let pending = self.status.take();
        if pending.contains(Status::STOP) {
            self.status.clear();
            self.halted.store(true, Ordering::Release);
            log::info!("tca6408: stop requested, worker halting");
            return Pass::Stopped;
        }
        if pending.is_empty() && self.polled.load(Ordering::Acquire) == 0 {
            self.status.release();
            return Pass::Idle;
        }

        self.port.lock(|port| self.service(port, pending));
        self.status.release();
        Pass::Ran
    }

    fn run(&self) {
        self.platform.worker_started();
        log::info!("tca6408: worker started, lines {:#06b}", self.lines);
        self.status.request(Status::RESYNC);

        loop {
            match self.update() {
                Pass::Stopped => return,
                Pass::Contended => {
                    self.platform.wait_for_work(POLL_INTERVAL_MS);
                    continue;
                }
                Pass::Idle | Pass::Ran => {}
            }

            let backoff = self.backoff.delay_ms();
            if backoff != 0 {
                self.platform.delay_ms(backoff);
            }
            if self.status.is_idle() {
                self.platform.wait_for_work(POLL_INTERVAL_MS);
            }
        }
    }
}

impl<I2C, INT, M, P> PinExtenderDriver for Tca6408<M, P>
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

        let chip = index / 8;
        if self.lines & (1 << chip) == 0 {
            self.on_interrupt(chip);
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
        "tca6408"
    }
}
