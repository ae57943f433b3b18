//! The update pass of [`I2cExtender`] and the worker loop driving it.
use core::sync::atomic::Ordering;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;

use crate::bus::{Port, Transfer};
use crate::common::{Pass, Platform, POLL_INTERVAL_MS, TEARDOWN_RETRIES};
use crate::extender::I2cExtender;
use crate::status::Status;
use crate::{PortMutex, Worker};

impl<I2C, INT, M, P> Worker for I2cExtender<M, P>
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

        let pending =
            self.status.take() | Status::from_bits_truncate(self.operation.load(Ordering::Acquire));

        if pending.contains(Status::STOP) {
            self.status.clear();
            self.halted.store(true, Ordering::Release);
            log::info!(
                "{}@{:#04x}: stop requested, worker halting",
                self.layout.family.name,
                self.layout.address
            );
            return Pass::Stopped;
        }
        if pending.is_empty() {
            self.status.release();
            return Pass::Idle;
        }

        log::trace!("{}: update pass {:?}", self.layout.family.name, pending);
        self.port.lock(|port| self.service(port, pending));
        self.status.release();
        Pass::Ran
    }

    fn run(&self) {
        self.platform.worker_started();
        log::info!(
            "{}@{:#04x}: worker started",
            self.layout.family.name,
            self.layout.address
        );

        // nothing is known about the hardware yet
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

impl<I2C, INT, M, P> I2cExtender<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    fn service(&self, port: &mut Port<I2C, INT>, mut pending: Status) {
        let Port { i2c, lines, levels } = port;
        let mut bus = Transfer::new(i2c, &self.backoff);

        // Edges of the interrupt line are not reliably reported to the
        // handler on every host, so look at its level: high → low means the
        // chip has new input data.
        if pending.contains(Status::ISR_PENDING) {
            if let Some(line) = lines[0].as_mut() {
                let was_high = *levels & 1 != 0;
                let is_high = line.is_high().unwrap_or(was_high);
                if was_high && !is_high {
                    pending |= Status::READ_DIRTY;
                }
                *levels = (*levels & !1) | u8::from(is_high);
            }
        }

        if pending.contains(Status::CONFIG_DIRTY) {
            self.regs.sync_config(&mut bus, &self.layout);
            pending |= Status::WRITE_DIRTY | Status::READ_DIRTY;
        }

        if pending.contains(Status::WRITE_DIRTY) {
            self.regs.sync_writes(&mut bus, &self.layout);
        }

        if pending.contains(Status::READ_DIRTY) {
            self.regs.sync_reads(&mut bus, &self.layout, 0xff);
            // reading the inputs releases the interrupt line
            *levels |= 1;
        }

        if bus.complete() {
            // partial state can't be trusted, start over on the next pass
            self.regs.mark_all_dirty();
            self.status.request(Status::RESYNC);
        }
    }

    /// Stop the worker and release the interrupt line.
    ///
    /// Waits a bounded time for the stop to be acknowledged and returns
    /// whether it was.  No bus traffic happens once it has been.
    pub fn shutdown(&self) -> bool {
        self.status.request(Status::STOP);
        self.platform.notify();

        for _ in 0..TEARDOWN_RETRIES {
            if self.update() == Pass::Stopped {
                self.port.lock(|port| port.release_lines());
                return true;
            }
            self.platform.delay_ms(POLL_INTERVAL_MS);
        }

        log::warn!(
            "{}@{:#04x}: worker did not acknowledge stop",
            self.layout.family.name,
            self.layout.address
        );
        false
    }
}
