//! Test doubles shared by the unit tests.
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::status::{Status, StatusWord};
use crate::Platform;

/// Single-context platform recording what the engine asked of it.
#[derive(Debug, Default)]
pub struct TestPlatform {
    isr: Cell<bool>,
    delayed_ms: Cell<u32>,
    notified: Cell<u32>,
}

impl TestPlatform {
    pub fn set_interrupt_context(&self, isr: bool) {
        self.isr.set(isr);
    }

    pub fn delayed_ms(&self) -> u32 {
        self.delayed_ms.get()
    }

    pub fn notified(&self) -> u32 {
        self.notified.get()
    }
}

impl Platform for TestPlatform {
    fn in_interrupt_context(&self) -> bool {
        self.isr.get()
    }

    fn delay_ms(&self, ms: u32) {
        self.delayed_ms.set(self.delayed_ms.get() + ms);
    }

    fn notify(&self) {
        self.notified.set(self.notified.get() + 1);
    }
}

/// Platform for driving [`Worker::run`](crate::Worker::run) to completion.
///
/// Records every backoff sleep and, for every idle wait, whether the status
/// word was empty at that point.  Once `limit` of them have happened it
/// requests a stop on the watched status word.
pub struct LoopPlatform<'a> {
    status: OnceCell<&'a StatusWord>,
    sleeps: RefCell<Vec<u32>>,
    waits: RefCell<Vec<bool>>,
    limit: usize,
}

impl<'a> LoopPlatform<'a> {
    pub fn stopping_after(limit: usize) -> Self {
        Self {
            status: OnceCell::new(),
            sleeps: RefCell::default(),
            waits: RefCell::default(),
            limit,
        }
    }

    pub fn watch(&self, status: &'a StatusWord) {
        let _ = self.status.set(status);
    }

    pub fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }

    pub fn waits(&self) -> Vec<bool> {
        self.waits.borrow().clone()
    }

    fn tick(&self) {
        if self.sleeps.borrow().len() + self.waits.borrow().len() >= self.limit {
            if let Some(status) = self.status.get() {
                status.request(Status::STOP);
            }
        }
    }
}

impl Platform for LoopPlatform<'_> {
    fn in_interrupt_context(&self) -> bool {
        false
    }

    fn delay_ms(&self, ms: u32) {
        self.sleeps.borrow_mut().push(ms);
        self.tick();
    }

    fn notify(&self) {}

    fn wait_for_work(&self, _ms: u32) {
        let idle = self.status.get().map_or(true, |s| s.is_idle());
        self.waits.borrow_mut().push(idle);
        self.tick();
    }
}

#[derive(Default)]
struct SimState {
    /// input, output, polarity, configuration
    chips: BTreeMap<u8, [u8; 4]>,
    pins: BTreeMap<u8, u8>,
    transactions: usize,
}

/// Register-level model of 8-bit `TCA6408`-style chips, for tests where the
/// order of transactions is not deterministic.
#[derive(Clone, Default)]
pub struct SimBus(Arc<Mutex<SimState>>);

impl SimBus {
    pub fn with_chips(addresses: &[u8]) -> Self {
        let bus = Self::default();
        {
            let mut s = bus.state();
            for &a in addresses {
                s.chips.insert(a, [0x00, 0xff, 0x00, 0xff]);
            }
        }
        bus
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drive the external levels of a chip's pins.
    pub fn set_pins(&self, address: u8, levels: u8) {
        self.state().pins.insert(address, levels);
    }

    pub fn register(&self, address: u8, reg: u8) -> u8 {
        self.state().chips[&address][usize::from(reg & 3)]
    }

    pub fn transactions(&self) -> usize {
        self.state().transactions
    }
}

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut s = self.state();
        s.transactions += 1;
        let pins = s.pins.get(&address).copied().unwrap_or(0);
        let regs = s
            .chips
            .get_mut(&address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;

        let mut pointer = 0;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some((&reg, data)) = bytes.split_first() {
                        pointer = usize::from(reg & 3);
                        for &b in data {
                            regs[pointer] = b;
                        }
                    }
                }
                Operation::Read(buf) => {
                    let [_, output, polarity, config] = *regs;
                    let level = (pins & config) | (output & !config);
                    for b in buf.iter_mut() {
                        *b = if pointer == 0 {
                            level ^ polarity
                        } else {
                            regs[pointer]
                        };
                    }
                }
            }
        }
        Ok(())
    }
}
