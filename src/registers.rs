//! In-memory register model shared by the facade and the worker.
//!
//! The facade only ever sets bits here; the worker is the only one moving
//! them to and from the bus.  Each map has a single writer per direction
//! (facade → `output`/`staged`, worker → `input`), which is what allows the
//! model to be shared without a lock.
use core::sync::atomic::{AtomicU8, Ordering};
use embedded_hal::i2c::I2c;

use crate::bits::{each_group, AtomicBits64};
use crate::bus::Transfer;
use crate::claim::ClaimTable;
use crate::dev::family::Family;
use crate::interrupt::HandlerTable;
use crate::{Error, PinAttributes};

/// Where a chain of chips of one family sits on the bus.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub family: &'static Family,
    /// Address of the first chip in the chain.
    pub address: u8,
}

impl Layout {
    fn locate(&self, group: usize, reg: u8) -> (u8, u8) {
        self.family.locate(self.address, group, reg)
    }
}

pub(crate) struct Registers<const N: usize> {
    pub claims: ClaimTable,
    /// 1 = input.
    direction: AtomicBits64,
    invert: AtomicBits64,
    output: AtomicBits64,
    input: AtomicBits64,
    /// Groups written by `write` but not flushed yet.
    staged: AtomicU8,
    /// Groups handed to the worker for flushing.
    dirty: AtomicU8,
    pub handlers: HandlerTable<N>,
}

impl<const N: usize> Registers<N> {
    pub fn new() -> Self {
        Self {
            claims: ClaimTable::new(N as u8),
            direction: AtomicBits64::new(),
            invert: AtomicBits64::new(),
            output: AtomicBits64::new(),
            input: AtomicBits64::new(),
            staged: AtomicU8::new(0),
            dirty: AtomicU8::new(0),
            handlers: HandlerTable::new(),
        }
    }

    pub fn check_claimed(&self, index: u8) -> Result<(), Error> {
        self.claims.check_range(index)?;
        if self.claims.is_claimed(index) {
            Ok(())
        } else {
            Err(Error::NotClaimed(index))
        }
    }

    pub fn setup(&self, index: u8, attrs: PinAttributes) -> Result<(), Error> {
        self.check_claimed(index)?;

        if attrs.contains(PinAttributes::INPUT) {
            self.direction.set(index);
            if attrs.contains(PinAttributes::PULL_UP) {
                self.output.set(index);
            } else if attrs.contains(PinAttributes::PULL_DOWN) {
                self.output.clear(index);
            }
        } else if attrs.contains(PinAttributes::OUTPUT) {
            self.direction.clear(index);
            self.output
                .assign(index, attrs.contains(PinAttributes::INITIAL_ON));
        }
        self.invert
            .assign(index, attrs.contains(PinAttributes::ACTIVE_LOW));
        Ok(())
    }

    pub fn write(&self, index: u8, high: bool) -> Result<(), Error> {
        self.claims.check_range(index)?;
        if self.output.assign(index, high) {
            self.staged.fetch_or(1 << (index / 8), Ordering::AcqRel);
        }
        Ok(())
    }

    /// Hand all staged groups over to the worker.
    pub fn commit_writes(&self) {
        let staged = self.staged.swap(0, Ordering::AcqRel);
        self.dirty.fetch_or(staged, Ordering::AcqRel);
    }

    pub fn read(&self, index: u8) -> Result<bool, Error> {
        self.claims.check_range(index)?;
        Ok(self.input.get(index))
    }

    /// Forget what the hardware is believed to hold; every group gets
    /// flushed again.
    pub fn mark_all_dirty(&self) {
        self.dirty.store(0xff, Ordering::Release);
    }

    /// Write the polarity and direction registers of every claimed group.
    pub fn sync_config<I2C: I2c>(&self, bus: &mut Transfer<'_, I2C>, layout: &Layout) {
        let claimed = self.claims.groups();
        let family = layout.family;

        if let Some(polarity) = family.polarity_reg {
            for g in each_group(claimed) {
                let (addr, reg) = layout.locate(g, polarity);
                let _ = bus.write_register(addr, reg, self.invert.byte(g));
            }
        }
        for g in each_group(claimed) {
            let (addr, reg) = layout.locate(g, family.config_reg);
            let _ = bus.write_register(addr, reg, self.direction.byte(g));
        }

        self.dirty.fetch_or(claimed, Ordering::AcqRel);
    }

    /// Flush the output latches of all dirty groups.
    pub fn sync_writes<I2C: I2c>(&self, bus: &mut Transfer<'_, I2C>, layout: &Layout) {
        let dirty = self.dirty.swap(0, Ordering::AcqRel) & self.claims.groups();

        for g in each_group(dirty) {
            // active-low outputs are always inverted here; the polarity
            // registers of these chips only cover inputs
            let invert = self.invert.byte(g) & !self.direction.byte(g);
            let value = self.output.byte(g) ^ invert;
            let (addr, reg) = layout.locate(g, layout.family.output_reg);
            let _ = bus.write_register(addr, reg, value);
        }
    }

    /// Refresh the input cache for `groups` and dispatch edge handlers.
    ///
    /// A failed read keeps the previous value of its group.  The cache is
    /// fully updated before the first handler runs.
    pub fn sync_reads<I2C: I2c>(
        &self,
        bus: &mut Transfer<'_, I2C>,
        layout: &Layout,
        groups: u8,
    ) -> usize {
        let groups = groups & self.claims.groups();
        let software_invert = layout.family.polarity_reg.is_none();

        let mut previous = [0u8; crate::bits::GROUPS];
        let mut current = [0u8; crate::bits::GROUPS];
        for g in each_group(groups) {
            let (addr, reg) = layout.locate(g, layout.family.input_reg);
            previous[g] = self.input.byte(g);
            current[g] = match bus.read_register(addr, reg) {
                Ok(v) if software_invert => v ^ self.invert.byte(g),
                Ok(v) => v,
                Err(_) => previous[g],
            };
            self.input.swap_byte(g, current[g]);
        }

        each_group(groups)
            .filter(|&g| previous[g] != current[g])
            .map(|g| self.handlers.dispatch(g * 8, previous[g], current[g]))
            .sum()
    }
}
