use core::cell::Cell;
use critical_section::Mutex;

use crate::common::{InterruptCallback, InterruptMode};
use crate::Error;

#[derive(Debug, Clone, Copy)]
struct Handler {
    callback: InterruptCallback,
    argument: usize,
    mode: InterruptMode,
}

/// One optional edge handler per pin.
///
/// Slots are only locked to copy a handler in or out; handlers are always
/// invoked outside the critical section.
pub struct HandlerTable<const N: usize> {
    slots: [Mutex<Cell<Option<Handler>>>; N],
}

impl<const N: usize> HandlerTable<N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Mutex::new(Cell::new(None))),
        }
    }

    pub fn install(
        &self,
        index: u8,
        callback: InterruptCallback,
        argument: usize,
        mode: InterruptMode,
    ) -> Result<(), Error> {
        critical_section::with(|cs| {
            let slot = self.slots[usize::from(index)].borrow(cs);
            if slot.get().is_some() {
                return Err(Error::DuplicateInterrupt(index));
            }
            slot.set(Some(Handler {
                callback,
                argument,
                mode,
            }));
            Ok(())
        })
    }

    pub fn remove(&self, index: u8) {
        critical_section::with(|cs| self.slots[usize::from(index)].borrow(cs).set(None));
    }

    pub fn any(&self) -> bool {
        critical_section::with(|cs| self.slots.iter().any(|s| s.borrow(cs).get().is_some()))
    }

    /// Whether any pin in `first..first + count` has a handler.
    pub fn any_in(&self, first: usize, count: usize) -> bool {
        critical_section::with(|cs| {
            self.slots
                .iter()
                .skip(first)
                .take(count)
                .any(|s| s.borrow(cs).get().is_some())
        })
    }

    /// Fire handlers for the pins of one register group whose level went
    /// from `old` to `new`.  Returns how many handlers ran.
    pub fn dispatch(&self, first: usize, old: u8, new: u8) -> usize {
        let changed = old ^ new;
        let mut fired = 0;
        for bit in 0..8 {
            let mask = 1 << bit;
            if changed & mask == 0 || first + bit >= N {
                continue;
            }
            let handler = critical_section::with(|cs| self.slots[first + bit].borrow(cs).get());
            if let Some(h) = handler {
                if h.mode.matches(old & mask != 0, new & mask != 0) {
                    log::trace!("pin {} edge, dispatching handler", first + bit);
                    (h.callback)(h.argument);
                    fired += 1;
                }
            }
        }
        fired
    }
}

impl<const N: usize> Default for HandlerTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
