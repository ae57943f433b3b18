//! Fixed-width bitsets for the per-pin register model.
//!
//! Pin state is kept in 64-bit wide maps, one bit per virtual pin.  The
//! worker moves data to and from the bus one 8-bit register group at a time,
//! so the shared variant is stored as eight independently addressable bytes.
use core::sync::atomic::{AtomicU8, Ordering};

/// Number of 8-pin register groups in a 64-bit map.
pub const GROUPS: usize = 8;

/// A plain 64-bit pin map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bits64(u64);

impl Bits64 {
    pub fn get(self, index: u8) -> bool {
        self.0 & mask(index) != 0
    }

    pub fn set(&mut self, index: u8) {
        self.0 |= mask(index);
    }

    pub fn clear(&mut self, index: u8) {
        self.0 &= !mask(index);
    }

    pub fn count_ones(self) -> u32 {
        self.0.count_ones()
    }

    /// The 8 bits belonging to register group `group`.
    pub fn byte(self, group: usize) -> u8 {
        (self.0 >> (group * 8)) as u8
    }

    /// Bitmask of the register groups which contain at least one set bit.
    pub fn groups(self) -> u8 {
        (0..GROUPS).fold(0, |acc, g| {
            if self.byte(g) != 0 {
                acc | (1 << g)
            } else {
                acc
            }
        })
    }
}

fn mask(index: u8) -> u64 {
    debug_assert!(index < 64);
    1u64 << index
}

/// A 64-bit pin map which can be shared between contexts.
///
/// Each register group is its own atomic byte, so there is no ordering
/// between groups.  That matches how the data travels on the bus.
#[derive(Debug, Default)]
pub struct AtomicBits64([AtomicU8; GROUPS]);

impl AtomicBits64 {
    pub const fn new() -> Self {
        Self([
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
        ])
    }

    pub fn get(&self, index: u8) -> bool {
        let (group, bit) = split(index);
        self.0[group].load(Ordering::Acquire) & bit != 0
    }

    /// Set the bit for `index` to `value`, returning whether it changed.
    pub fn assign(&self, index: u8, value: bool) -> bool {
        let (group, bit) = split(index);
        let previous = if value {
            self.0[group].fetch_or(bit, Ordering::AcqRel)
        } else {
            self.0[group].fetch_and(!bit, Ordering::AcqRel)
        };
        (previous & bit != 0) != value
    }

    pub fn set(&self, index: u8) -> bool {
        self.assign(index, true)
    }

    pub fn clear(&self, index: u8) -> bool {
        self.assign(index, false)
    }

    pub fn byte(&self, group: usize) -> u8 {
        self.0[group].load(Ordering::Acquire)
    }

    /// Replace a whole register group, returning the previous contents.
    pub fn swap_byte(&self, group: usize, value: u8) -> u8 {
        self.0[group].swap(value, Ordering::AcqRel)
    }
}

fn split(index: u8) -> (usize, u8) {
    debug_assert!(index < 64);
    (usize::from(index / 8), 1 << (index % 8))
}

/// Iterate the indices of the set bits in a group mask, lowest first.
pub fn each_group(mask: u8) -> impl Iterator<Item = usize> {
    (0..GROUPS).filter(move |g| mask & (1 << g) != 0)
}
