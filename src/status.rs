//! The status word shared between interrupt handlers, client tasks and the
//! worker, plus the guard which keeps update passes from overlapping.
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

bitflags::bitflags! {
    /// Pending work for the worker.
    ///
    /// Every bit except `STOP` is a level-triggered request which the next
    /// update pass consumes.  Requests coalesce.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Direction or inversion changed; rewrite configuration registers.
        const CONFIG_DIRTY = 0x01;
        /// Terminal.  The worker halts once it observes this.
        const STOP = 0x02;
        /// Output latches need flushing.
        const WRITE_DIRTY = 0x04;
        /// Input registers need refreshing.
        const READ_DIRTY = 0x08;
        /// An update pass is in progress.
        const BUSY = 0x10;
        /// The dedicated interrupt line changed level.
        const ISR_PENDING = 0x20;
    }
}

impl Status {
    /// Everything needed to resynchronize a device from scratch.
    pub const RESYNC: Status = Status::CONFIG_DIRTY
        .union(Status::WRITE_DIRTY)
        .union(Status::READ_DIRTY);
}

#[derive(Debug)]
pub struct StatusWord(AtomicU8);

impl StatusWord {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Add requests.  Safe to call from interrupt context.
    pub fn request(&self, bits: Status) {
        self.0.fetch_or(bits.bits(), Ordering::AcqRel);
    }

    /// Take all pending requests, leaving only `BUSY` behind until
    /// [`StatusWord::release`] is called.
    pub fn take(&self) -> Status {
        let previous = self.0.swap(Status::BUSY.bits(), Ordering::AcqRel);
        Status::from_bits_truncate(previous).difference(Status::BUSY)
    }

    /// Clear `BUSY`, keeping any requests which arrived during the pass.
    pub fn release(&self) {
        self.0.fetch_and(!Status::BUSY.bits(), Ordering::AcqRel);
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn load(&self) -> Status {
        Status::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }
}

impl Default for StatusWord {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensures at most one update pass runs at a time.
///
/// Only the test-and-set is atomic; the pass itself runs outside of any
/// critical section.
#[derive(Debug, Default)]
pub struct UpdateGuard(AtomicBool);

impl UpdateGuard {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn try_acquire(&self) -> Option<UpdateLease<'_>> {
        if self.0.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(UpdateLease(&self.0))
        }
    }
}

/// Ownership of the update pass; released on drop.
pub struct UpdateLease<'a>(&'a AtomicBool);

impl Drop for UpdateLease<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_coalesce() {
        let word = StatusWord::new();
        word.request(Status::WRITE_DIRTY);
        word.request(Status::WRITE_DIRTY | Status::READ_DIRTY);
        assert_eq!(word.take(), Status::WRITE_DIRTY | Status::READ_DIRTY);
        assert_eq!(word.load(), Status::BUSY);

        // requests made while a pass is running survive its release
        word.request(Status::ISR_PENDING);
        word.release();
        assert_eq!(word.load(), Status::ISR_PENDING);
        assert_eq!(word.take(), Status::ISR_PENDING);
        word.release();
        assert!(word.is_idle());
    }

    #[test]
    fn guard_is_exclusive() {
        let guard = UpdateGuard::new();
        let lease = guard.try_acquire().unwrap();
        assert!(guard.try_acquire().is_none());
        drop(lease);
        assert!(guard.try_acquire().is_some());
    }
}
