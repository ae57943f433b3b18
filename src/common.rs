use crate::Error;

/// Idle time between worker iterations when nothing is pending.
pub const POLL_INTERVAL_MS: u32 = 10;
/// How long a client waits when another context is already running a pass.
pub const SYNC_WAIT_MS: u32 = 15;
/// Number of poll intervals teardown waits for the worker to acknowledge.
pub const TEARDOWN_RETRIES: u32 = 10;

bitflags::bitflags! {
    /// Capabilities requested for a pin during setup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PinAttributes: u16 {
        const INPUT = 1 << 0;
        const OUTPUT = 1 << 1;
        const PULL_UP = 1 << 2;
        const PULL_DOWN = 1 << 3;
        const ACTIVE_LOW = 1 << 4;
        const INITIAL_ON = 1 << 5;
        const INTERRUPT = 1 << 6;
    }
}

/// Which transitions of an input fire its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    Rising,
    Falling,
    Change,
}

impl InterruptMode {
    /// Does this mode match a transition from `was_high` to `is_high`?
    pub fn matches(self, was_high: bool, is_high: bool) -> bool {
        let rising = !was_high && is_high;
        let falling = was_high && !is_high;

        match self {
            InterruptMode::Rising => rising,
            InterruptMode::Falling => falling,
            InterruptMode::Change => rising || falling,
        }
    }
}

/// Handler for input edges.  Receives the argument it was attached with.
///
/// Handlers run on the worker, never in interrupt context, so they are free
/// to log or even use the bus.
pub type InterruptCallback = fn(argument: usize);

/// Services the host platform provides to the engine.
pub trait Platform {
    /// Whether the caller is running inside an interrupt handler.
    fn in_interrupt_context(&self) -> bool;

    /// Block the calling task.
    fn delay_ms(&self, ms: u32);

    /// Wake the worker.  Must not block and must be callable from interrupt
    /// context.
    fn notify(&self);

    /// Idle wait of the worker; may return early once [`Platform::notify`]
    /// is called.
    fn wait_for_work(&self, ms: u32) {
        self.delay_ms(ms);
    }

    /// Called from the worker task before its first pass.
    fn worker_started(&self) {}
}

impl<P: Platform + ?Sized> Platform for &P {
    fn in_interrupt_context(&self) -> bool {
        (**self).in_interrupt_context()
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn notify(&self) {
        (**self).notify()
    }

    fn wait_for_work(&self, ms: u32) {
        (**self).wait_for_work(ms)
    }

    fn worker_started(&self) {
        (**self).worker_started()
    }
}

/// The capability set through which the firmware uses extender-backed pins
/// just like native GPIO.
///
/// Pin operations never touch the bus themselves.  They update the
/// in-memory model and leave the transfer to the worker (or to an update
/// pass run inline where the operation says so).
pub trait PinExtenderDriver {
    fn claim(&mut self, index: u8) -> Result<(), Error>;
    fn free(&mut self, index: u8);

    fn setup_pin(&self, index: u8, attrs: PinAttributes) -> Result<(), Error>;

    /// Change the output latch.  Nothing reaches the device before
    /// [`PinExtenderDriver::flush_writes`].
    fn write_pin(&self, index: u8, high: bool) -> Result<(), Error>;
    fn read_pin(&self, index: u8) -> Result<bool, Error>;
    fn flush_writes(&self) -> Result<(), Error>;

    fn attach_interrupt(
        &self,
        index: u8,
        callback: InterruptCallback,
        argument: usize,
        mode: InterruptMode,
    ) -> Result<(), Error>;
    fn detach_interrupt(&self, index: u8) -> Result<(), Error>;

    fn name(&self) -> &'static str;
}

/// Outcome of a single update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Another context is running a pass right now.
    Contended,
    /// Nothing was pending.
    Idle,
    /// Pending work was serviced.
    Ran,
    /// `Stop` was observed; the extender must not be used any more.
    Stopped,
}

/// The background side of an extender.
pub trait Worker {
    /// Run at most one update pass.
    fn update(&self) -> Pass;

    /// Worker loop.  Returns once a stop request has been observed.
    fn run(&self);
}

#[cfg(test)]
mod tests {
    use super::InterruptMode;

    #[test]
    fn edge_matching() {
        assert!(InterruptMode::Rising.matches(false, true));
        assert!(!InterruptMode::Rising.matches(true, false));
        assert!(InterruptMode::Falling.matches(true, false));
        assert!(!InterruptMode::Falling.matches(false, true));
        assert!(InterruptMode::Change.matches(false, true));
        assert!(InterruptMode::Change.matches(true, false));
        assert!(!InterruptMode::Change.matches(true, true));
    }
}
