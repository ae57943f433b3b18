//! Running the worker on a `std` thread.
use std::sync::{Arc, OnceLock};
use std::thread::{JoinHandle, Thread};
use std::time::Duration;

use crate::{Platform, Worker};

/// [`Platform`] for hosted targets: the worker sleeps by parking its thread
/// and [`Platform::notify`] unparks it.
#[derive(Debug, Default)]
pub struct StdPlatform {
    worker: OnceLock<Thread>,
}

impl StdPlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Platform for StdPlatform {
    fn in_interrupt_context(&self) -> bool {
        false
    }

    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }

    fn notify(&self) {
        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
    }

    fn wait_for_work(&self, ms: u32) {
        std::thread::park_timeout(Duration::from_millis(ms.into()));
    }

    fn worker_started(&self) {
        if self.worker.set(std::thread::current()).is_err() {
            log::warn!("worker started twice on the same platform");
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub name: &'static str,
    pub stack_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "i2c_handler",
            stack_size: 64 * 1024,
        }
    }
}

/// Start `extender`'s worker loop on its own thread.  The thread exits once
/// the extender has been shut down.
pub fn spawn_worker<E>(extender: Arc<E>, config: WorkerConfig) -> std::io::Result<JoinHandle<()>>
where
    E: Worker + Send + Sync + 'static,
{
    std::thread::Builder::new()
        .name(config.name.into())
        .stack_size(config.stack_size)
        .spawn(move || extender.run())
}
