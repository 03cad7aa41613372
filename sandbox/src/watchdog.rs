//! Wall-clock deadline enforcement.
//!
//! The engine runs with epoch interruption enabled. A single ticker thread
//! per [`Sandbox`](crate::Sandbox) advances the engine epoch every
//! `epoch_tick`; each store gets an epoch deadline of
//! [`SandboxConfig::deadline_ticks`](crate::SandboxConfig::deadline_ticks)
//! ticks, so a guest still running when its deadline passes traps with
//! `Trap::Interrupt`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;
use wasmtime::Engine;

use crate::error::SandboxError;

/// Background epoch ticker. Stops when dropped.
#[derive(Debug)]
pub struct Watchdog {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start ticking `engine`'s epoch every `tick`.
    pub fn start(engine: Engine, tick: Duration) -> Result<Self, SandboxError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("wasmcc-watchdog".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(tick);
                    engine.increment_epoch();
                }
            })
            .map_err(|e| SandboxError::Internal(format!("spawn watchdog: {}", e)))?;
        debug!("watchdog started with {:?} tick.", tick);
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
