//! Sandbox configuration.

use std::time::Duration;

use wasmcc_hostapi::HostLimits;

/// Size of one WebAssembly linear memory page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Configuration for the WASM sandbox.
///
/// Controls the guest memory and table budget, instruction fuel, the
/// wall-clock deadline, and host ABI size limits.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 128 pages = 8 MiB.
    pub memory_pages: u32,

    /// Maximum call-table elements.
    pub table_size: u32,

    /// Accept bytecode that uses `f32`/`f64` types or instructions.
    pub allow_floating_point: bool,

    /// Wasmtime fuel limit (instruction metering).
    /// Prevents infinite loops in pure guest compute.
    pub fuel_limit: u64,

    /// Wall-clock budget of a single invocation. `None` disables the watchdog.
    pub deadline: Option<Duration>,

    /// Watchdog tick granularity.
    pub epoch_tick: Duration,

    /// Per-call host ABI limits.
    pub limits: HostLimits,

    /// Entry point run by `install`.
    pub init_entry: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_pages: 128,           // 8 MiB
            table_size: 65536,
            allow_floating_point: true,
            fuel_limit: 100_000_000,
            deadline: Some(Duration::from_secs(5)),
            epoch_tick: Duration::from_millis(10),
            limits: HostLimits::default(),
            init_entry: "init".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Maximum linear memory in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.memory_pages as usize * WASM_PAGE_SIZE
    }

    /// Number of watchdog ticks the deadline spans, rounded up.
    pub fn deadline_ticks(&self) -> Option<u64> {
        let deadline = self.deadline?;
        let tick = self.epoch_tick.as_nanos().max(1);
        Some(deadline.as_nanos().div_ceil(tick).max(1) as u64)
    }
}
