//! Sandbox runtime: Wasmtime engine, module instantiation, and entry invocation.
//!
//! The `Sandbox` struct is the execution coordinator. `invoke` validates the
//! bytecode, creates a fresh store and instance bound to one
//! [`InvocationContext`], calls the requested entry point with the argument
//! count, and hands back the return code and captured result. The instance
//! is discarded after every call; compiled modules are cached by bytecode
//! hash.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use wasmtime::{Config, Engine, Func, Linker, Module, Store, Trap, Val, ValType, WasmBacktrace};

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::host_impl::{HostState, InvocationContext};
use crate::linker::link_imports;
use crate::validation::{validate_bytecode, validate_imports};
use crate::watchdog::Watchdog;

/// What a completed invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Value returned by the entry function (`0` if it returns nothing).
    pub return_code: i64,
    /// Bytes passed to the last `return_result` call, if any.
    pub captured_result: Option<Vec<u8>>,
    /// Wall-clock time spent, for observability only.
    pub elapsed: Duration,
}

/// The WASM execution sandbox.
///
/// Holds the engine, compiled modules, and the deadline watchdog; every
/// invocation gets its own store, linker, and instance.
pub struct Sandbox {
    engine: Engine,
    config: SandboxConfig,
    modules: Mutex<HashMap<blake3::Hash, Module>>,
    _watchdog: Option<Watchdog>,
}

impl Sandbox {
    /// Create a sandbox, starting the watchdog if a deadline is configured.
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        let engine = create_engine(&config)?;
        let watchdog = match config.deadline {
            Some(_) => Some(Watchdog::start(engine.clone(), config.epoch_tick)?),
            None => None,
        };
        Ok(Self {
            engine,
            config,
            modules: Mutex::new(HashMap::new()),
            _watchdog: watchdog,
        })
    }

    /// Sandbox configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Number of compiled modules held in the cache.
    pub fn cached_modules(&self) -> usize {
        self.modules.lock().map(|modules| modules.len()).unwrap_or(0)
    }

    /// Validated, compiled module for `bytecode`, compiling on first use.
    fn compile(&self, bytecode: &[u8]) -> Result<Module, SandboxError> {
        let hash = blake3::hash(bytecode);
        let mut modules = self
            .modules
            .lock()
            .map_err(|_| SandboxError::Internal("module cache lock poisoned".into()))?;
        if let Some(module) = modules.get(&hash) {
            return Ok(module.clone());
        }

        validate_bytecode(bytecode, &self.config)?;
        let module = Module::from_binary(&self.engine, bytecode)
            .map_err(|e| SandboxError::InvalidBytecode(format!("{:#}", e)))?;
        validate_imports(&module)?;

        debug!(hash = %hash, "compiled {} bytes of bytecode.", bytecode.len());
        modules.insert(hash, module.clone());
        Ok(module)
    }

    /// Run `entry` of `bytecode` against `context`.
    ///
    /// Guest traps, fuel exhaustion, and deadline expiry come back as
    /// `SandboxError::GuestTrap`; nothing the guest does can panic the host.
    pub fn invoke(
        &self,
        bytecode: &[u8],
        entry: &str,
        context: InvocationContext,
    ) -> Result<Outcome, SandboxError> {
        let started = Instant::now();
        let module_name = context.module_name().to_string();
        let arg_count = context.args().len();

        // 1. Validate and compile, or reuse the cached module
        let module = self.compile(bytecode)?;

        // 2. Create store with limits, fuel, and deadline
        let mut store = Store::new(&self.engine, HostState::new(context, &self.config));
        store.limiter(|state| &mut state.store_limits);
        store
            .set_fuel(self.config.fuel_limit)
            .map_err(|e| SandboxError::Internal(format!("set fuel: {:#}", e)))?;
        if let Some(ticks) = self.config.deadline_ticks() {
            store.set_epoch_deadline(ticks);
        }

        // 3. Link host imports and instantiate
        let mut linker = Linker::new(&self.engine);
        link_imports(&mut linker, &mut store, &module)?;
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| {
                if e.is::<Trap>() {
                    classify_trap(&module_name, entry, e)
                } else {
                    SandboxError::InvalidBytecode(format!("instantiate: {:#}", e))
                }
            })?;

        // 4. Resolve the entry point; there is no fallback
        let func = instance
            .get_func(&mut store, entry)
            .ok_or_else(|| SandboxError::EntryNotFound(entry.to_string()))?;

        // 5. Call it with the argument count
        let return_code = call_entry(&mut store, func, entry, arg_count)
            .map_err(|e| match e {
                EntryCall::Signature(reason) => SandboxError::InvalidBytecode(reason),
                EntryCall::Trap(err) => classify_trap(&module_name, entry, err),
            })?;

        let elapsed = started.elapsed();
        info!(
            module = %module_name,
            entry,
            return_code,
            "invocation completed in {:?}.",
            elapsed
        );

        let captured_result = store.into_data().context.into_captured_result();
        Ok(Outcome {
            return_code,
            captured_result,
            elapsed,
        })
    }
}

/// Create a Wasmtime engine for chaincode execution.
fn create_engine(config: &SandboxConfig) -> Result<Engine, SandboxError> {
    let mut wasm_config = Config::new();

    // Fuel metering bounds runaway loops
    wasm_config.consume_fuel(true);

    // Wall-clock deadline, driven by the watchdog
    wasm_config.epoch_interruption(config.deadline.is_some());

    wasm_config.wasm_threads(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.cranelift_nan_canonicalization(true);

    Engine::new(&wasm_config).map_err(|e| SandboxError::Internal(format!("engine: {:#}", e)))
}

enum EntryCall {
    Signature(String),
    Trap(anyhow::Error),
}

/// Call an entry function, passing the argument count if it takes a parameter.
fn call_entry(
    store: &mut Store<HostState>,
    func: Func,
    entry: &str,
    arg_count: usize,
) -> Result<i64, EntryCall> {
    let ty = func.ty(&*store);
    let param_types: Vec<ValType> = ty.params().collect();
    let result_types: Vec<ValType> = ty.results().collect();

    let params = match param_types.as_slice() {
        [] => vec![],
        [ValType::I32] => vec![Val::I32(arg_count as i32)],
        [ValType::I64] => vec![Val::I64(arg_count as i64)],
        _ => {
            return Err(EntryCall::Signature(format!(
                "entry {} must take no params or one integer param",
                entry
            )))
        }
    };
    let mut results = match result_types.as_slice() {
        [] => vec![],
        [ValType::I32] => vec![Val::I32(0)],
        [ValType::I64] => vec![Val::I64(0)],
        _ => {
            return Err(EntryCall::Signature(format!(
                "entry {} must return nothing or one integer",
                entry
            )))
        }
    };

    func.call(&mut *store, &params, &mut results).map_err(EntryCall::Trap)?;

    Ok(match results.first() {
        Some(Val::I32(code)) => i64::from(*code),
        Some(Val::I64(code)) => *code,
        _ => 0,
    })
}

/// Convert a guest call failure into `SandboxError::GuestTrap`.
///
/// Fuel exhaustion and deadline interruption get their own reasons; the
/// guest backtrace is logged as the trap diagnostic.
fn classify_trap(module: &str, entry: &str, err: anyhow::Error) -> SandboxError {
    let reason = match err.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => "fuel exhausted (instruction limit)".to_string(),
        Some(Trap::Interrupt) => "deadline exceeded".to_string(),
        Some(trap) => trap.to_string(),
        None => format!("{:#}", err),
    };
    match err.downcast_ref::<WasmBacktrace>() {
        Some(trace) => warn!(module, entry, "guest trapped: {}\n{}", reason, trace),
        None => warn!(module, entry, "guest trapped: {}", reason),
    }
    SandboxError::GuestTrap(reason)
}
