//! Per-invocation state held in the Wasmtime Store.
//!
//! `InvocationContext` is what a caller hands to the coordinator: the module
//! identity, the ledger, and the positional arguments. `HostState` wraps it
//! with the host limits and the store resource limiter for the lifetime of
//! one `Store<HostState>`, and implements the host ABI over it.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use wasmtime::{StoreLimits, StoreLimitsBuilder};

use wasmcc_hostapi::{HostAbi, HostError, HostLimits, Ledger};

use crate::config::SandboxConfig;

/// Everything one invocation of a guest module may see.
///
/// Created fresh per invocation and consumed by it; nothing survives into
/// the next invocation except what was written to the ledger.
pub struct InvocationContext {
    module_name: String,
    ledger: Arc<dyn Ledger>,
    args: Vec<Vec<u8>>,
    captured_result: Option<Vec<u8>>,
}

impl InvocationContext {
    /// Create a context for `module_name` with positional `args`.
    pub fn new(module_name: impl Into<String>, ledger: Arc<dyn Ledger>, args: Vec<Vec<u8>>) -> Self {
        Self {
            module_name: module_name.into(),
            ledger,
            args,
            captured_result: None,
        }
    }

    /// Name of the module being invoked.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Positional arguments.
    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Result captured through `return_result`, if any.
    pub fn captured_result(&self) -> Option<&[u8]> {
        self.captured_result.as_deref()
    }

    /// Consume the context, yielding the captured result.
    pub fn into_captured_result(self) -> Option<Vec<u8>> {
        self.captured_result
    }

    /// Ledger key for a guest key: `"{module_name}_{key}"`.
    pub fn namespaced_key(&self, key: &[u8]) -> Vec<u8> {
        let mut namespaced = Vec::with_capacity(self.module_name.len() + 1 + key.len());
        namespaced.extend_from_slice(self.module_name.as_bytes());
        namespaced.push(b'_');
        namespaced.extend_from_slice(key);
        namespaced
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("module_name", &self.module_name)
            .field("args", &self.args.len())
            .field("captured_result", &self.captured_result.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Per-invocation mutable state held in the Wasmtime `Store`.
///
/// Dropped together with the store when the invocation ends.
pub struct HostState {
    /// The invocation this store serves.
    pub context: InvocationContext,
    /// Host ABI size limits.
    pub limits: HostLimits,
    /// Memory/table growth limiter installed on the store.
    pub store_limits: StoreLimits,
}

impl HostState {
    /// Create the host state for one invocation.
    pub fn new(context: InvocationContext, config: &SandboxConfig) -> Self {
        let store_limits = StoreLimitsBuilder::new()
            .memory_size(config.memory_bytes())
            .table_elements(config.table_size as _)
            .instances(1)
            .build();
        Self {
            context,
            limits: config.limits.clone(),
            store_limits,
        }
    }

    fn check_key(&self, key: &[u8]) -> Result<(), HostError> {
        if key.len() > self.limits.max_key_len {
            return Err(HostError::KeyTooLarge(key.len()));
        }
        Ok(())
    }
}

impl HostAbi for HostState {
    fn print(&mut self, message: &[u8]) {
        if message.len() > self.limits.max_print_len {
            debug!(module = %self.context.module_name, len = message.len(), "dropping oversized guest print.");
            return;
        }
        info!(
            target: "wasmcc::guest",
            module = %self.context.module_name,
            "{}",
            String::from_utf8_lossy(message)
        );
    }

    fn get_parameter(&self, index: usize) -> Option<&[u8]> {
        self.context.args.get(index).map(Vec::as_slice)
    }

    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError> {
        self.check_key(key)?;
        let key = self.context.namespaced_key(key);
        Ok(self.context.ledger.get_state(&key)?)
    }

    fn put_state(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError> {
        self.check_key(key)?;
        if value.len() > self.limits.max_value_len {
            return Err(HostError::ValueTooLarge(value.len()));
        }
        let key = self.context.namespaced_key(key);
        Ok(self.context.ledger.put_state(&key, value)?)
    }

    fn delete_state(&mut self, key: &[u8]) -> Result<(), HostError> {
        self.check_key(key)?;
        let key = self.context.namespaced_key(key);
        Ok(self.context.ledger.delete_state(&key)?)
    }

    fn return_result(&mut self, result: &[u8]) -> Result<(), HostError> {
        if result.len() > self.limits.max_result_len {
            return Err(HostError::ResultTooLarge(result.len()));
        }
        self.context.captured_result = Some(result.to_vec());
        Ok(())
    }
}
