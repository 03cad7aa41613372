//! Module registry: install, lookup, and enumeration of chaincode modules.
//!
//! Installed modules live under composite keys `("moduleData", [name])`.
//! Existence checks, reads, and writes all go through the same key, and
//! enumeration order is ledger key order.

use std::sync::Arc;

use tracing::{debug, info};
use wasmcc_hostapi::{Ledger, StagedLedger};

use crate::error::SandboxError;
use crate::host_impl::InvocationContext;
use crate::runtime::Sandbox;

/// Index label of the module records.
pub const MODULE_INDEX: &str = "moduleData";

/// Reject names that would break key namespacing or composite-key encoding.
pub fn validate_module_name(name: &str) -> Result<(), SandboxError> {
    if name.is_empty() {
        return Err(SandboxError::InvalidArguments("module name is empty".into()));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '_' | '\u{0000}' | '\u{10FFFF}')) {
        return Err(SandboxError::InvalidArguments(format!(
            "module name {:?} contains reserved character {:?}",
            name, c
        )));
    }
    Ok(())
}

/// Registry view over one ledger.
pub struct ModuleRegistry<'a> {
    sandbox: &'a Sandbox,
    ledger: Arc<dyn Ledger>,
}

impl<'a> ModuleRegistry<'a> {
    pub fn new(sandbox: &'a Sandbox, ledger: Arc<dyn Ledger>) -> Self {
        Self { sandbox, ledger }
    }

    /// Ledger this registry reads and writes.
    pub fn ledger(&self) -> Arc<dyn Ledger> {
        Arc::clone(&self.ledger)
    }

    fn record_key(&self, name: &str) -> Result<Vec<u8>, SandboxError> {
        Ok(self.ledger.create_composite_key(MODULE_INDEX, &[name])?)
    }

    /// Install `bytecode` as `name`, running its initializer with `init_args`.
    ///
    /// The initializer's writes are staged and applied only when it returns
    /// 0, together with the module record. Otherwise nothing is persisted.
    pub fn install(
        &self,
        name: &str,
        bytecode: &[u8],
        init_args: Vec<Vec<u8>>,
    ) -> Result<(), SandboxError> {
        validate_module_name(name)?;
        let key = self.record_key(name)?;
        if self.ledger.get_state(&key)?.is_some() {
            return Err(SandboxError::AlreadyExists(name.to_string()));
        }

        let entry = self.sandbox.config().init_entry.as_str();
        let staged = Arc::new(StagedLedger::new(Arc::clone(&self.ledger)));
        let context = InvocationContext::new(name, Arc::clone(&staged) as Arc<dyn Ledger>, init_args);
        let outcome = self.sandbox.invoke(bytecode, entry, context)?;
        if outcome.return_code != 0 {
            debug!(module = name, "discarding {} staged writes.", staged.pending_len());
            return Err(SandboxError::InitFailed(outcome.return_code));
        }

        staged.commit()?;
        self.ledger.put_state(&key, bytecode)?;
        info!(module = name, "installed {} bytes of bytecode.", bytecode.len());
        Ok(())
    }

    /// Bytecode of the module installed as `name`.
    ///
    /// A name that could never have been installed is simply not found.
    pub fn lookup(&self, name: &str) -> Result<Vec<u8>, SandboxError> {
        if validate_module_name(name).is_err() {
            return Err(SandboxError::NotFound(name.to_string()));
        }
        let key = self.record_key(name)?;
        self.ledger
            .get_state(&key)?
            .ok_or_else(|| SandboxError::NotFound(name.to_string()))
    }

    /// Names of all installed modules, in ledger key order.
    pub fn list(&self) -> Result<impl Iterator<Item = Result<String, SandboxError>> + '_, SandboxError> {
        debug!("listing installed modules.");
        let ledger = &self.ledger;
        let records = ledger.state_by_partial_composite_key(MODULE_INDEX, &[])?;
        Ok(records.map(move |record| -> Result<String, SandboxError> {
            let (key, _) = record?;
            let (_, parts) = ledger.split_composite_key(&key)?;
            parts
                .into_iter()
                .next()
                .ok_or_else(|| SandboxError::Internal("module record key has no name".into()))
        }))
    }
}
