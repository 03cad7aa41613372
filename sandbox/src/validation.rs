//! WASM bytecode validation, run before anything is compiled or instantiated.
//!
//! 1. Structural validation with `wasmparser`, with the float proposal
//!    switched off unless `allow_floating_point` is set
//! 2. Import resolution: every import must resolve to a host function or
//!    global with a servable type (see [`crate::linker`])

use tracing::debug;
use wasmparser::{Validator, WasmFeatures};
use wasmtime::Module;

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::linker::resolve_import;

/// Validate raw bytecode against the sandbox's feature set.
pub fn validate_bytecode(bytecode: &[u8], config: &SandboxConfig) -> Result<(), SandboxError> {
    let mut features = WasmFeatures::default();
    features.set(WasmFeatures::FLOATS, config.allow_floating_point);

    Validator::new_with_features(features)
        .validate_all(bytecode)
        .map_err(|e| SandboxError::InvalidBytecode(e.to_string()))?;
    Ok(())
}

/// Check that every import of a compiled module resolves.
pub fn validate_imports(module: &Module) -> Result<(), SandboxError> {
    for import in module.imports() {
        let resolved = resolve_import(&import)?;
        debug!("import {}::{} resolved to {:?}.", import.module(), import.name(), resolved);
    }
    Ok(())
}
