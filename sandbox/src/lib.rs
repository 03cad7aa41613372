//! `wasmcc-sandbox`: hosts WASM chaincode modules inside a ledger transaction.
//!
//! Modules are installed from hex text, raw `.wasm`, or a single-entry zip
//! archive, stored under the `moduleData` composite-key index, and executed
//! inside a Wasmtime sandbox that enforces:
//!
//! - **Import whitelisting:** only the `env` host functions, no WASI
//! - **Bounds-checked marshaling:** every guest offset/length is validated
//!   before the host copies bytes in or out of linear memory
//! - **State isolation:** guest keys are prefixed with the module name
//! - **Fuel and deadline:** runaway guests trap instead of hanging the peer
//! - **Memory limits:** bounded linear memory and table growth
//!
//! The primary entry point is [`Chaincode::dispatch`].

pub mod error;
pub mod config;
pub mod memory;
pub mod host_impl;
pub mod validation;
pub mod linker;
pub mod watchdog;
pub mod runtime;
pub mod decoder;
pub mod result;
pub mod registry;
pub mod chaincode;

pub use chaincode::Chaincode;
pub use config::SandboxConfig;
pub use decoder::decode;
pub use error::{ErrorKind, SandboxError};
pub use host_impl::InvocationContext;
pub use registry::ModuleRegistry;
pub use result::{translate, Response};
pub use runtime::{Outcome, Sandbox};
