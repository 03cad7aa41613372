//! Host ABI trait: host-side function signatures for WASM chaincode.
//!
//! Each method corresponds to one host function a guest module imports from
//! the `env` namespace. The sandbox owns pointer validation and the copy in
//! and out of guest memory; this trait works with Rust slices only.

use crate::error::HostError;

/// Host-side implementation of the chaincode host ABI.
///
/// The sandbox creates one implementor per invocation, bound to a single
/// module name, ledger, and argument list.
pub trait HostAbi {
    /// Emit guest debug output to the operator log.
    fn print(&mut self, message: &[u8]);

    /// Positional argument `index`, or `None` when out of range.
    fn get_parameter(&self, index: usize) -> Option<&[u8]>;

    /// Read the module-namespaced `key`. `Ok(None)` if absent.
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError>;

    /// Write `value` under the module-namespaced `key`.
    fn put_state(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError>;

    /// Delete the module-namespaced `key`.
    fn delete_state(&mut self, key: &[u8]) -> Result<(), HostError>;

    /// Capture `result` as the invocation's payload, replacing any earlier one.
    fn return_result(&mut self, result: &[u8]) -> Result<(), HostError>;
}
