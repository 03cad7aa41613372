//! Host-side limit types for the wasmcc sandbox.
//!
//! `HostLimits` bounds the size of data a guest may move across the host ABI
//! in a single call.

/// Default maximum state key length in bytes (before namespacing).
pub const MAX_KEY_LEN: usize = 256;

/// Default maximum state value length in bytes.
pub const MAX_VALUE_LEN: usize = 64 * 1024;

/// Per-call size limits enforced by the host ABI.
///
/// The guest cannot exceed them; an oversized request makes the host
/// function return `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLimits {
    /// Maximum length of a guest state key in bytes.
    pub max_key_len: usize,
    /// Maximum length of a state value in bytes.
    pub max_value_len: usize,
    /// Maximum length of a `print` message; longer messages are dropped.
    pub max_print_len: usize,
    /// Maximum length of a result captured through `return_result`.
    pub max_result_len: usize,
}

impl Default for HostLimits {
    fn default() -> Self {
        Self {
            max_key_len: MAX_KEY_LEN,
            max_value_len: MAX_VALUE_LEN,
            max_print_len: 4096,
            max_result_len: MAX_VALUE_LEN,
        }
    }
}
