//! Host-side error types for the wasmcc sandbox.
//!
//! `LedgerError` is returned by [`Ledger`](crate::Ledger) implementations.
//! `HostError` is the error type of the [`HostAbi`](crate::HostAbi) trait: it
//! wraps ledger failures and adds the host-only conditions (bad pointers,
//! size limits) that a guest observes as a `-1` return.

/// Return code handed to the guest when a host function fails.
pub const HOST_FAILURE: i64 = -1;

/// Errors raised by a ledger accessor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The key (or a composite key part) is not acceptable to the ledger.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The backing store failed.
    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// Errors raised by host ABI functions.
///
/// Guests never see the variant, only [`HOST_FAILURE`]. The variant is kept
/// for host-side logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// A guest-supplied offset/length pair falls outside linear memory.
    #[error("guest pointer out of bounds")]
    BadPointer,

    /// The guest module exports no linear memory.
    #[error("guest exports no memory")]
    NoMemory,

    /// A state key exceeds `max_key_len`.
    #[error("key of {0} bytes exceeds limit")]
    KeyTooLarge(usize),

    /// A state value exceeds `max_value_len`.
    #[error("value of {0} bytes exceeds limit")]
    ValueTooLarge(usize),

    /// A captured result exceeds `max_result_len`.
    #[error("result of {0} bytes exceeds limit")]
    ResultTooLarge(usize),

    /// The ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl HostError {
    /// Convert to the value returned to the WASM guest.
    pub fn to_return_code(&self) -> i64 {
        HOST_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_host_error_maps_to_failure() {
        let errors = [
            HostError::BadPointer,
            HostError::NoMemory,
            HostError::KeyTooLarge(300),
            HostError::ValueTooLarge(70_000),
            HostError::ResultTooLarge(70_000),
            HostError::Ledger(LedgerError::Backend("disk full".into())),
        ];
        for err in errors {
            assert_eq!(err.to_return_code(), -1);
        }
    }

    #[test]
    fn test_ledger_error_is_transparent() {
        let err: HostError = LedgerError::InvalidKey("empty key".into()).into();
        assert_eq!(err.to_string(), "invalid key: empty key");
    }
}
