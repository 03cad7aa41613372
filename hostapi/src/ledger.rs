//! Ledger accessor abstraction.
//!
//! `Ledger` is the transactional key-value store the chaincode runs against.
//! Its consistency and commit discipline belong to the hosting peer; the
//! sandbox only issues reads, writes, deletes, and range scans through it.
//!
//! Implementations:
//! - `MemLedger` (this crate): in-memory BTreeMap for testing
//! - `StagedLedger` (this crate): write-buffering overlay over another ledger
//! - the peer's transaction simulator, supplied by the embedding host

use crate::composite;
use crate::error::LedgerError;

/// Lazy sequence of `(key, value)` pairs produced by a range scan.
pub type StateIter<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>), LedgerError>> + 'a>;

/// Abstraction over the ledger state visible to one transaction.
///
/// Implementations are shared between concurrent invocations, so all
/// methods take `&self`.
pub trait Ledger: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Store `value` under `key`, replacing any previous value.
    fn put_state(&self, key: &[u8], value: &[u8]) -> Result<(), LedgerError>;

    /// Remove `key`. Deleting a missing key is not an error.
    fn delete_state(&self, key: &[u8]) -> Result<(), LedgerError>;

    /// Scan keys in `[start, end)` in ascending key order.
    fn state_by_range(&self, start: &[u8], end: &[u8]) -> Result<StateIter<'_>, LedgerError>;

    /// Build a composite key from an index label and ordered parts.
    fn create_composite_key(&self, index: &str, parts: &[&str]) -> Result<Vec<u8>, LedgerError> {
        composite::create_composite_key(index, parts)
    }

    /// Split a composite key into its index label and parts.
    fn split_composite_key(&self, key: &[u8]) -> Result<(String, Vec<String>), LedgerError> {
        composite::split_composite_key(key)
    }

    /// Scan every composite key under `index` whose leading parts equal `parts`.
    fn state_by_partial_composite_key(
        &self,
        index: &str,
        parts: &[&str],
    ) -> Result<StateIter<'_>, LedgerError> {
        let start = self.create_composite_key(index, parts)?;
        let end = composite::range_end(&start);
        self.state_by_range(&start, &end)
    }
}
