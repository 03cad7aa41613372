//! Write-buffering ledger overlay.
//!
//! `StagedLedger` wraps another ledger: reads fall through to it, writes and
//! deletes are held in an in-memory overlay until [`StagedLedger::commit`]
//! applies them in key order. Dropping the overlay without committing
//! discards every buffered write.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::LedgerError;
use crate::ledger::{Ledger, StateIter};

/// Buffered value per key; `None` marks a delete.
type Overlay = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Ledger whose writes stay pending until committed.
pub struct StagedLedger {
    inner: Arc<dyn Ledger>,
    pending: Mutex<Overlay>,
}

impl StagedLedger {
    pub fn new(inner: Arc<dyn Ledger>) -> Self {
        Self {
            inner,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of buffered writes and deletes.
    pub fn pending_len(&self) -> usize {
        self.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    /// Apply buffered writes to the wrapped ledger and clear the overlay.
    pub fn commit(&self) -> Result<(), LedgerError> {
        let pending = std::mem::take(&mut *self.lock()?);
        for (key, value) in pending {
            match value {
                Some(value) => self.inner.put_state(&key, &value)?,
                None => self.inner.delete_state(&key)?,
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Overlay>, LedgerError> {
        self.pending
            .lock()
            .map_err(|_| LedgerError::Backend("staged ledger lock poisoned".into()))
    }
}

impl Ledger for StagedLedger {
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(buffered) = self.lock()?.get(key) {
            return Ok(buffered.clone());
        }
        self.inner.get_state(key)
    }

    fn put_state(&self, key: &[u8], value: &[u8]) -> Result<(), LedgerError> {
        self.lock()?.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete_state(&self, key: &[u8]) -> Result<(), LedgerError> {
        self.lock()?.insert(key.to_vec(), None);
        Ok(())
    }

    fn state_by_range(&self, start: &[u8], end: &[u8]) -> Result<StateIter<'_>, LedgerError> {
        if start > end {
            return Ok(Box::new(std::iter::empty()));
        }
        let mut merged = BTreeMap::new();
        for entry in self.inner.state_by_range(start, end)? {
            let (key, value) = entry?;
            merged.insert(key, value);
        }
        for (key, value) in self.lock()?.range(start.to_vec()..end.to_vec()) {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }
        Ok(Box::new(merged.into_iter().map(Ok)))
    }
}
