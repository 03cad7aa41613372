//! In-memory ledger for testing.
//!
//! `MemLedger` implements `Ledger` using a `BTreeMap` behind a `RwLock`, so
//! range scans come back in key order and the ledger can be shared between
//! threads. Writes are applied immediately; there is no commit step.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::LedgerError;
use crate::ledger::{Ledger, StateIter};

/// In-memory ledger backed by `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemLedger {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with data.
    pub fn with_data(data: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns the number of entries in the ledger.
    pub fn len(&self) -> usize {
        self.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Returns true if the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, in key order.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.read().map(|data| data.clone()).unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>, LedgerError> {
        self.data
            .read()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>, LedgerError> {
        self.data
            .write()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".into()))
    }
}

fn check_key(key: &[u8]) -> Result<(), LedgerError> {
    if key.is_empty() {
        return Err(LedgerError::InvalidKey("empty key".into()));
    }
    Ok(())
}

impl Ledger for MemLedger {
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        check_key(key)?;
        Ok(self.read()?.get(key).cloned())
    }

    fn put_state(&self, key: &[u8], value: &[u8]) -> Result<(), LedgerError> {
        check_key(key)?;
        self.write()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete_state(&self, key: &[u8]) -> Result<(), LedgerError> {
        check_key(key)?;
        self.write()?.remove(key);
        Ok(())
    }

    fn state_by_range(&self, start: &[u8], end: &[u8]) -> Result<StateIter<'_>, LedgerError> {
        if start > end {
            return Ok(Box::new(std::iter::empty()));
        }
        // The lock is not held across the returned iterator.
        let entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .read()?
            .range(start.to_vec()..end.to_vec())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger() {
        let ledger = MemLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.get_state(b"missing").unwrap(), None);
    }

    #[test]
    fn test_put_and_get() {
        let ledger = MemLedger::new();
        ledger.put_state(b"key1", b"value1").unwrap();

        assert_eq!(ledger.get_state(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_overwrite() {
        let ledger = MemLedger::new();
        ledger.put_state(b"key1", b"v1").unwrap();
        ledger.put_state(b"key1", b"v2").unwrap();

        assert_eq!(ledger.get_state(b"key1").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_delete() {
        let ledger = MemLedger::new();
        ledger.put_state(b"key1", b"value1").unwrap();
        ledger.delete_state(b"key1").unwrap();
        ledger.delete_state(b"never-written").unwrap();

        assert_eq!(ledger.get_state(b"key1").unwrap(), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_empty_key_rejected() {
        let ledger = MemLedger::new();
        assert!(matches!(
            ledger.put_state(b"", b"v"),
            Err(LedgerError::InvalidKey(_))
        ));
        assert!(ledger.get_state(b"").is_err());
        assert!(ledger.delete_state(b"").is_err());
    }

    #[test]
    fn test_empty_value_allowed() {
        let ledger = MemLedger::new();
        ledger.put_state(b"empty_val", b"").unwrap();
        assert_eq!(ledger.get_state(b"empty_val").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_with_data() {
        let mut data = BTreeMap::new();
        data.insert(b"a".to_vec(), b"1".to_vec());
        data.insert(b"b".to_vec(), b"2".to_vec());

        let ledger = MemLedger::with_data(data);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get_state(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_range_is_ordered_and_half_open() {
        let ledger = MemLedger::new();
        for key in [b"c", b"a", b"d", b"b"] {
            ledger.put_state(key, b"x").unwrap();
        }
        let keys: Vec<Vec<u8>> = ledger
            .state_by_range(b"a", b"d")
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_partial_composite_scan_skips_plain_keys() {
        let ledger = MemLedger::new();
        for name in ["b", "a", "c"] {
            let key = ledger.create_composite_key("moduleData", &[name]).unwrap();
            ledger.put_state(&key, name.as_bytes()).unwrap();
        }
        ledger.put_state(b"a_balance", b"10").unwrap();
        let other = ledger.create_composite_key("otherIndex", &["z"]).unwrap();
        ledger.put_state(&other, b"z").unwrap();

        let names: Vec<String> = ledger
            .state_by_partial_composite_key("moduleData", &[])
            .unwrap()
            .map(|entry| {
                let (key, _) = entry.unwrap();
                ledger.split_composite_key(&key).unwrap().1.remove(0)
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
