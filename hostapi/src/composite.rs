//! Composite ledger keys.
//!
//! A composite key is `U+0000 index U+0000 part1 U+0000 part2 U+0000 ...`.
//! The leading `U+0000` keeps composite keys out of the plain keyspace, and
//! since no label or part may contain `U+0000` or `U+10FFFF`, all keys that
//! share a partial prefix sort between the prefix and the prefix followed by
//! `U+10FFFF`.

use crate::error::LedgerError;

const DELIMITER: char = '\u{0000}';
const MAX_RUNE: char = '\u{10FFFF}';

fn validate_component(component: &str) -> Result<(), LedgerError> {
    if component.contains(DELIMITER) || component.contains(MAX_RUNE) {
        return Err(LedgerError::InvalidKey(format!(
            "composite key component {:?} contains a reserved character",
            component
        )));
    }
    Ok(())
}

/// Build a composite key from an index label and ordered parts.
pub fn create_composite_key(index: &str, parts: &[&str]) -> Result<Vec<u8>, LedgerError> {
    validate_component(index)?;
    let mut key = String::with_capacity(2 + index.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>());
    key.push(DELIMITER);
    key.push_str(index);
    key.push(DELIMITER);
    for part in parts {
        validate_component(part)?;
        key.push_str(part);
        key.push(DELIMITER);
    }
    Ok(key.into_bytes())
}

/// Split a composite key back into its index label and parts.
pub fn split_composite_key(key: &[u8]) -> Result<(String, Vec<String>), LedgerError> {
    let text = std::str::from_utf8(key)
        .map_err(|_| LedgerError::InvalidKey("composite key is not valid UTF-8".into()))?;
    let body = text
        .strip_prefix(DELIMITER)
        .ok_or_else(|| LedgerError::InvalidKey("not a composite key".into()))?;
    let body = body
        .strip_suffix(DELIMITER)
        .ok_or_else(|| LedgerError::InvalidKey("unterminated composite key".into()))?;

    let mut components = body.split(DELIMITER).map(str::to_owned);
    let index = components.next().unwrap_or_default();
    Ok((index, components.collect()))
}

/// Exclusive upper bound of the range holding every key that starts with `prefix`.
pub fn range_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    let mut buf = [0u8; 4];
    end.extend_from_slice(MAX_RUNE.encode_utf8(&mut buf).as_bytes());
    end
}
