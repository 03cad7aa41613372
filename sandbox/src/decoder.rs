//! Submission format decoding.
//!
//! A module can be submitted as hex text, as a raw `.wasm` binary, or as a
//! zip archive holding exactly one `.wasm` file. `decode` normalizes all
//! three into the raw bytecode. It has no side effects besides logging.

use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use crate::error::SandboxError;

/// The WASM magic number and version 1, rendered as hex text.
pub const WASM_HEX_PREFIX: &[u8] = b"0061736d01000000";

/// Upper bound on a decompressed archive entry.
pub const MAX_DECODED_LEN: u64 = 16 * 1024 * 1024;

/// Normalize a submission into raw WASM bytecode.
pub fn decode(raw: &[u8]) -> Result<Vec<u8>, SandboxError> {
    let text = raw.trim_ascii();
    if starts_with_ignore_case(text, WASM_HEX_PREFIX) {
        debug!("hex encoded wasm submission.");
        return hex::decode(text)
            .map_err(|e| SandboxError::UnsupportedFormat(format!("invalid hex: {}", e)));
    }

    if infer::app::is_wasm(raw) {
        debug!("wasm binary submission.");
        return Ok(raw.to_vec());
    }

    if infer::archive::is_zip(raw) {
        debug!("zip compressed submission.");
        return unzip_single(raw);
    }

    let detected = infer::get(raw)
        .map(|kind| kind.mime_type())
        .unwrap_or("unknown file type");
    Err(SandboxError::UnsupportedFormat(detected.to_string()))
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn unzip_single(raw: &[u8]) -> Result<Vec<u8>, SandboxError> {
    let mut archive = ZipArchive::new(Cursor::new(raw))
        .map_err(|e| SandboxError::UnsupportedFormat(format!("zip: {}", e)))?;
    if archive.len() != 1 {
        return Err(SandboxError::MultipleEntries(archive.len()));
    }

    let entry = archive
        .by_index(0)
        .map_err(|e| SandboxError::UnsupportedFormat(format!("zip entry: {}", e)))?;
    debug!("reading archive entry {}.", entry.name());

    let mut bytes = Vec::new();
    entry
        .take(MAX_DECODED_LEN + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| SandboxError::UnsupportedFormat(format!("zip entry: {}", e)))?;
    if bytes.len() as u64 > MAX_DECODED_LEN {
        return Err(SandboxError::UnsupportedFormat(format!(
            "archive entry exceeds {} bytes",
            MAX_DECODED_LEN
        )));
    }
    Ok(bytes)
}
