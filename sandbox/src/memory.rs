//! Safe WASM linear memory read/write helpers with bounds checking.
//!
//! Every guest-supplied offset/length pair is checked against the current
//! size of linear memory before any byte is copied. Out-of-bounds access
//! yields `HostError::BadPointer`, which the guest sees as `-1`.
//!
//! Callers pass the memory slice obtained for the current host call only;
//! nothing here keeps a view into guest memory.

use wasmtime::Val;
use wasmcc_hostapi::HostError;

/// Borrow `len` bytes of guest memory at `ptr`.
pub fn guest_slice(mem: &[u8], ptr: u32, len: u32) -> Result<&[u8], HostError> {
    let start = ptr as usize;
    let end = validate_range(mem.len(), ptr, len as usize)?;
    Ok(&mem[start..end])
}

/// Copy `len` bytes out of guest memory at `ptr`.
pub fn read_bytes(mem: &[u8], ptr: u32, len: u32) -> Result<Vec<u8>, HostError> {
    guest_slice(mem, ptr, len).map(<[u8]>::to_vec)
}

/// Write `data` to guest memory at `ptr`.
///
/// Nothing is written unless the whole range `[ptr, ptr+data.len())` fits.
pub fn write_bytes(mem: &mut [u8], ptr: u32, data: &[u8]) -> Result<(), HostError> {
    let start = ptr as usize;
    let end = validate_range(mem.len(), ptr, data.len())?;
    mem[start..end].copy_from_slice(data);
    Ok(())
}

/// Check that `[ptr, ptr+len)` lies within a memory of `mem_size` bytes.
/// Returns the exclusive end offset.
pub fn validate_range(mem_size: usize, ptr: u32, len: usize) -> Result<usize, HostError> {
    let end = (ptr as usize)
        .checked_add(len)
        .ok_or(HostError::BadPointer)?;
    if end > mem_size {
        return Err(HostError::BadPointer);
    }
    Ok(end)
}

/// Interpret a guest integer argument as a 32-bit offset, length, or index.
///
/// `i32` values are reinterpreted as unsigned (addresses above 2 GiB are
/// negative in `i32`); `i64` values must fit in `u32`.
pub fn val_to_u32(val: &Val) -> Option<u32> {
    match val {
        Val::I32(v) => Some(*v as u32),
        Val::I64(v) => u32::try_from(*v).ok(),
        _ => None,
    }
}
