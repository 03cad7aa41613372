//! `wasmcc-hostapi`: ledger accessor and host ABI definitions for the wasmcc sandbox.
//!
//! This crate defines the host-side interfaces the sandbox is built against.
//! It provides:
//!
//! - `Ledger` trait: the transactional key-value state a chaincode runs on
//! - composite key encoding used for indexed ledger entries
//! - `MemLedger`: in-memory `Ledger` for testing
//! - `StagedLedger`: overlay that buffers writes until committed
//! - `HostAbi` trait: the host functions callable from guest code
//! - `HostLimits`: per-call size limits for the host ABI
//! - `LedgerError` / `HostError`: host-side error types

pub mod error;
pub mod types;
pub mod composite;
pub mod ledger;
pub mod mem_ledger;
pub mod staged_ledger;
pub mod traits;

// Re-export commonly used types at the crate root.
pub use error::{HostError, LedgerError, HOST_FAILURE};
pub use types::HostLimits;
pub use ledger::{Ledger, StateIter};
pub use mem_ledger::MemLedger;
pub use staged_ledger::StagedLedger;
pub use traits::HostAbi;
