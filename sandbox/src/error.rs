//! Sandbox error types.

use serde::Serialize;
use wasmcc_hostapi::LedgerError;

/// Machine-checkable failure category carried by every failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidArguments,
    AlreadyExists,
    NotFound,
    UnsupportedFormat,
    MultipleEntries,
    InvalidBytecode,
    EntryNotFound,
    InitFailed,
    GuestTrap,
    LedgerError,
    Internal,
}

impl ErrorKind {
    /// Stable numeric code reported alongside the kind.
    pub fn code(self) -> u16 {
        match self {
            Self::InvalidArguments => 100,
            Self::AlreadyExists => 101,
            Self::NotFound => 102,
            Self::UnsupportedFormat => 201,
            Self::MultipleEntries => 202,
            Self::InvalidBytecode => 203,
            Self::EntryNotFound => 204,
            Self::InitFailed => 205,
            Self::GuestTrap => 206,
            Self::LedgerError => 301,
            Self::Internal => 500,
        }
    }
}

/// Top-level error type for the sandbox crate.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Outer dispatch arguments are missing or malformed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A module with this name is already installed.
    #[error("chaincode exists with same name: {0}")]
    AlreadyExists(String),

    /// No module with this name is installed.
    #[error("no chaincode installed as {0}")]
    NotFound(String),

    /// Submission is neither hex text, WASM binary, nor a zip archive.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Zip submission holds zero or several entries.
    #[error("archive must contain exactly one entry, found {0}")]
    MultipleEntries(usize),

    /// Bytecode failed validation, compilation, import resolution, or instantiation.
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),

    /// The requested entry point is not exported.
    #[error("entry function {0} not found")]
    EntryNotFound(String),

    /// The initializer returned a non-zero code.
    #[error("chaincode init returned {0}")]
    InitFailed(i64),

    /// The guest trapped, ran out of fuel, or hit its deadline.
    #[error("guest trapped: {0}")]
    GuestTrap(String),

    /// Ledger accessor failure on the registry path.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Wasmtime engine or host setup failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SandboxError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::MultipleEntries(_) => ErrorKind::MultipleEntries,
            Self::InvalidBytecode(_) => ErrorKind::InvalidBytecode,
            Self::EntryNotFound(_) => ErrorKind::EntryNotFound,
            Self::InitFailed(_) => ErrorKind::InitFailed,
            Self::GuestTrap(_) => ErrorKind::GuestTrap,
            Self::Ledger(_) => ErrorKind::LedgerError,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
