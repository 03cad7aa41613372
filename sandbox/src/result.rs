//! Response construction from invocation outcomes.

use serde::Serialize;
use tracing::warn;
use wasmcc_hostapi::HOST_FAILURE;

use crate::error::{ErrorKind, SandboxError};

/// Transaction response handed back to the caller of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub payload: Vec<u8>,
}

#[derive(Serialize)]
struct FailurePayload<'a> {
    code: u16,
    kind: ErrorKind,
    reason: &'a str,
}

impl Response {
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            payload: payload.into(),
        }
    }

    pub fn failure(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            success: false,
            payload: payload.into(),
        }
    }

    /// Failure carrying a JSON `{"code","kind","reason"}` payload.
    pub fn from_error(err: &SandboxError) -> Self {
        let reason = err.to_string();
        let body = FailurePayload {
            code: err.kind().code(),
            kind: err.kind(),
            reason: &reason,
        };
        match serde_json::to_vec(&body) {
            Ok(payload) => Self::failure(payload),
            Err(e) => {
                warn!("failed to encode failure payload: {}.", e);
                Self::failure(reason)
            }
        }
    }

    /// Payload as UTF-8 text, lossily.
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl From<SandboxError> for Response {
    fn from(err: SandboxError) -> Self {
        Self::from_error(&err)
    }
}

/// Map a guest return code and captured result to a response.
///
/// Only `-1` counts as failure. A captured result always becomes the
/// payload; without one the payload is the return code in decimal.
pub fn translate(return_code: i64, captured: Option<Vec<u8>>) -> Response {
    let payload = captured.unwrap_or_else(|| return_code.to_string().into_bytes());
    Response {
        success: return_code != HOST_FAILURE,
        payload,
    }
}
