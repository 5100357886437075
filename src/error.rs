//! Domain error types. Errors internal to a session never escape it; this
//! enum exists so handlers can express *why* without resorting to ad-hoc
//! strings, and the session engine can map each variant onto the right
//! `ERR_MSG` code.

use thiserror::Error;

use crate::core::message_ids::ErrorCode;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message {kind} is missing required field {field}")]
    MissingField { kind: i32, field: &'static str },

    #[error("unknown message ID: {0}")]
    UnknownMessageId(i32),

    #[error("max message rate exceeded")]
    RateExceeded,

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
}

impl ProtocolError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ProtocolError::MissingField { .. } => ErrorCode::ServerError,
            ProtocolError::UnknownMessageId(_) => ErrorCode::UnknownId,
            ProtocolError::RateExceeded => ErrorCode::MaxRateExceeded,
            ProtocolError::HandshakeFailed(_) => ErrorCode::ServerError,
        }
    }
}
