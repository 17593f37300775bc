//! Response definitions
//!
//! Outcomes handed back to the request layer.

use crate::error::StrataError;
use crate::record::KeyValue;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    BadRequest = 0x03,
}

/// A response to send to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Set acknowledged
    Ok,

    /// Value for a Get
    Value(Vec<u8>),

    /// Previous value for a Del
    Deleted(Vec<u8>),

    /// Live pairs for a GetAll, sorted by key
    Entries(Vec<KeyValue>),

    /// Key absent or deleted
    NotFound,

    /// The request itself was invalid
    BadRequest(String),

    /// Storage failure (I/O, corrupt segment, ...)
    Error(String),
}

impl Response {
    /// Map an engine error to the response a caller sees
    pub fn from_error(error: StrataError) -> Self {
        match error {
            StrataError::KeyNotFound => Response::NotFound,
            StrataError::InvalidArgument(msg) => Response::BadRequest(msg),
            other => {
                tracing::warn!(error = %other, "request failed");
                Response::Error(other.to_string())
            }
        }
    }

    /// Get the status code
    pub fn status(&self) -> Status {
        match self {
            Response::Ok | Response::Value(_) | Response::Deleted(_) | Response::Entries(_) => {
                Status::Ok
            }
            Response::NotFound => Status::NotFound,
            Response::BadRequest(_) => Status::BadRequest,
            Response::Error(_) => Status::Error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status() == Status::Ok
    }
}
