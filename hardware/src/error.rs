//! Error type shared by all driver calls.

use thiserror::Error;

/// A fault raised by a driver call.
///
/// The panel surfaces these as user-facing notifications, so `Display`
/// is the underlying fault message verbatim with no prefix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The driver rejected or failed the call.
    #[error("{0}")]
    Fault(String),
}

impl DriverError {
    pub fn fault(msg: impl Into<String>) -> Self {
        DriverError::Fault(msg.into())
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
