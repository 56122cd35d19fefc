//! crates/chirp_core/src/error.rs
//!
//! The business-rule error taxonomy every service method reports in.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The input is malformed or the requested state transition is invalid.
    #[error("{0}")]
    BadRequest(String),
    /// A uniqueness rule would be broken.
    #[error("{0}")]
    Conflict(String),
    /// The actor does not own the resource.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    /// Storage or other infrastructure failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<PortError> for ServiceError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => ServiceError::NotFound(msg),
            PortError::Conflict(msg) => ServiceError::Conflict(msg),
            PortError::Unexpected(msg) => ServiceError::Internal(msg),
        }
    }
}

impl ServiceError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServiceError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_keep_their_meaning() {
        let not_found = ServiceError::from(PortError::NotFound("Tweet".into()));
        assert!(matches!(not_found, ServiceError::NotFound(m) if m == "Tweet"));
        let conflict = ServiceError::from(PortError::Conflict("likes_pkey".into()));
        assert!(matches!(conflict, ServiceError::Conflict(_)));
        let unexpected = ServiceError::from(PortError::Unexpected("pool closed".into()));
        assert!(matches!(unexpected, ServiceError::Internal(_)));
    }
}
