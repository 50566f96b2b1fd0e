//! Host-facing status codes and the backend error type.
//!
//! The numeric values in this module are part of the host ABI and must not
//! change. No internal error text ever crosses the host boundary: every
//! session entry point translates failures into one of the fixed codes.

/// PVR operation status codes as the host defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PvrStatus {
    NoError = 0,
    Unknown = -1,
    NotImplemented = -2,
    ServerError = -3,
    ServerTimeout = -4,
    RejectedByBackend = -5,
    AlreadyPresent = -6,
    InvalidParameters = -7,
    Failed = -9,
}

impl PvrStatus {
    /// The raw ABI value.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Addon lifecycle status codes as the host defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AddonStatus {
    Ok = 0,
    LostConnection = 1,
    NeedRestart = 2,
    NeedSettings = 3,
    Unknown = 4,
    NeedSavedSettings = 5,
    PermanentFailure = 6,
}

/// Errors surfaced by session entry points.
///
/// Every variant maps onto exactly one `PvrStatus`; the host bridge reports
/// the code and discards the message.
#[derive(Debug, thiserror::Error)]
pub enum PvrError {
    #[error("requested channel or capability is not implemented")]
    NotImplemented,
    #[error("upstream request failed: {0:#}")]
    Server(anyhow::Error),
    #[error("upstream request timed out")]
    ServerTimeout,
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl PvrError {
    /// Classify a fetch or parse failure, separating transport timeouts
    /// from everything else.
    pub fn from_fetch(err: anyhow::Error) -> Self {
        let timed_out = err.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest::Error>()
                .map_or(false, |e| e.is_timeout())
        });
        if timed_out {
            PvrError::ServerTimeout
        } else {
            PvrError::Server(err)
        }
    }

    /// The status code the host sees for this error.
    pub fn status(&self) -> PvrStatus {
        match self {
            PvrError::NotImplemented => PvrStatus::NotImplemented,
            PvrError::Server(_) => PvrStatus::ServerError,
            PvrError::ServerTimeout => PvrStatus::ServerTimeout,
            PvrError::InvalidParameters(_) => PvrStatus::InvalidParameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_host_abi() {
        assert_eq!(PvrStatus::NoError.code(), 0);
        assert_eq!(PvrStatus::Unknown.code(), -1);
        assert_eq!(PvrStatus::NotImplemented.code(), -2);
        assert_eq!(PvrStatus::ServerError.code(), -3);
        assert_eq!(PvrStatus::ServerTimeout.code(), -4);
        assert_eq!(PvrStatus::RejectedByBackend.code(), -5);
        assert_eq!(PvrStatus::AlreadyPresent.code(), -6);
        assert_eq!(PvrStatus::InvalidParameters.code(), -7);
        assert_eq!(PvrStatus::Failed.code(), -9);
    }

    #[test]
    fn addon_status_codes_match_host_abi() {
        assert_eq!(AddonStatus::Ok as i32, 0);
        assert_eq!(AddonStatus::LostConnection as i32, 1);
        assert_eq!(AddonStatus::NeedRestart as i32, 2);
        assert_eq!(AddonStatus::NeedSettings as i32, 3);
        assert_eq!(AddonStatus::Unknown as i32, 4);
        assert_eq!(AddonStatus::NeedSavedSettings as i32, 5);
        assert_eq!(AddonStatus::PermanentFailure as i32, 6);
    }

    #[test]
    fn error_to_status_mapping() {
        assert_eq!(PvrError::NotImplemented.status(), PvrStatus::NotImplemented);
        assert_eq!(
            PvrError::Server(anyhow::anyhow!("boom")).status(),
            PvrStatus::ServerError
        );
        assert_eq!(PvrError::ServerTimeout.status(), PvrStatus::ServerTimeout);
        assert_eq!(
            PvrError::InvalidParameters("x".to_string()).status(),
            PvrStatus::InvalidParameters
        );
    }

    #[test]
    fn non_timeout_fetch_error_is_server_error() {
        let err = PvrError::from_fetch(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status(), PvrStatus::ServerError);
    }
}
