use thiserror::Error;

/// Transaction lookup failures, classified once at the provider boundary.
///
/// No raw provider error object crosses into the reconciliation engine;
/// callers branch on these kinds, never on message text.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("payment gateway unreachable: {message}")]
    GatewayUnreachable { message: String },

    #[error("transaction does not exist")]
    NotFound,

    #[error("payment gateway error: {message}")]
    GatewayError { message: String },
}

impl From<reqwest::Error> for VerificationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            VerificationError::GatewayUnreachable {
                message: err.to_string(),
            }
        } else {
            VerificationError::GatewayError {
                message: err.to_string(),
            }
        }
    }
}

/// Payment creation failures. Retry policy is the caller's concern.
#[derive(Debug, Clone, Error)]
pub enum InitiationError {
    #[error("payment gateway unreachable: {message}")]
    GatewayUnreachable { message: String },

    #[error("payment initiation failed: {message}")]
    GatewayError { message: String },
}

impl From<reqwest::Error> for InitiationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            InitiationError::GatewayUnreachable {
                message: err.to_string(),
            }
        } else {
            InitiationError::GatewayError {
                message: err.to_string(),
            }
        }
    }
}

/// Notification dispatch failures.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("mail relay unreachable: {message}")]
    Transport { message: String },

    #[error("mail relay rejected the message with HTTP {status}")]
    Rejected { status: u16 },
}
