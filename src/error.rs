use thiserror::Error;

/// Result alias used across the payment core.
pub type PayResult<T> = std::result::Result<T, PayError>;

/// Shown when the backend rejects an operation without a message of its own.
pub const GENERIC_FAILURE: &str = "The transaction could not be completed. Please try again.";

/// Failure taxonomy for the payment flows. Every variant is recoverable:
/// the current step stops and control returns to the caller at the same
/// screen. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum PayError {
    /// Caught before any network call; rendered inline next to the field.
    #[error("{0}")]
    Validation(String),

    /// Request-to-pay amount under the configured floor. Local check only.
    #[error("amount {amount} is below the minimum of {min}")]
    BelowMinimum { amount: u64, min: u64 },

    /// No account matched the username/phone/id/token. Retryable.
    #[error("recipient not found")]
    NotFound,

    /// The scanned code is corrupt or foreign. Distinct from not-found.
    #[error("this QR code is not a valid payment code")]
    InvalidPayload,

    /// Sender and recipient resolve to the same account.
    #[error("you cannot send funds to your own account")]
    SelfTransfer,

    /// Cancellation of a token the server already considers terminal.
    #[error("this payment code is no longer active")]
    TokenTerminal,

    /// Backend said no; message is surfaced verbatim when present.
    #[error("{0}")]
    Backend(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl PayError {
    /// Whether the same input can sensibly be retried without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PayError::NotFound | PayError::Backend(_) | PayError::Network(_)
        )
    }
}
