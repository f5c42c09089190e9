use thiserror::Error;

/// Swap-related errors.
#[derive(Debug, Error)]
pub enum SwapError {
    /// The OS randomness source could not produce a secret.
    #[error("randomness source unavailable: {0}")]
    RandomnessFailure(String),

    /// `SHA-256(secret)` does not equal the expected hash-lock.
    #[error("SHA256(secret) != hash_lock")]
    HashMismatch,

    /// A persisted swap record is malformed or incomplete.
    #[error("invalid swap record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Reasons a [`SwapRecord`](crate::SwapRecord) is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("swap id must not be empty")]
    EmptySwapId,

    #[error("htlc address must not be empty")]
    EmptyHtlcAddress,

    #[error("secret does not hash to the recorded hash lock")]
    SecretMismatch,

    #[error("{field} must be a {expected}-byte compressed public key, got {actual} bytes")]
    PublicKeyLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("refund locktime must be non-zero")]
    ZeroLocktime,

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for RecordError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

impl From<serde_json::Error> for SwapError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidRecord(value.into())
    }
}
