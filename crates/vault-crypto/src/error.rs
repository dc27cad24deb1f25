use crate::algorithm::Algorithm;

/// Errors from envelope encryption and decryption.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Authentication failure, malformed envelope, or wrong passphrase.
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    #[error("no cipher registered for algorithm {0}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("key derivation failed: {0}")]
    Kdf(String),
}

impl CryptoError {
    pub(crate) fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures of the decrypt path.
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption { .. })
    }
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
