use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Salt length for every encrypting algorithm.
pub const SALT_LEN: usize = 16;
/// Nonce length shared by AES-GCM and ChaCha20-Poly1305 (96 bits).
pub const NONCE_LEN: usize = 12;
/// Authentication tag length shared by all supported AEADs.
pub const TAG_LEN: usize = 16;

/// Encryption algorithm recorded in every envelope.
///
/// `None` bypasses encryption and exists for debugging only; it is never
/// the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "AES-GCM-128")]
    AesGcm128,
    #[default]
    #[serde(rename = "AES-GCM-256")]
    AesGcm256,
    #[serde(rename = "ChaCha20-Poly1305")]
    ChaCha20Poly1305,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Self::None,
        Self::AesGcm128,
        Self::AesGcm256,
        Self::ChaCha20Poly1305,
    ];

    /// Name used in the envelope's `alg` field.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AesGcm128 => "AES-GCM-128",
            Self::AesGcm256 => "AES-GCM-256",
            Self::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    pub const fn is_encrypted(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Derived key length in bytes.
    pub const fn key_len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::AesGcm128 => 16,
            Self::AesGcm256 | Self::ChaCha20Poly1305 => 32,
        }
    }

    pub const fn salt_len(&self) -> usize {
        if self.is_encrypted() {
            SALT_LEN
        } else {
            0
        }
    }

    pub const fn nonce_len(&self) -> usize {
        if self.is_encrypted() {
            NONCE_LEN
        } else {
            0
        }
    }

    pub const fn tag_len(&self) -> usize {
        if self.is_encrypted() {
            TAG_LEN
        } else {
            0
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.wire_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CryptoError::decryption(format!("unknown algorithm {s:?}")))
    }
}
