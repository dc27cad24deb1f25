use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Upper bound on the iteration count, enforced when writing and when
/// reading an envelope.
pub const MAX_ITERATIONS: u32 = 10_000_000;

const PBKDF2_PREFIX: &str = "PBKDF2-HMAC-SHA256-";

/// KDF parameters as recorded in the envelope's `kdf` field
/// (`PBKDF2-HMAC-SHA256-<iterations>`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfSpec {
    pub iterations: u32,
}

impl KdfSpec {
    pub fn new(iterations: u32) -> CryptoResult<Self> {
        if iterations == 0 {
            return Err(CryptoError::Kdf("iteration count must be positive".into()));
        }
        if iterations > MAX_ITERATIONS {
            return Err(CryptoError::Kdf(format!(
                "iteration count {iterations} exceeds {MAX_ITERATIONS}"
            )));
        }
        Ok(Self { iterations })
    }

    pub fn to_wire(&self) -> String {
        format!("{PBKDF2_PREFIX}{}", self.iterations)
    }

    /// Parse the envelope's `kdf` field. Any failure is a decryption error,
    /// since it means the envelope is malformed.
    pub fn parse(wire: &str) -> CryptoResult<Self> {
        let count = wire
            .strip_prefix(PBKDF2_PREFIX)
            .ok_or_else(|| CryptoError::decryption(format!("unsupported kdf {wire:?}")))?;
        let iterations: u32 = count
            .parse()
            .map_err(|_| CryptoError::decryption(format!("invalid kdf iteration count {count:?}")))?;
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return Err(CryptoError::decryption(format!(
                "kdf iteration count out of range: {iterations}"
            )));
        }
        Ok(Self { iterations })
    }

    /// Derive a `key_len`-byte key from the passphrase and salt.
    pub fn derive_key(&self, passphrase: &str, salt: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; key_len]);
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, self.iterations, key.as_mut_slice());
        key
    }
}

impl Default for KdfSpec {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}
