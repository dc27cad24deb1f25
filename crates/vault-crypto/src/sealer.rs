use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::algorithm::Algorithm;
use crate::cipher::CipherRegistry;
use crate::envelope::{decrypt_with, encrypt_with, Envelope};
use crate::error::CryptoResult;
use crate::kdf::DEFAULT_ITERATIONS;

/// Passphrase-bound envelope codec.
///
/// Bundles the cipher registry, passphrase, algorithm and iteration count
/// so callers can seal and open payloads without threading configuration
/// through every call. The passphrase is zeroized on drop.
#[derive(Clone)]
pub struct Sealer {
    registry: Arc<CipherRegistry>,
    passphrase: Arc<Zeroizing<String>>,
    algorithm: Algorithm,
    iterations: u32,
}

impl Sealer {
    pub fn new(passphrase: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            registry: Arc::new(CipherRegistry::default()),
            passphrase: Arc::new(Zeroizing::new(passphrase.into())),
            algorithm,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_registry(mut self, registry: Arc<CipherRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Envelope> {
        encrypt_with(
            &self.registry,
            plaintext,
            &self.passphrase,
            self.algorithm,
            self.iterations,
        )
    }

    /// Decrypt with whatever algorithm and KDF parameters the envelope
    /// records, not the sealer's own settings.
    pub fn decrypt(&self, envelope: &Envelope) -> CryptoResult<Vec<u8>> {
        decrypt_with(&self.registry, envelope, &self.passphrase)
    }

    /// Encrypt and encode to the envelope wire form.
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.encrypt(plaintext)?.to_bytes()
    }

    /// Decode the envelope wire form and decrypt.
    pub fn open(&self, bytes: &[u8]) -> CryptoResult<Vec<u8>> {
        let envelope = Envelope::from_bytes(bytes)?;
        self.decrypt(&envelope)
    }
}

impl fmt::Debug for Sealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealer")
            .field("algorithm", &self.algorithm)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer(alg: Algorithm) -> Sealer {
        Sealer::new("hunter2", alg).with_iterations(10)
    }

    #[test]
    fn seal_open_roundtrip() {
        let s = sealer(Algorithm::AesGcm256);
        let bytes = s.seal(b"{\"a\":1}").unwrap();
        assert_eq!(s.open(&bytes).unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn open_follows_envelope_parameters() {
        let writer = sealer(Algorithm::ChaCha20Poly1305).with_iterations(25);
        let bytes = writer.seal(b"payload").unwrap();

        // Different configured algorithm and iterations, same passphrase.
        let reader = sealer(Algorithm::AesGcm128);
        assert_eq!(reader.open(&bytes).unwrap(), b"payload");
    }

    #[test]
    fn wrong_passphrase_fails() {
        let bytes = sealer(Algorithm::AesGcm128).seal(b"x").unwrap();
        let other = Sealer::new("hunter3", Algorithm::AesGcm128).with_iterations(10);
        assert!(other.open(&bytes).unwrap_err().is_decryption());
    }

    #[test]
    fn seal_refuses_unreadable_iteration_count() {
        let s = sealer(Algorithm::AesGcm128).with_iterations(crate::kdf::MAX_ITERATIONS + 1);
        let err = s.seal(b"x").unwrap_err();
        assert!(matches!(err, crate::error::CryptoError::Kdf(_)));
    }

    #[test]
    fn debug_hides_passphrase() {
        let debug = format!("{:?}", sealer(Algorithm::AesGcm256));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("AesGcm256"));
    }
}
