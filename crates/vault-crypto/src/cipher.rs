use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, Nonce};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;

use crate::algorithm::Algorithm;
use crate::error::{CryptoError, CryptoResult};

/// Capability interface for an authenticated cipher.
///
/// `encrypt` returns the ciphertext with the authentication tag appended;
/// `decrypt` expects the same layout. Implementations must reject keys and
/// nonces of the wrong length with an error rather than panicking.
pub trait AeadCipher: Send + Sync {
    /// The algorithm this cipher implements.
    fn algorithm(&self) -> Algorithm;

    /// Key size in bits.
    fn key_bits(&self) -> usize {
        self.algorithm().key_len() * 8
    }

    fn encrypt(&self, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    fn decrypt(&self, key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// [`AeadCipher`] backed by a RustCrypto AEAD implementation.
pub struct RustCryptoCipher<C> {
    algorithm: Algorithm,
    _cipher: PhantomData<fn() -> C>,
}

impl<C> RustCryptoCipher<C> {
    pub const fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            _cipher: PhantomData,
        }
    }

    fn check_lengths(&self, key: &[u8], nonce: &[u8]) -> Result<(), String> {
        if key.len() != self.algorithm.key_len() {
            return Err(format!(
                "invalid key length for {}: expected {}, got {}",
                self.algorithm,
                self.algorithm.key_len(),
                key.len()
            ));
        }
        if nonce.len() != self.algorithm.nonce_len() {
            return Err(format!(
                "invalid nonce length for {}: expected {}, got {}",
                self.algorithm,
                self.algorithm.nonce_len(),
                nonce.len()
            ));
        }
        Ok(())
    }
}

impl<C> AeadCipher for RustCryptoCipher<C>
where
    C: Aead + KeyInit,
{
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn encrypt(&self, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.check_lengths(key, nonce)
            .map_err(|reason| CryptoError::Encryption { reason })?;
        let cipher = C::new_from_slice(key).map_err(|e| CryptoError::Encryption {
            reason: format!("{} key init failed: {e}", self.algorithm),
        })?;
        cipher
            .encrypt(Nonce::<C>::from_slice(nonce), plaintext)
            .map_err(|e| CryptoError::Encryption {
                reason: format!("{} encryption failed: {e}", self.algorithm),
            })
    }

    fn decrypt(&self, key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.check_lengths(key, nonce).map_err(CryptoError::decryption)?;
        let cipher = C::new_from_slice(key)
            .map_err(|e| CryptoError::decryption(format!("{} key init failed: {e}", self.algorithm)))?;
        cipher
            .decrypt(Nonce::<C>::from_slice(nonce), ciphertext)
            .map_err(|_| {
                CryptoError::decryption("authentication failed: wrong passphrase or corrupted data")
            })
    }
}

/// Registry of available ciphers keyed by [`Algorithm`].
///
/// The default registry carries AES-GCM-128, AES-GCM-256 and
/// ChaCha20-Poly1305. `Algorithm::None` is never registered: it bypasses
/// the cipher layer entirely.
#[derive(Clone)]
pub struct CipherRegistry {
    ciphers: HashMap<Algorithm, Arc<dyn AeadCipher>>,
}

impl CipherRegistry {
    /// A registry with no ciphers.
    pub fn empty() -> Self {
        Self {
            ciphers: HashMap::new(),
        }
    }

    /// Register (or replace) the cipher for its algorithm.
    pub fn register(&mut self, cipher: Arc<dyn AeadCipher>) {
        self.ciphers.insert(cipher.algorithm(), cipher);
    }

    pub fn get(&self, algorithm: Algorithm) -> CryptoResult<Arc<dyn AeadCipher>> {
        self.ciphers
            .get(&algorithm)
            .cloned()
            .ok_or(CryptoError::UnsupportedAlgorithm(algorithm))
    }

    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.ciphers.contains_key(&algorithm)
    }

    /// Registered algorithms, in wire-name order.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        let mut algs: Vec<Algorithm> = self.ciphers.keys().copied().collect();
        algs.sort_by_key(|alg| alg.wire_name());
        algs
    }
}

impl Default for CipherRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(RustCryptoCipher::<Aes128Gcm>::new(Algorithm::AesGcm128)));
        registry.register(Arc::new(RustCryptoCipher::<Aes256Gcm>::new(Algorithm::AesGcm256)));
        registry.register(Arc::new(RustCryptoCipher::<ChaCha20Poly1305>::new(
            Algorithm::ChaCha20Poly1305,
        )));
        registry
    }
}

impl fmt::Debug for CipherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherRegistry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}
