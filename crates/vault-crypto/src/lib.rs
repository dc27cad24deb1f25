//! Envelope encryption for documents at rest.
//!
//! Plaintext bytes are sealed into a self-describing [`Envelope`]:
//! 1. PBKDF2-HMAC-SHA256 derives a key from the passphrase and a fresh salt
//! 2. An AEAD cipher (AES-GCM-128, AES-GCM-256, ChaCha20-Poly1305) encrypts
//!    the plaintext under a fresh nonce
//! 3. The envelope records version, algorithm, KDF parameters, salt, nonce,
//!    ciphertext and tag, so it can be opened without outside configuration
//!
//! All crypto operations wrap established RustCrypto implementations; there is no custom cryptography.
//!
//! Ciphers are looked up through a [`CipherRegistry`] keyed by [`Algorithm`];
//! every entry implements the [`AeadCipher`] capability trait.

pub mod algorithm;
pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod sealer;

pub use algorithm::Algorithm;
pub use cipher::{AeadCipher, CipherRegistry, RustCryptoCipher};
pub use envelope::{decrypt, encrypt, Envelope, ENVELOPE_VERSION};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{KdfSpec, DEFAULT_ITERATIONS, MAX_ITERATIONS};
pub use sealer::Sealer;
