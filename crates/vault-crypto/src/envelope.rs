use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::cipher::CipherRegistry;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{KdfSpec, DEFAULT_ITERATIONS};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// `kdf` field value for unencrypted envelopes.
const KDF_NONE: &str = "none";

/// Self-describing encrypted representation of a byte payload.
///
/// Serialized as a flat JSON record with base64 binary fields:
///
/// ```text
/// { "v": 1, "alg": "AES-GCM-256", "kdf": "PBKDF2-HMAC-SHA256-100000",
///   "salt": "..", "nonce": "..", "ciphertext": "..", "mac": ".." }
/// ```
///
/// Envelopes are created with a fresh random salt and nonce on every
/// encryption and are never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "alg")]
    pub algorithm: Algorithm,
    pub kdf: String,
    #[serde(with = "base64_field")]
    pub salt: Vec<u8>,
    #[serde(with = "base64_field")]
    pub nonce: Vec<u8>,
    #[serde(with = "base64_field")]
    pub ciphertext: Vec<u8>,
    #[serde(rename = "mac", with = "base64_field")]
    pub auth_tag: Vec<u8>,
}

impl Envelope {
    /// Encode to the JSON wire form.
    pub fn to_bytes(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CryptoError::Encryption {
            reason: format!("envelope serialization failed: {e}"),
        })
    }

    /// Decode from the JSON wire form. Malformed input is a decryption error.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let envelope: Self = serde_json::from_slice(bytes)
            .map_err(|e| CryptoError::decryption(format!("malformed envelope: {e}")))?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Check version and per-algorithm field lengths.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.version != ENVELOPE_VERSION {
            return Err(CryptoError::decryption(format!(
                "unsupported envelope version: {}",
                self.version
            )));
        }
        let alg = self.algorithm;
        let checks = [
            ("salt", self.salt.len(), alg.salt_len()),
            ("nonce", self.nonce.len(), alg.nonce_len()),
            ("mac", self.auth_tag.len(), alg.tag_len()),
        ];
        for (field, actual, expected) in checks {
            if actual != expected {
                return Err(CryptoError::decryption(format!(
                    "invalid {field} length for {alg}: expected {expected}, got {actual}"
                )));
            }
        }
        Ok(())
    }
}

/// Encrypt `plaintext` under `passphrase` with the default cipher registry
/// and iteration count.
pub fn encrypt(plaintext: &[u8], passphrase: &str, algorithm: Algorithm) -> CryptoResult<Envelope> {
    encrypt_with(
        &CipherRegistry::default(),
        plaintext,
        passphrase,
        algorithm,
        DEFAULT_ITERATIONS,
    )
}

/// Decrypt an envelope with the default cipher registry.
pub fn decrypt(envelope: &Envelope, passphrase: &str) -> CryptoResult<Vec<u8>> {
    decrypt_with(&CipherRegistry::default(), envelope, passphrase)
}

pub(crate) fn encrypt_with(
    registry: &CipherRegistry,
    plaintext: &[u8],
    passphrase: &str,
    algorithm: Algorithm,
    iterations: u32,
) -> CryptoResult<Envelope> {
    if !algorithm.is_encrypted() {
        return Ok(Envelope {
            version: ENVELOPE_VERSION,
            algorithm,
            kdf: KDF_NONE.to_string(),
            salt: Vec::new(),
            nonce: Vec::new(),
            ciphertext: plaintext.to_vec(),
            auth_tag: Vec::new(),
        });
    }

    let cipher = registry.get(algorithm)?;
    let kdf = KdfSpec::new(iterations)?;

    let mut rng = rand::thread_rng();
    let mut salt = vec![0u8; algorithm.salt_len()];
    rng.fill_bytes(&mut salt);
    let mut nonce = vec![0u8; algorithm.nonce_len()];
    rng.fill_bytes(&mut nonce);

    let key = kdf.derive_key(passphrase, &salt, algorithm.key_len());
    let mut ciphertext = cipher.encrypt(&key, &nonce, plaintext)?;
    let tag_start = ciphertext
        .len()
        .checked_sub(algorithm.tag_len())
        .ok_or_else(|| CryptoError::Encryption {
            reason: "cipher output shorter than its tag".into(),
        })?;
    let auth_tag = ciphertext.split_off(tag_start);

    Ok(Envelope {
        version: ENVELOPE_VERSION,
        algorithm,
        kdf: kdf.to_wire(),
        salt,
        nonce,
        ciphertext,
        auth_tag,
    })
}

pub(crate) fn decrypt_with(
    registry: &CipherRegistry,
    envelope: &Envelope,
    passphrase: &str,
) -> CryptoResult<Vec<u8>> {
    envelope.validate()?;
    let algorithm = envelope.algorithm;

    if !algorithm.is_encrypted() {
        return Ok(envelope.ciphertext.clone());
    }

    let kdf = KdfSpec::parse(&envelope.kdf)?;
    let cipher = registry
        .get(algorithm)
        .map_err(|e| CryptoError::decryption(e.to_string()))?;
    let key = kdf.derive_key(passphrase, &envelope.salt, algorithm.key_len());

    let mut sealed = Vec::with_capacity(envelope.ciphertext.len() + envelope.auth_tag.len());
    sealed.extend_from_slice(&envelope.ciphertext);
    sealed.extend_from_slice(&envelope.auth_tag);
    cipher.decrypt(&key, &envelope.nonce, &sealed)
}

mod base64_field {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
