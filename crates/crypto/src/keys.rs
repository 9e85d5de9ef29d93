//! Key material and primitive encryption operations
//!
//! Symmetric payloads use AES-256-GCM with a random 96-bit nonce prepended to the
//! ciphertext. Symmetric keys are transported to the enclave with RSA-OAEP (SHA-256)
//! under the enclave's attested public key.

use crate::error::{PrimitiveError, PrimitiveResult};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

/// Symmetric key size in bytes (AES-256)
pub const SYMMETRIC_KEY_SIZE: usize = 32;
/// AES-GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;
/// Modulus size of enclave encryption keys
pub const RSA_KEY_BITS: usize = 2048;

/// Per-call symmetric key, zeroized on drop
pub struct SymmetricKey {
    key: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Fresh key from the OS CSPRNG
    pub fn generate() -> Self {
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let key: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.key
    }
}

impl Zeroize for SymmetricKey {
    fn zeroize(&mut self) {
        self.key.zeroize();
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Encrypt `plaintext` as `nonce || ciphertext`
pub fn encrypt_message(key: &SymmetricKey, plaintext: &[u8]) -> PrimitiveResult<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| PrimitiveError::Encryption)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a `nonce || ciphertext` message
pub fn decrypt_message(key: &SymmetricKey, message: &[u8]) -> PrimitiveResult<Vec<u8>> {
    if message.len() < NONCE_SIZE {
        return Err(PrimitiveError::Truncated(message.len()));
    }
    let (nonce_bytes, ciphertext) = message.split_at(NONCE_SIZE);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| PrimitiveError::Authentication)
}

/// Generate an enclave encryption key pair
pub fn generate_encryption_key() -> PrimitiveResult<RsaPrivateKey> {
    Ok(RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)?)
}

/// Public key as published on the ledger: base64 of DER SubjectPublicKeyInfo
pub fn encode_public_key(key: &RsaPublicKey) -> PrimitiveResult<String> {
    let der = key.to_public_key_der()?;
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Inverse of [`encode_public_key`]
pub fn decode_public_key(encoded: &str) -> PrimitiveResult<RsaPublicKey> {
    let der = STANDARD.decode(encoded.trim())?;
    Ok(RsaPublicKey::from_public_key_der(&der)?)
}

/// Wrap a symmetric key for the enclave
pub fn wrap_key(public_key: &RsaPublicKey, key: &SymmetricKey) -> PrimitiveResult<Vec<u8>> {
    Ok(public_key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())?)
}

/// Unwrap a symmetric key inside the enclave
pub fn unwrap_key(private_key: &RsaPrivateKey, wrapped: &[u8]) -> PrimitiveResult<SymmetricKey> {
    let mut bytes = private_key.decrypt(Oaep::new::<Sha256>(), wrapped)?;
    let key = SymmetricKey::from_slice(&bytes);
    let len = bytes.len();
    bytes.zeroize();
    key.ok_or(PrimitiveError::KeyLength(len))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate();
        let message = encrypt_message(&key, b"confidential").unwrap();

        assert_eq!(message.len(), NONCE_SIZE + b"confidential".len() + 16);
        assert_eq!(decrypt_message(&key, &message).unwrap(), b"confidential");
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let message = encrypt_message(&SymmetricKey::generate(), b"confidential").unwrap();
        assert!(decrypt_message(&SymmetricKey::generate(), &message).is_err());
    }

    #[test]
    fn test_decrypt_tampered() {
        let key = SymmetricKey::generate();
        let mut message = encrypt_message(&key, b"confidential").unwrap();
        let last = message.len() - 1;
        message[last] ^= 0xFF;

        assert!(matches!(
            decrypt_message(&key, &message),
            Err(PrimitiveError::Authentication)
        ));
        assert!(matches!(
            decrypt_message(&key, &message[..4]),
            Err(PrimitiveError::Truncated(4))
        ));
    }

    #[test]
    fn test_nonce_is_random() {
        let key = SymmetricKey::generate();
        let a = encrypt_message(&key, b"same").unwrap();
        let b = encrypt_message(&key, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_transport() {
        let private_key = test_keys::enclave_key();
        let encoded = encode_public_key(&private_key.to_public_key()).unwrap();
        let public_key = decode_public_key(&encoded).unwrap();

        let key = SymmetricKey::generate();
        let wrapped = wrap_key(&public_key, &key).unwrap();
        let unwrapped = unwrap_key(private_key, &wrapped).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_decode_public_key_errors() {
        assert!(matches!(
            decode_public_key("%%%"),
            Err(PrimitiveError::Base64(_))
        ));
        assert!(matches!(
            decode_public_key("AAAA"),
            Err(PrimitiveError::PublicKey(_))
        ));
    }

    #[test]
    fn test_symmetric_key_from_slice() {
        assert!(SymmetricKey::from_slice(&[0u8; 16]).is_none());
        let key = SymmetricKey::from_slice(&[7u8; 32]).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; 32]);
        assert_eq!(format!("{:?}", key), "SymmetricKey(..)");
    }
}
