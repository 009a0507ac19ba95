//! Tamper-evident envelope for a [`MultipleSharesContainer`] stored on an untrusted token.
//!
//! The serialized container is encrypted with AES-256-GCM under a fresh key; the 12-byte
//! nonce is prepended to the ciphertext. The ciphertext (nonce included) is signed by the
//! share-issuing authority. The public part is `(encrypted_share, signature)`, the private
//! part is the 32 key bytes, which the custodian's token keeps behind its PIN.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::multishare::{MultipleSharesContainer, SharesError};

pub const SYMMETRIC_KEY_LENGTH: usize = 32;
pub const NONCE_LENGTH: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptedShareError {
    #[error("signature over the encrypted share is not valid")]
    InvalidSignature,
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("encryption of the share failed")]
    Encryption,
    #[error("decryption of the share failed")]
    DecryptionFailed,
    #[error("symmetric key must be {SYMMETRIC_KEY_LENGTH} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("encrypted share of {0} bytes is too short")]
    Truncated(usize),
    #[error(transparent)]
    Container(#[from] SharesError),
}

/// Produces the signature stored next to an encrypted share.
pub trait ShareSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, EncryptedShareError>;
}

/// Checks a signature produced by the matching [`ShareSigner`].
pub trait ShareVerifier {
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 over the SHA-256 digest of the data.
impl ShareSigner for SigningKey {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, EncryptedShareError> {
        let digest = Sha256::digest(data);
        Ok(Signer::sign(self, &digest).to_bytes().to_vec())
    }
}

impl ShareVerifier for VerifyingKey {
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let digest = Sha256::digest(data);
        Verifier::verify(self, &digest, &signature).is_ok()
    }
}

pub struct EncryptedShareContainer {
    encrypted_share: Vec<u8>,
    signature: Vec<u8>,
    secret_key_bytes: Vec<u8>,
}

impl EncryptedShareContainer {
    /// Encrypts `container` under a fresh key and signs the result.
    pub fn encrypt<S: ShareSigner + ?Sized>(
        container: &MultipleSharesContainer,
        signer: &S,
    ) -> Result<Self, EncryptedShareError> {
        let plaintext = container.serialize()?;
        let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LENGTH]);
        OsRng.fill_bytes(&mut key[..]);
        let mut nonce = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| EncryptedShareError::Encryption)?;
        let mut encrypted_share = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        encrypted_share.extend_from_slice(&nonce);
        encrypted_share.extend_from_slice(&ciphertext);

        let signature = signer.sign(&encrypted_share)?;
        debug!(bytes = encrypted_share.len(), "encrypted share container");
        Ok(EncryptedShareContainer {
            encrypted_share,
            signature,
            secret_key_bytes: key.to_vec(),
        })
    }

    /// Accepts a persisted public part only if `signature` verifies over `encrypted_share`.
    /// On failure both buffers are wiped before returning.
    pub fn from_parts<V: ShareVerifier + ?Sized>(
        encrypted_share: Vec<u8>,
        signature: Vec<u8>,
        verifier: &V,
    ) -> Result<Self, EncryptedShareError> {
        let candidate = EncryptedShareContainer {
            encrypted_share,
            signature,
            secret_key_bytes: Vec::new(),
        };
        if !verifier.verify(&candidate.encrypted_share, &candidate.signature) {
            warn!("rejected encrypted share with invalid signature");
            return Err(EncryptedShareError::InvalidSignature);
        }
        Ok(candidate)
    }

    pub fn encrypted_share(&self) -> &[u8] {
        &self.encrypted_share
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Empty for containers rebuilt with [`Self::from_parts`].
    pub fn secret_key_bytes(&self) -> &[u8] {
        &self.secret_key_bytes
    }

    /// Returns `Ok(None)` without touching the ciphertext when no key is supplied.
    pub fn decrypt(&self, key: Option<&[u8]>) -> Result<Option<MultipleSharesContainer>, EncryptedShareError> {
        let Some(key) = key else {
            return Ok(None);
        };
        if key.len() != SYMMETRIC_KEY_LENGTH {
            return Err(EncryptedShareError::InvalidKeyLength(key.len()));
        }
        if self.encrypted_share.len() < NONCE_LENGTH {
            return Err(EncryptedShareError::Truncated(self.encrypted_share.len()));
        }
        let (nonce, ciphertext) = self.encrypted_share.split_at(NONCE_LENGTH);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| EncryptedShareError::DecryptionFailed)?,
        );
        Ok(Some(MultipleSharesContainer::deserialize(&plaintext)?))
    }

    pub fn destroy(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for EncryptedShareContainer {
    fn zeroize(&mut self) {
        self.encrypted_share.as_mut_slice().zeroize();
        self.signature.as_mut_slice().zeroize();
        self.secret_key_bytes.as_mut_slice().zeroize();
    }
}

impl Drop for EncryptedShareContainer {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for EncryptedShareContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedShareContainer")
            .field("encrypted_share", &self.encrypted_share.len())
            .field("signature", &self.signature.len())
            .field("secret_key_bytes", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn container() -> MultipleSharesContainer {
        MultipleSharesContainer::new(3, 2, vec![vec![1, 2, 3], vec![4, 5]], BigInt::from(1019)).unwrap()
    }

    fn signing_key() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn test_encrypt_and_decrypt() {
        let sk = signing_key();
        let encrypted = EncryptedShareContainer::encrypt(&container(), &sk).unwrap();
        assert_eq!(encrypted.secret_key_bytes().len(), SYMMETRIC_KEY_LENGTH);

        let restored = EncryptedShareContainer::from_parts(
            encrypted.encrypted_share().to_vec(),
            encrypted.signature().to_vec(),
            &sk.verifying_key(),
        )
        .unwrap();
        let decrypted = restored.decrypt(Some(encrypted.secret_key_bytes())).unwrap();
        assert_eq!(decrypted, Some(container()));
    }

    #[test]
    fn test_decrypt_without_key_is_noop() {
        let encrypted = EncryptedShareContainer::encrypt(&container(), &signing_key()).unwrap();
        assert_eq!(encrypted.decrypt(None), Ok(None));
    }

    #[test]
    fn test_tampered_share_rejected() {
        let sk = signing_key();
        let encrypted = EncryptedShareContainer::encrypt(&container(), &sk).unwrap();
        for bit in [0usize, 8 * NONCE_LENGTH, 8 * encrypted.encrypted_share().len() - 1] {
            let mut tampered = encrypted.encrypted_share().to_vec();
            tampered[bit / 8] ^= 1 << (bit % 8);
            let result =
                EncryptedShareContainer::from_parts(tampered, encrypted.signature().to_vec(), &sk.verifying_key());
            assert_eq!(result.unwrap_err(), EncryptedShareError::InvalidSignature);
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let sk = signing_key();
        let encrypted = EncryptedShareContainer::encrypt(&container(), &sk).unwrap();
        let mut signature = encrypted.signature().to_vec();
        signature[10] ^= 0x40;
        let result =
            EncryptedShareContainer::from_parts(encrypted.encrypted_share().to_vec(), signature, &sk.verifying_key());
        match result {
            Err(EncryptedShareError::InvalidSignature) => {}
            _ => panic!("Expected InvalidSignature error"),
        }
        let other = signing_key();
        let result = EncryptedShareContainer::from_parts(
            encrypted.encrypted_share().to_vec(),
            encrypted.signature().to_vec(),
            &other.verifying_key(),
        );
        assert!(matches!(result, Err(EncryptedShareError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_key() {
        let encrypted = EncryptedShareContainer::encrypt(&container(), &signing_key()).unwrap();
        let wrong = [7u8; SYMMETRIC_KEY_LENGTH];
        assert_eq!(encrypted.decrypt(Some(&wrong[..])), Err(EncryptedShareError::DecryptionFailed));
        assert_eq!(
            encrypted.decrypt(Some(&wrong[..16])),
            Err(EncryptedShareError::InvalidKeyLength(16))
        );
    }

    #[test]
    fn test_destroy() {
        let mut encrypted = EncryptedShareContainer::encrypt(&container(), &signing_key()).unwrap();
        encrypted.destroy();
        assert!(encrypted.encrypted_share().iter().all(|b| *b == 0));
        assert!(encrypted.signature().iter().all(|b| *b == 0));
        assert!(encrypted.secret_key_bytes().iter().all(|b| *b == 0));
        assert!(!format!("{:?}", encrypted).contains("secret_key_bytes: ["));
    }
}
