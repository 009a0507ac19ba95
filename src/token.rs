//! Label-addressed token storage for encrypted shares.
//!
//! The token itself (smartcard session, PIN handling) lives outside this crate behind
//! [`TokenStore`]. Every call into it goes through [`RetryPolicy::run`].

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::encrypted_share::{EncryptedShareContainer, EncryptedShareError, ShareVerifier};
use crate::multishare::MultipleSharesContainer;

pub const SHARE_PUBLIC_SECTION_LABEL: &str = "share_public_section";
pub const SHARE_SIGNATURE_LABEL: &str = "share_signature";
pub const SHARE_PRIVATE_SECTION_LABEL: &str = "share_private_section";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// A fault worth retrying, e.g. the card was briefly unreachable.
    #[error("transient token fault: {0}")]
    Transient(String),
    #[error("token operation failed: {0}")]
    Failure(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("token returned no key for the share")]
    MissingKey,
    #[error(transparent)]
    Share(#[from] EncryptedShareError),
}

pub trait TokenStore {
    fn read_bytes_by_label(&mut self, label: &str) -> Result<Vec<u8>, TokenError>;

    fn write_bytes_by_label(&mut self, label: &str, bytes: &[u8], is_private: bool) -> Result<(), TokenError>;
}

/// Bounded retries with a fixed delay. Only [`TokenError::Transient`] is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 5,
            delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay_ms: u64) -> Self {
        RetryPolicy { attempts, delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn run<T, F>(&self, mut op: F) -> Result<T, TokenError>
    where
        F: FnMut() -> Result<T, TokenError>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Err(TokenError::Transient(msg)) if attempt < attempts => {
                    warn!(attempt, attempts, error = %msg, "transient token fault, retrying");
                    thread::sleep(self.delay());
                    attempt += 1;
                }
                Err(TokenError::Transient(last)) => {
                    return Err(TokenError::RetriesExhausted { attempts, last });
                }
                other => return other,
            }
        }
    }
}

/// Writes the public part and the key bytes of `share` to the token.
pub fn write_share<S: TokenStore + ?Sized>(
    store: &mut S,
    policy: &RetryPolicy,
    share: &EncryptedShareContainer,
) -> Result<(), TokenError> {
    policy.run(|| store.write_bytes_by_label(SHARE_PUBLIC_SECTION_LABEL, share.encrypted_share(), false))?;
    policy.run(|| store.write_bytes_by_label(SHARE_SIGNATURE_LABEL, share.signature(), false))?;
    policy.run(|| store.write_bytes_by_label(SHARE_PRIVATE_SECTION_LABEL, share.secret_key_bytes(), true))?;
    info!("wrote encrypted share to token");
    Ok(())
}

/// Reads, verifies and decrypts the share held on the token.
///
/// The encrypted container and the key bytes are wiped on every return path.
pub fn read_share<S, V>(store: &mut S, policy: &RetryPolicy, verifier: &V) -> Result<MultipleSharesContainer, TokenError>
where
    S: TokenStore + ?Sized,
    V: ShareVerifier + ?Sized,
{
    let encrypted = policy.run(|| store.read_bytes_by_label(SHARE_PUBLIC_SECTION_LABEL))?;
    let signature = policy.run(|| store.read_bytes_by_label(SHARE_SIGNATURE_LABEL))?;
    let share = EncryptedShareContainer::from_parts(encrypted, signature, verifier)?;
    let key = Zeroizing::new(policy.run(|| store.read_bytes_by_label(SHARE_PRIVATE_SECTION_LABEL))?);
    let container = share.decrypt(Some(key.as_slice()))?.ok_or(TokenError::MissingKey)?;
    info!(shares = container.shares().len(), "read share from token");
    Ok(container)
}
