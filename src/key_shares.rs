use num_bigint::BigInt;
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

use crate::exponent::{Exponent, ExponentError};
use crate::functions::{from_unsigned_bytes, to_unsigned_bytes};
use crate::keys::{ElGamalPrivateKey, ElGamalPublicKey, KeyError};
use crate::multishare::{MultipleSharesContainer, SharesError};
use crate::shamir::{Share, SharingError, ThresholdSecretSharing};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeySharesError {
    #[error("the number of shares should be at least 1, but it was: {0}")]
    InvalidNumberOfShares(u32),
    #[error("the threshold should be at least 1, but it was: {0}")]
    InvalidThreshold(u32),
    #[error("the received ElGamal private key was empty")]
    EmptyPrivateKey,
    #[error("the received list of containers was empty")]
    NoContainers,
    #[error("container {position} holds {found} shares, expected {expected}")]
    ShareCountMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },
    #[error("container {0} comes from a different split than the first container")]
    IncompatibleContainer(usize),
    #[error("failed on sub-key {index}: {source}")]
    SubKey { index: usize, source: SharingError },
    #[error(transparent)]
    Container(#[from] SharesError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Exponent(#[from] ExponentError),
}

/// Splits every exponent of an ElGamal private key with Shamir and regroups the
/// shares so that each custodian gets one [`MultipleSharesContainer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiKeyShareSplitter {
    sharing: ThresholdSecretSharing,
}

impl MultiKeyShareSplitter {
    pub fn new(sharing: ThresholdSecretSharing) -> Self {
        MultiKeyShareSplitter { sharing }
    }

    /// Returns `number_shares` containers. Container `i` holds share `i` of every sub-key, in key order.
    pub fn split(
        &self,
        private_key: &ElGamalPrivateKey,
        number_shares: u32,
        threshold: u32,
    ) -> Result<Vec<MultipleSharesContainer>, KeySharesError> {
        if private_key.is_empty() {
            return Err(KeySharesError::EmptyPrivateKey);
        }
        if number_shares < 1 {
            return Err(KeySharesError::InvalidNumberOfShares(number_shares));
        }
        if threshold < 1 {
            return Err(KeySharesError::InvalidThreshold(threshold));
        }
        let q = private_key.group().q();

        let mut per_subkey: Vec<Vec<Share>> = Vec::with_capacity(private_key.len());
        for (index, subkey) in private_key.keys().iter().enumerate() {
            let secret = Zeroizing::new(to_unsigned_bytes(subkey.value()));
            let shares = self
                .sharing
                .split(&secret, number_shares, threshold, q)
                .map_err(|source| KeySharesError::SubKey { index, source })?;
            per_subkey.push(shares);
        }

        let mut containers = Vec::with_capacity(number_shares as usize);
        for custodian in 0..number_shares as usize {
            let serialized = per_subkey
                .iter()
                .enumerate()
                .map(|(index, shares)| {
                    self.sharing
                        .serialize(&shares[custodian])
                        .map_err(|source| KeySharesError::SubKey { index, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            containers.push(MultipleSharesContainer::new(
                number_shares,
                threshold,
                serialized,
                q.clone(),
            )?);
        }
        info!(
            subkeys = private_key.len(),
            number_shares, threshold, "split ElGamal private key"
        );
        Ok(containers)
    }

    /// Rebuilds the private key from custodian containers.
    ///
    /// Every container must match the first one in share count, number of parts, threshold
    /// and modulus. Quorum is enforced per sub-key by [`ThresholdSecretSharing::recover`].
    /// Sub-keys recovered before a failure are wiped on the way out.
    pub fn recover(
        &self,
        containers: &[MultipleSharesContainer],
        public_key: &ElGamalPublicKey,
    ) -> Result<ElGamalPrivateKey, KeySharesError> {
        let first = containers.first().ok_or(KeySharesError::NoContainers)?;
        let expected = first.shares().len();
        if let Some((position, c)) = containers
            .iter()
            .enumerate()
            .find(|(_, c)| c.shares().len() != expected)
        {
            return Err(KeySharesError::ShareCountMismatch {
                position,
                expected,
                found: c.shares().len(),
            });
        }
        if let Some(position) = containers.iter().position(|c| !c.is_compatible(first)) {
            return Err(KeySharesError::IncompatibleContainer(position));
        }
        let q = public_key.group().q();

        let mut subkeys = Vec::with_capacity(expected);
        for index in 0..expected {
            let shares = containers
                .iter()
                .map(|c| self.sharing.deserialize(&c.shares()[index]))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| KeySharesError::SubKey { index, source })?;
            let secret = self
                .sharing
                .recover(&shares)
                .map_err(|source| KeySharesError::SubKey { index, source })?;
            subkeys.push(exponent_from_bytes(q, &secret)?);
        }
        info!(subkeys = expected, containers = containers.len(), "recovered ElGamal private key");
        Ok(ElGamalPrivateKey::new(subkeys, public_key.group().clone())?)
    }
}

fn exponent_from_bytes(q: &BigInt, bytes: &[u8]) -> Result<Exponent, ExponentError> {
    Exponent::new(q.clone(), from_unsigned_bytes(bytes))
}
