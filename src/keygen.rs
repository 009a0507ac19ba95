use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::debug;

use crate::group::{random_exponent, GroupError, ZpSubgroup};
use crate::keys::{ElGamalKeyPair, ElGamalPrivateKey, ElGamalPublicKey, KeyError};
use crate::params::{ElGamalEncryptionParameters, ParamsError};

#[derive(Error, Debug)]
pub enum KeyGenError {
    #[error("number of keys must be at least 1, got {0}")]
    InvalidNumberOfKeys(usize),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Stateless generator of multi-element ElGamal key pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElGamalKeyPairGenerator;

impl ElGamalKeyPairGenerator {
    pub fn new() -> Self {
        ElGamalKeyPairGenerator
    }

    pub fn generate_keys(&self, group: &ZpSubgroup, n: usize) -> Result<ElGamalKeyPair, KeyGenError> {
        self.generate_keys_with_rng(group, n, &mut OsRng)
    }

    /// Verifies `params` first, so both entry points end up with the same `ZpSubgroup`.
    pub fn generate_keys_from_parameters(
        &self,
        params: &ElGamalEncryptionParameters,
        n: usize,
    ) -> Result<ElGamalKeyPair, KeyGenError> {
        let group = params.verify()?;
        self.generate_keys(&group, n)
    }

    pub fn generate_keys_with_rng<R: RngCore + CryptoRng>(
        &self,
        group: &ZpSubgroup,
        n: usize,
        rng: &mut R,
    ) -> Result<ElGamalKeyPair, KeyGenError> {
        if n < 1 {
            return Err(KeyGenError::InvalidNumberOfKeys(n));
        }
        let generator = group.generator();
        let mut private_keys = Vec::with_capacity(n);
        let mut public_keys = Vec::with_capacity(n);
        for _ in 0..n {
            let x = random_exponent(group, rng)?;
            public_keys.push(generator.exponentiate(&x)?);
            private_keys.push(x);
        }
        debug!(keys = n, q_bits = group.q().bits(), "generated ElGamal key pair");
        let public_key = ElGamalPublicKey::new(public_keys, group.clone())?;
        let private_key = ElGamalPrivateKey::new(private_keys, group.clone())?;
        Ok(ElGamalKeyPair::new(public_key, private_key)?)
    }
}
