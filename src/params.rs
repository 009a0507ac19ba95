//! Group parameters as supplied by the configuration layer.
//!
//! Parameters are plain data (`p`, `q`, `g` as decimal strings in JSON). They become a
//! [`ZpSubgroup`] either directly, with range checks only, or through [`ElGamalEncryptionParameters::verify`],
//! which also checks primality and the order of `g`.

use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::functions::{decimal, generate_safe_primes, is_probable_prime, FunctionError};
use crate::group::{GroupError, ZpSubgroup};

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("invalid parameters json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is not prime")]
    NotPrime(&'static str),
    #[error("q = {q} does not divide p - 1 = {p_minus_one}")]
    OrderDoesNotDivide { q: BigInt, p_minus_one: BigInt },
    #[error("generator {0} does not have order q")]
    GeneratorOrder(BigInt),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("parameter generation failed: {0}")]
    Generation(#[from] FunctionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalEncryptionParameters {
    #[serde(with = "decimal")]
    pub p: BigInt,
    #[serde(with = "decimal")]
    pub q: BigInt,
    #[serde(with = "decimal")]
    pub g: BigInt,
}

impl ElGamalEncryptionParameters {
    pub fn new(p: BigInt, q: BigInt, g: BigInt) -> Self {
        ElGamalEncryptionParameters { p, q, g }
    }

    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ParamsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Safe-prime group: `p = 2q + 1` with `p` of `bit_len` bits and `g = 4`,
    /// which as a square has order `q`.
    pub fn generate(bit_len: usize) -> Result<Self, ParamsError> {
        let (p, q) = generate_safe_primes(bit_len)?;
        debug!(bits = bit_len, "generated safe-prime group parameters");
        Ok(ElGamalEncryptionParameters {
            p,
            q,
            g: BigInt::from(4),
        })
    }

    /// Range checks only.
    pub fn group(&self) -> Result<ZpSubgroup, ParamsError> {
        Ok(ZpSubgroup::new(self.g.clone(), self.p.clone(), self.q.clone())?)
    }

    pub fn verify(&self) -> Result<ZpSubgroup, ParamsError> {
        let group = self.group()?;
        if !is_probable_prime(&self.p) {
            return Err(ParamsError::NotPrime("p"));
        }
        if !is_probable_prime(&self.q) {
            return Err(ParamsError::NotPrime("q"));
        }
        let p_minus_one = &self.p - BigInt::one();
        if !p_minus_one.mod_floor(&self.q).is_zero() {
            return Err(ParamsError::OrderDoesNotDivide {
                q: self.q.clone(),
                p_minus_one,
            });
        }
        if !group.is_group_member(&self.g) {
            return Err(ParamsError::GeneratorOrder(self.g.clone()));
        }
        debug!(p_bits = self.p.bits(), q_bits = self.q.bits(), "verified group parameters");
        Ok(group)
    }
}

impl From<&ZpSubgroup> for ElGamalEncryptionParameters {
    fn from(group: &ZpSubgroup) -> Self {
        ElGamalEncryptionParameters {
            p: group.p().clone(),
            q: group.q().clone(),
            g: group.g().clone(),
        }
    }
}
