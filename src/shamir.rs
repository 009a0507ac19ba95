//! Shamir threshold secret sharing over a prime field.
//!
//! A secret byte string is read as an unsigned big-endian integer `s < modulus`, hidden as
//! the constant term of a random polynomial of degree `threshold - 1`, and handed out as
//! the points `(i, f(i))` for `i = 1..=n`. Any `threshold` distinct points recover `s` by
//! Lagrange interpolation at zero.
//!
//! Serialized share layout (big-endian, 4-byte integer fields):
//!
//! ```text
//! [number_of_parts][threshold][secret_length][index]
//! [modulus_len][modulus, two's complement]
//! [value_len][value, unsigned]
//! ```

use num_bigint::BigInt;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::functions::{
    from_unsigned_bytes, is_probable_prime, to_fixed_size_bytes, to_unsigned_bytes, write_len, write_u32,
    ByteReader, FunctionError,
};
use crate::polynomial::{interpolate_at_zero, Polynomial, PolynomialError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharingError {
    #[error("number of shares must be at least 1, got {0}")]
    InvalidNumberOfShares(u32),
    #[error("threshold must be at least 1, got {0}")]
    InvalidThreshold(u32),
    #[error("threshold {threshold} is greater than the number of shares {number}")]
    ThresholdExceedsShares { threshold: u32, number: u32 },
    #[error("secret is empty")]
    EmptySecret,
    #[error("secret is too large for the modulus")]
    SecretTooLarge,
    #[error("modulus is not prime")]
    ModulusNotPrime,
    #[error("modulus must exceed the number of shares {0}")]
    ModulusTooSmall(u32),
    #[error("empty share list")]
    NoShares,
    #[error("share {0} is not compatible with the first share")]
    IncompatibleShares(usize),
    #[error("two shares carry index {0} with different values")]
    ConflictingShares(u32),
    #[error("underflow: {found} distinct shares, threshold is {threshold}")]
    InsufficientShares { found: usize, threshold: u32 },
    #[error("{0} trailing bytes after share")]
    TrailingBytes(usize),
    #[error(transparent)]
    Polynomial(#[from] PolynomialError),
    #[error(transparent)]
    Encoding(#[from] FunctionError),
}

/// One point `(index, value)` of a sharing polynomial, with the parameters of the split it came from.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Share {
    index: u32,
    value: BigInt,
    number_of_parts: u32,
    threshold: u32,
    modulus: BigInt,
    secret_length: u32,
}

impl Share {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn number_of_parts(&self) -> u32 {
        self.number_of_parts
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    pub fn secret_length(&self) -> u32 {
        self.secret_length
    }

    /// Same number of parts, threshold, modulus and secret length.
    pub fn is_compatible(&self, other: &Share) -> bool {
        self.number_of_parts == other.number_of_parts
            && self.threshold == other.threshold
            && self.modulus == other.modulus
            && self.secret_length == other.secret_length
    }

    pub fn destroy(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("index", &self.index)
            .field("value", &"<redacted>")
            .field("number_of_parts", &self.number_of_parts)
            .field("threshold", &self.threshold)
            .field("modulus", &self.modulus)
            .field("secret_length", &self.secret_length)
            .finish()
    }
}

impl Zeroize for Share {
    fn zeroize(&mut self) {
        self.value.zeroize();
    }
}

impl Drop for Share {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Stateless Shamir service. Construct one and pass it around; it holds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdSecretSharing;

impl ThresholdSecretSharing {
    pub fn new() -> Self {
        ThresholdSecretSharing
    }

    /// Splits `secret` into `n` shares, ordered by index `1..=n`. Order carries no meaning for recovery.
    pub fn split(&self, secret: &[u8], n: u32, threshold: u32, modulus: &BigInt) -> Result<Vec<Share>, SharingError> {
        self.split_with_rng(secret, n, threshold, modulus, &mut OsRng)
    }

    pub fn split_with_rng<R: RngCore + CryptoRng>(
        &self,
        secret: &[u8],
        n: u32,
        threshold: u32,
        modulus: &BigInt,
        rng: &mut R,
    ) -> Result<Vec<Share>, SharingError> {
        if n < 1 {
            return Err(SharingError::InvalidNumberOfShares(n));
        }
        if threshold < 1 {
            return Err(SharingError::InvalidThreshold(threshold));
        }
        if threshold > n {
            return Err(SharingError::ThresholdExceedsShares { threshold, number: n });
        }
        if secret.is_empty() {
            return Err(SharingError::EmptySecret);
        }
        if !is_probable_prime(modulus) {
            return Err(SharingError::ModulusNotPrime);
        }
        if BigInt::from(n) >= *modulus {
            return Err(SharingError::ModulusTooSmall(n));
        }
        let secret_length =
            u32::try_from(secret.len()).map_err(|_| FunctionError::LengthOverflow(secret.len()))?;

        let mut s = from_unsigned_bytes(secret);
        if &s >= modulus {
            s.zeroize();
            return Err(SharingError::SecretTooLarge);
        }
        let poly = Polynomial::new_random(threshold as usize - 1, &s, modulus, rng);
        s.zeroize();
        let poly = poly?;

        let mut shares = Vec::with_capacity(n as usize);
        for index in 1..=n {
            let value = poly.evaluate(&BigInt::from(index))?;
            shares.push(Share {
                index,
                value,
                number_of_parts: n,
                threshold,
                modulus: modulus.clone(),
                secret_length,
            });
        }
        debug!(n, threshold, secret_length, "split secret into shares");
        Ok(shares)
    }

    /// Recovers the secret, left-padded to its original length.
    ///
    /// Repeated shares count once. At least `threshold` distinct indices are required.
    pub fn recover(&self, shares: &[Share]) -> Result<Zeroizing<Vec<u8>>, SharingError> {
        let first = shares.first().ok_or(SharingError::NoShares)?;
        check_health(first)?;
        if let Some(i) = shares.iter().position(|s| !s.is_compatible(first)) {
            warn!(position = i, "rejected incompatible share");
            return Err(SharingError::IncompatibleShares(i));
        }

        let mut points: Vec<(BigInt, BigInt)> = Vec::with_capacity(shares.len());
        for share in shares {
            let x = BigInt::from(share.index);
            let same_value = points.iter().find(|(px, _)| *px == x).map(|(_, y)| *y == share.value);
            match same_value {
                Some(false) => return Err(SharingError::ConflictingShares(share.index)),
                Some(true) => {}
                None => points.push((x, share.value.clone())),
            }
        }
        if points.len() < first.threshold as usize {
            return Err(SharingError::InsufficientShares {
                found: points.len(),
                threshold: first.threshold,
            });
        }

        let result = if first.threshold == 1 && points.len() == 1 {
            Ok(points[0].1.clone())
        } else {
            interpolate_at_zero(&points, &first.modulus)
        };
        points.iter_mut().for_each(|(_, y)| y.zeroize());
        let mut secret = result?;
        let bytes = to_fixed_size_bytes(&secret, first.secret_length as usize);
        secret.zeroize();
        Ok(Zeroizing::new(bytes?))
    }

    pub fn serialize(&self, share: &Share) -> Result<Vec<u8>, SharingError> {
        let modulus = share.modulus.to_signed_bytes_be();
        let value = Zeroizing::new(to_unsigned_bytes(&share.value));
        let mut out = Vec::with_capacity(28 + modulus.len() + value.len());
        write_u32(&mut out, share.number_of_parts);
        write_u32(&mut out, share.threshold);
        write_u32(&mut out, share.secret_length);
        write_u32(&mut out, share.index);
        write_len(&mut out, modulus.len())?;
        out.extend_from_slice(&modulus);
        write_len(&mut out, value.len())?;
        out.extend_from_slice(&value);
        Ok(out)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Share, SharingError> {
        let mut reader = ByteReader::new(bytes);
        let number_of_parts = reader.read_u32()?;
        let threshold = reader.read_u32()?;
        let secret_length = reader.read_u32()?;
        let index = reader.read_u32()?;
        let modulus = BigInt::from_signed_bytes_be(reader.read_prefixed()?);
        let value = from_unsigned_bytes(reader.read_prefixed()?);
        let share = Share {
            index,
            value,
            number_of_parts,
            threshold,
            modulus,
            secret_length,
        };
        if reader.remaining() > 0 {
            return Err(SharingError::TrailingBytes(reader.remaining()));
        }
        Ok(share)
    }
}

fn check_health(share: &Share) -> Result<(), SharingError> {
    if share.number_of_parts < 1 {
        return Err(SharingError::InvalidNumberOfShares(share.number_of_parts));
    }
    if share.threshold < 1 {
        return Err(SharingError::InvalidThreshold(share.threshold));
    }
    if share.threshold > share.number_of_parts {
        return Err(SharingError::ThresholdExceedsShares {
            threshold: share.threshold,
            number: share.number_of_parts,
        });
    }
    if share.secret_length < 1 {
        return Err(SharingError::EmptySecret);
    }
    if !is_probable_prime(&share.modulus) {
        return Err(SharingError::ModulusNotPrime);
    }
    if BigInt::from(share.number_of_parts) >= share.modulus {
        return Err(SharingError::ModulusTooSmall(share.number_of_parts));
    }
    Ok(())
}
