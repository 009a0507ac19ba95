use num_bigint::{BigInt, Sign};
use num_integer::Integer as _;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

use crate::functions::decimal;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExponentError {
    #[error("group order q must be positive, got {0}")]
    InvalidOrder(BigInt),
    #[error("exponents belong to different group orders: {left} and {right}")]
    OrderMismatch { left: BigInt, right: BigInt },
}

/// An integer in `[0, q-1]`, where `q` is the order of the subgroup it is used with.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawExponent")]
pub struct Exponent {
    #[serde(with = "decimal")]
    q: BigInt,
    #[serde(with = "decimal")]
    value: BigInt,
}

#[derive(Deserialize)]
struct RawExponent {
    #[serde(with = "decimal")]
    q: BigInt,
    #[serde(with = "decimal")]
    value: BigInt,
}

impl TryFrom<RawExponent> for Exponent {
    type Error = ExponentError;

    fn try_from(raw: RawExponent) -> Result<Self, Self::Error> {
        Exponent::new(raw.q, raw.value)
    }
}

impl Exponent {
    /// Values already in `[0, q)` are kept as given; anything else is reduced modulo `q`.
    pub fn new(q: BigInt, mut value: BigInt) -> Result<Self, ExponentError> {
        if q.sign() != Sign::Plus {
            value.zeroize();
            return Err(ExponentError::InvalidOrder(q));
        }
        let value = if value.sign() != Sign::Minus && value < q {
            value
        } else {
            value.mod_floor(&q)
        };
        Ok(Exponent { q, value })
    }

    pub fn zero(q: BigInt) -> Result<Self, ExponentError> {
        Self::new(q, BigInt::zero())
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn q(&self) -> &BigInt {
        &self.q
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn add(&self, other: &Exponent) -> Result<Exponent, ExponentError> {
        self.check_same_order(other)?;
        Ok(self.reduced(&self.value + &other.value))
    }

    pub fn subtract(&self, other: &Exponent) -> Result<Exponent, ExponentError> {
        self.check_same_order(other)?;
        Ok(self.reduced(&self.value - &other.value))
    }

    pub fn multiply(&self, other: &Exponent) -> Result<Exponent, ExponentError> {
        self.check_same_order(other)?;
        Ok(self.reduced(&self.value * &other.value))
    }

    pub fn negate(&self) -> Exponent {
        self.reduced(-&self.value)
    }

    fn reduced(&self, value: BigInt) -> Exponent {
        Exponent {
            q: self.q.clone(),
            value: value.mod_floor(&self.q),
        }
    }

    fn check_same_order(&self, other: &Exponent) -> Result<(), ExponentError> {
        if self.q != other.q {
            return Err(ExponentError::OrderMismatch {
                left: self.q.clone(),
                right: other.q.clone(),
            });
        }
        Ok(())
    }
}

impl Zeroize for Exponent {
    fn zeroize(&mut self) {
        self.value.zeroize();
        // q is public
    }
}

impl Drop for Exponent {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for Exponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exponent")
            .field("q", &self.q)
            .field("value", &"<redacted>")
            .finish()
    }
}
