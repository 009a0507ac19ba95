use num_bigint::BigInt;
use num_traits::One;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exponent::{Exponent, ExponentError};
use crate::functions::{decimal, mod_inverse, mod_mul, mod_pow, random_bits, FunctionError};

/// Bit length of exponents drawn by [`short_random_exponent`].
pub const SHORT_EXPONENT_BIT_LENGTH: u64 = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("{label} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        label: &'static str,
        value: BigInt,
        min: BigInt,
        max: BigInt,
    },
    #[error("operands belong to different groups: expected (p={expected_p}, q={expected_q}), found (p={found_p}, q={found_q})")]
    IncompatibleGroups {
        expected_p: BigInt,
        expected_q: BigInt,
        found_p: BigInt,
        found_q: BigInt,
    },
    #[error("exponent order {found} does not match group order {expected}")]
    ExponentOrderMismatch { expected: BigInt, found: BigInt },
    #[error("{0} is not a member of the group")]
    NotGroupMember(BigInt),
    #[error("short exponents need a group order of at least {required} bits, q has {found}")]
    OrderTooSmallForShortExponent { required: u64, found: u64 },
    #[error(transparent)]
    Arithmetic(#[from] FunctionError),
    #[error(transparent)]
    Exponent(#[from] ExponentError),
}

fn check_range(label: &'static str, value: &BigInt, min: BigInt, max: BigInt) -> Result<(), GroupError> {
    if *value < min || *value > max {
        return Err(GroupError::OutOfRange {
            label,
            value: value.clone(),
            min,
            max,
        });
    }
    Ok(())
}

/// The prime-order subgroup of `Z_p^*` of order `q` generated by `g`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSubgroup")]
pub struct ZpSubgroup {
    #[serde(with = "decimal")]
    g: BigInt,
    #[serde(with = "decimal")]
    p: BigInt,
    #[serde(with = "decimal")]
    q: BigInt,
}

#[derive(Deserialize)]
struct RawSubgroup {
    #[serde(with = "decimal")]
    g: BigInt,
    #[serde(with = "decimal")]
    p: BigInt,
    #[serde(with = "decimal")]
    q: BigInt,
}

impl TryFrom<RawSubgroup> for ZpSubgroup {
    type Error = GroupError;

    fn try_from(raw: RawSubgroup) -> Result<Self, Self::Error> {
        ZpSubgroup::new(raw.g, raw.p, raw.q)
    }
}

impl ZpSubgroup {
    pub fn new(g: BigInt, p: BigInt, q: BigInt) -> Result<Self, GroupError> {
        let p_minus_one = &p - BigInt::one();
        check_range("Zp subgroup q parameter", &q, BigInt::one(), p_minus_one.clone())?;
        check_range("Zp subgroup generator", &g, BigInt::from(2), p_minus_one)?;
        Ok(ZpSubgroup { g, p, q })
    }

    pub fn g(&self) -> &BigInt {
        &self.g
    }

    pub fn p(&self) -> &BigInt {
        &self.p
    }

    pub fn q(&self) -> &BigInt {
        &self.q
    }

    pub fn generator(&self) -> GroupElement {
        GroupElement {
            value: self.g.clone(),
            p: self.p.clone(),
            q: self.q.clone(),
        }
    }

    pub fn identity(&self) -> GroupElement {
        GroupElement {
            value: BigInt::one(),
            p: self.p.clone(),
            q: self.q.clone(),
        }
    }

    /// Wraps `value` as an element of this group. Only the range is checked here.
    pub fn element(&self, value: BigInt) -> Result<GroupElement, GroupError> {
        GroupElement::new(value, self.p.clone(), self.q.clone())
    }

    /// `1 <= value <= p-1` and `value^q = 1 (mod p)`.
    pub fn is_group_member(&self, value: &BigInt) -> bool {
        if *value < BigInt::one() || *value >= self.p {
            return false;
        }
        match mod_pow(value, &self.q, &self.p) {
            Ok(r) => r.is_one(),
            Err(_) => false,
        }
    }

    pub fn is_member(&self, element: &GroupElement) -> bool {
        element.p == self.p && element.q == self.q && self.is_group_member(&element.value)
    }
}

/// An element of a [`ZpSubgroup`], carrying the `(p, q)` of the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawElement")]
pub struct GroupElement {
    #[serde(with = "decimal")]
    value: BigInt,
    #[serde(with = "decimal")]
    p: BigInt,
    #[serde(with = "decimal")]
    q: BigInt,
}

#[derive(Deserialize)]
struct RawElement {
    #[serde(with = "decimal")]
    value: BigInt,
    #[serde(with = "decimal")]
    p: BigInt,
    #[serde(with = "decimal")]
    q: BigInt,
}

impl TryFrom<RawElement> for GroupElement {
    type Error = GroupError;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        GroupElement::new(raw.value, raw.p, raw.q)
    }
}

impl GroupElement {
    pub fn new(value: BigInt, p: BigInt, q: BigInt) -> Result<Self, GroupError> {
        let p_minus_one = &p - BigInt::one();
        check_range("Zp subgroup q parameter", &q, BigInt::one(), p_minus_one.clone())?;
        check_range("Zp group element value", &value, BigInt::one(), p_minus_one)?;
        Ok(GroupElement { value, p, q })
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn p(&self) -> &BigInt {
        &self.p
    }

    pub fn q(&self) -> &BigInt {
        &self.q
    }

    /// Two elements are compatible only when both `p` and `q` agree.
    pub fn is_compatible(&self, other: &GroupElement) -> bool {
        self.p == other.p && self.q == other.q
    }

    pub fn multiply(&self, other: &GroupElement) -> Result<GroupElement, GroupError> {
        if !self.is_compatible(other) {
            return Err(GroupError::IncompatibleGroups {
                expected_p: self.p.clone(),
                expected_q: self.q.clone(),
                found_p: other.p.clone(),
                found_q: other.q.clone(),
            });
        }
        let value = mod_mul(&self.value, &other.value, &self.p)?;
        Ok(self.with_value(value))
    }

    pub fn exponentiate(&self, exponent: &Exponent) -> Result<GroupElement, GroupError> {
        if exponent.q() != &self.q {
            return Err(GroupError::ExponentOrderMismatch {
                expected: self.q.clone(),
                found: exponent.q().clone(),
            });
        }
        let value = mod_pow(&self.value, exponent.value(), &self.p)?;
        Ok(self.with_value(value))
    }

    pub fn invert(&self) -> Result<GroupElement, GroupError> {
        let value = mod_inverse(&self.value, &self.p)?;
        Ok(self.with_value(value))
    }

    fn with_value(&self, value: BigInt) -> GroupElement {
        GroupElement {
            value,
            p: self.p.clone(),
            q: self.q.clone(),
        }
    }
}

/// Uniform exponent in `[0, q-1]`: draws `bitlength(q)` bits and retries while the draw is `>= q`.
pub fn random_exponent(group: &ZpSubgroup, rng: &mut impl RngCore) -> Result<Exponent, GroupError> {
    random_exponent_of_length(group, group.q.bits(), rng)
}

/// Short (256-bit) exponent. Only for speeding up encryption, never for signing keys.
pub fn short_random_exponent(
    group: &ZpSubgroup,
    rng: &mut impl RngCore,
) -> Result<Exponent, GroupError> {
    let q_bits = group.q.bits();
    if q_bits < SHORT_EXPONENT_BIT_LENGTH {
        return Err(GroupError::OrderTooSmallForShortExponent {
            required: SHORT_EXPONENT_BIT_LENGTH,
            found: q_bits,
        });
    }
    random_exponent_of_length(group, SHORT_EXPONENT_BIT_LENGTH, rng)
}

fn random_exponent_of_length(
    group: &ZpSubgroup,
    bits: u64,
    rng: &mut impl RngCore,
) -> Result<Exponent, GroupError> {
    loop {
        let value = random_bits(bits, rng)?;
        if value < group.q {
            return Ok(Exponent::new(group.q.clone(), value)?);
        }
    }
}
