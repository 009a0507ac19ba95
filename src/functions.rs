use num_bigint::{BigInt, Sign};
use num_integer::Integer as _;
use num_traits::{One, Zero};
use rand::{rngs::OsRng, RngCore};
use rug::{integer::Order, rand::RandState, Integer};
use std::convert::TryInto;
use thiserror::Error;

/// Miller-Rabin rounds used for every primality check in the crate.
pub const PRIME_CERTAINTY: u32 = 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    #[error("random number generation failed")]
    RandomNumberGeneration,
    #[error("invalid bit length")]
    InvalidBitLength,
    #[error("modulus must be positive, got {0}")]
    NonPositiveModulus(BigInt),
    #[error("{0} has no inverse modulo {1}")]
    NotInvertible(BigInt, BigInt),
    #[error("value needs {needed} bytes but only {available} are available")]
    ValueTooLarge { needed: usize, available: usize },
    #[error("input truncated at offset {offset}: needed {needed} bytes, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("length {0} does not fit in a 4-byte field")]
    LengthOverflow(usize),
}

fn check_modulus(m: &BigInt) -> Result<(), FunctionError> {
    if m.sign() != Sign::Plus {
        return Err(FunctionError::NonPositiveModulus(m.clone()));
    }
    Ok(())
}

pub fn mod_mul(a: &BigInt, b: &BigInt, m: &BigInt) -> Result<BigInt, FunctionError> {
    check_modulus(m)?;
    Ok((a * b).mod_floor(m))
}

/// `base^exp mod m` for a non-negative exponent. The result always lies in `[0, m)`.
pub fn mod_pow(base: &BigInt, exp: &BigInt, m: &BigInt) -> Result<BigInt, FunctionError> {
    check_modulus(m)?;
    if exp.sign() == Sign::Minus {
        let inv = mod_inverse(base, m)?;
        return Ok(inv.modpow(&-exp, m));
    }
    Ok(base.modpow(exp, m))
}

pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Result<BigInt, FunctionError> {
    check_modulus(m)?;
    a.mod_floor(m)
        .modinv(m)
        .ok_or_else(|| FunctionError::NotInvertible(a.clone(), m.clone()))
}

/// Uniform integer of at most `bits` bits.
pub fn random_bits(bits: u64, rng: &mut impl RngCore) -> Result<BigInt, FunctionError> {
    if bits == 0 {
        return Err(FunctionError::InvalidBitLength);
    }
    let byte_len: usize = ((bits + 7) / 8)
        .try_into()
        .map_err(|_| FunctionError::InvalidBitLength)?;
    let mut bytes = vec![0u8; byte_len];
    rng.fill_bytes(&mut bytes);
    let excess = (byte_len as u64 * 8 - bits) as u32;
    bytes[0] &= 0xffu8 >> excess;
    Ok(BigInt::from_bytes_be(Sign::Plus, &bytes))
}

/// Uniform integer in `[0, n)` by rejection sampling over `bitlength(n)`-bit draws.
pub fn random_mod(n: &BigInt, rng: &mut impl RngCore) -> Result<BigInt, FunctionError> {
    if n <= &BigInt::zero() {
        return Err(FunctionError::RandomNumberGeneration);
    }
    let bits = n.bits();
    loop {
        let result = random_bits(bits, rng)?;
        if result < *n {
            return Ok(result);
        }
    }
}

pub fn to_rug(n: &BigInt) -> Integer {
    let (sign, digits) = n.to_bytes_be();
    let magnitude = Integer::from_digits(&digits, Order::Msf);
    if sign == Sign::Minus {
        -magnitude
    } else {
        magnitude
    }
}

pub fn from_rug(n: &Integer) -> BigInt {
    let magnitude = BigInt::from_bytes_be(Sign::Plus, &n.to_digits::<u8>(Order::Msf));
    if *n < 0 {
        -magnitude
    } else {
        magnitude
    }
}

pub fn is_probable_prime(n: &BigInt) -> bool {
    if n <= &BigInt::one() {
        return false;
    }
    to_rug(n).is_probably_prime(PRIME_CERTAINTY) != rug::integer::IsPrime::No
}

/// Returns `(p, q)` with `p = 2q + 1` and both probably prime.
pub fn generate_safe_primes(bit_len: usize) -> Result<(BigInt, BigInt), FunctionError> {
    if bit_len < 3 {
        return Err(FunctionError::InvalidBitLength);
    }
    let bit_len_u32 =
        TryInto::<u32>::try_into(bit_len).map_err(|_| FunctionError::InvalidBitLength)?;
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let mut rand_state = RandState::new();
    rand_state.seed(&Integer::from_digits(&seed, Order::Msf));
    loop {
        let mut q: Integer = Integer::random_bits(bit_len_u32 - 1, &mut rand_state).into();
        q.set_bit(bit_len_u32 - 2, true);
        q = q.next_prime();
        let p: Integer = Integer::from(&q * 2) + 1;
        if p.significant_bits() != bit_len_u32 {
            continue;
        }
        if p.is_probably_prime(PRIME_CERTAINTY) != rug::integer::IsPrime::No {
            return Ok((from_rug(&p), from_rug(&q)));
        }
    }
}

/// Big-endian magnitude without a sign byte. Zero encodes as `[0]`.
pub fn to_unsigned_bytes(n: &BigInt) -> Vec<u8> {
    n.to_bytes_be().1
}

pub fn from_unsigned_bytes(bytes: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, bytes)
}

/// Left-pads the big-endian magnitude of `n` with zeros up to `len` bytes.
pub fn to_fixed_size_bytes(n: &BigInt, len: usize) -> Result<Vec<u8>, FunctionError> {
    let magnitude = if n.is_zero() {
        Vec::new()
    } else {
        to_unsigned_bytes(n)
    };
    if magnitude.len() > len {
        return Err(FunctionError::ValueTooLarge {
            needed: magnitude.len(),
            available: len,
        });
    }
    let mut out = vec![0u8; len - magnitude.len()];
    out.extend_from_slice(&magnitude);
    Ok(out)
}

/// Appends `value` as a 4-byte big-endian field.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends a length field for `len`, failing if it does not fit in 4 bytes.
pub fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), FunctionError> {
    let len = u32::try_from(len).map_err(|_| FunctionError::LengthOverflow(len))?;
    write_u32(out, len);
    Ok(())
}

/// Front-to-back reader over a big-endian, length-prefixed byte layout.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], FunctionError> {
        if len > self.remaining() {
            return Err(FunctionError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let out = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32, FunctionError> {
        let mut field = [0u8; 4];
        field.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_be_bytes(field))
    }

    /// A 4-byte length followed by that many bytes.
    pub fn read_prefixed(&mut self) -> Result<&'a [u8], FunctionError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }
}

/// Serde adapter writing integers as decimal strings, the form used in configuration files.
pub mod decimal {
    use num_bigint::BigInt;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigInt::parse_bytes(s.trim().as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("'{s}' is not a decimal integer")))
    }

    pub mod vec {
        use num_bigint::BigInt;
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[BigInt], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| v.to_str_radix(10)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<BigInt>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|s| {
                    BigInt::parse_bytes(s.trim().as_bytes(), 10)
                        .ok_or_else(|| D::Error::custom(format!("'{s}' is not a decimal integer")))
                })
                .collect()
        }
    }
}
