//! Per-custodian container of serialized Shamir shares.
//!
//! Binary layout, big-endian with 4-byte integer fields:
//!
//! ```text
//! [modulus_len][number_of_parts][threshold][share_count]
//! share_count x ([share_len][share bytes])
//! [modulus bytes, modulus_len of them]
//! ```
//!
//! The modulus is written in two's complement, so a modulus with its top bit set carries
//! a leading zero byte. Containers persisted by earlier deployments use the same encoding.

use num_bigint::BigInt;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::functions::{write_len, write_u32, ByteReader, FunctionError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharesError {
    #[error("container does not contain any shares")]
    Empty,
    #[error("serialized container is empty")]
    EmptyInput,
    #[error("{0} trailing bytes after the modulus")]
    TrailingBytes(usize),
    #[error(transparent)]
    Encoding(#[from] FunctionError),
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MultipleSharesContainer {
    number_of_parts: u32,
    threshold: u32,
    shares: Vec<Vec<u8>>,
    modulus: BigInt,
}

impl MultipleSharesContainer {
    pub fn new(
        number_of_parts: u32,
        threshold: u32,
        shares: Vec<Vec<u8>>,
        modulus: BigInt,
    ) -> Result<Self, SharesError> {
        if shares.is_empty() {
            return Err(SharesError::Empty);
        }
        Ok(MultipleSharesContainer {
            number_of_parts,
            threshold,
            shares,
            modulus,
        })
    }

    /// Total number of custodians in the split, not the number of shares held here.
    pub fn number_of_parts(&self) -> u32 {
        self.number_of_parts
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn shares(&self) -> &[Vec<u8>] {
        &self.shares
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    pub fn check(&self) -> Result<(), SharesError> {
        if self.shares.is_empty() {
            return Err(SharesError::Empty);
        }
        Ok(())
    }

    pub fn is_compatible(&self, other: &MultipleSharesContainer) -> bool {
        self.shares.len() == other.shares.len()
            && self.number_of_parts == other.number_of_parts
            && self.threshold == other.threshold
            && self.modulus == other.modulus
    }

    pub fn serialize(&self) -> Result<Zeroizing<Vec<u8>>, SharesError> {
        let modulus = self.modulus.to_signed_bytes_be();
        let len = 16 + self.shares.iter().map(|s| 4 + s.len()).sum::<usize>() + modulus.len();
        let mut out = Zeroizing::new(Vec::with_capacity(len));
        write_len(&mut out, modulus.len())?;
        write_u32(&mut out, self.number_of_parts);
        write_u32(&mut out, self.threshold);
        write_len(&mut out, self.shares.len())?;
        for share in &self.shares {
            write_len(&mut out, share.len())?;
            out.extend_from_slice(share);
        }
        out.extend_from_slice(&modulus);
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, SharesError> {
        if bytes.is_empty() {
            return Err(SharesError::EmptyInput);
        }
        let mut reader = ByteReader::new(bytes);
        let modulus_len = reader.read_u32()? as usize;
        let number_of_parts = reader.read_u32()?;
        let threshold = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let mut shares: Zeroizing<Vec<Vec<u8>>> = Zeroizing::new(Vec::with_capacity(count.min(reader.remaining() / 4)));
        for _ in 0..count {
            shares.push(reader.read_prefixed()?.to_vec());
        }
        let modulus = BigInt::from_signed_bytes_be(reader.read_bytes(modulus_len)?);
        let container =
            MultipleSharesContainer::new(number_of_parts, threshold, std::mem::take(&mut *shares), modulus)?;
        if reader.remaining() > 0 {
            return Err(SharesError::TrailingBytes(reader.remaining()));
        }
        Ok(container)
    }

    /// Reads only the trailing modulus, located through the leading length field.
    pub fn modulus_from_serialized(bytes: &[u8]) -> Result<BigInt, SharesError> {
        let modulus_len = ByteReader::new(bytes).read_u32()? as usize;
        let available = bytes.len() - 4;
        if modulus_len > available {
            return Err(FunctionError::Truncated {
                offset: 4,
                needed: modulus_len,
                available,
            }
            .into());
        }
        Ok(BigInt::from_signed_bytes_be(&bytes[bytes.len() - modulus_len..]))
    }

    pub fn destroy(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for MultipleSharesContainer {
    fn zeroize(&mut self) {
        for share in self.shares.iter_mut() {
            share.as_mut_slice().zeroize();
        }
    }
}

impl Drop for MultipleSharesContainer {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for MultipleSharesContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipleSharesContainer")
            .field("number_of_parts", &self.number_of_parts)
            .field("threshold", &self.threshold)
            .field("shares", &self.shares.len())
            .field("modulus", &self.modulus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> MultipleSharesContainer {
        MultipleSharesContainer::new(3, 2, vec![vec![1, 2, 3], vec![4]], BigInt::from(251)).unwrap()
    }

    #[test]
    fn test_serialize_layout() {
        let bytes = container().serialize().unwrap();
        assert_eq!(
            bytes.as_slice(),
            &[
                0, 0, 0, 2, // modulus length
                0, 0, 0, 3, // number of parts
                0, 0, 0, 2, // threshold
                0, 0, 0, 2, // share count
                0, 0, 0, 3, 1, 2, 3, //
                0, 0, 0, 1, 4, //
                0x00, 0xfb, // modulus
            ]
        );
    }

    #[test]
    fn test_deserialize() {
        let bytes = container().serialize().unwrap();
        assert_eq!(MultipleSharesContainer::deserialize(&bytes).unwrap(), container());
        assert_eq!(
            MultipleSharesContainer::modulus_from_serialized(&bytes).unwrap(),
            BigInt::from(251)
        );
    }

    #[test]
    fn test_deserialize_truncated() {
        let bytes = container().serialize().unwrap();
        let result = MultipleSharesContainer::deserialize(&bytes[..bytes.len() - 1]);
        match result {
            Err(SharesError::Encoding(FunctionError::Truncated { needed, available, .. })) => {
                assert_eq!(needed, 2);
                assert_eq!(available, 1);
            }
            _ => panic!("Expected Truncated error"),
        }
        assert_eq!(MultipleSharesContainer::deserialize(&[]), Err(SharesError::EmptyInput));
    }

    #[test]
    fn test_deserialize_trailing_bytes() {
        let mut bytes = container().serialize().unwrap().to_vec();
        bytes.push(9);
        assert_eq!(
            MultipleSharesContainer::deserialize(&bytes),
            Err(SharesError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_empty_shares_rejected() {
        assert_eq!(
            MultipleSharesContainer::new(3, 2, vec![], BigInt::from(251)),
            Err(SharesError::Empty)
        );
        let bytes = [0, 0, 0, 1, 0, 0, 0, 3, 0, 0, 0, 2, 0, 0, 0, 0, 7];
        assert_eq!(MultipleSharesContainer::deserialize(&bytes), Err(SharesError::Empty));
    }

    #[test]
    fn test_is_compatible() {
        let a = container();
        assert!(a.is_compatible(&container()));
        let fewer = MultipleSharesContainer::new(3, 2, vec![vec![1]], BigInt::from(251)).unwrap();
        assert!(!a.is_compatible(&fewer));
        let other_threshold = MultipleSharesContainer::new(3, 3, vec![vec![1], vec![2]], BigInt::from(251)).unwrap();
        assert!(!a.is_compatible(&other_threshold));
        let other_modulus = MultipleSharesContainer::new(3, 2, vec![vec![1], vec![2]], BigInt::from(241)).unwrap();
        assert!(!a.is_compatible(&other_modulus));
    }

    #[test]
    fn test_destroy_zero_fills() {
        let mut c = container();
        c.destroy();
        assert_eq!(c.shares(), &[vec![0, 0, 0], vec![0]]);
        assert!(c.check().is_ok());
    }
}
