use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::exponent::{Exponent, ExponentError};
use crate::group::{GroupElement, GroupError, ZpSubgroup};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("a key must contain at least one element")]
    Empty,
    #[error("key element {0} does not belong to the key's group")]
    ForeignElement(usize),
    #[error("public key has {public} elements but private key has {private}")]
    LengthMismatch { public: usize, private: usize },
    #[error("public and private keys belong to different groups")]
    GroupMismatch,
    #[error("cannot compress a key of {len} elements to {requested}")]
    InvalidCompression { requested: usize, len: usize },
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Exponent(#[from] ExponentError),
}

fn check_compression(requested: usize, len: usize) -> Result<(), KeyError> {
    if requested < 1 || requested > len {
        return Err(KeyError::InvalidCompression { requested, len });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPublicKey")]
pub struct ElGamalPublicKey {
    keys: Vec<GroupElement>,
    group: ZpSubgroup,
}

#[derive(Deserialize)]
struct RawPublicKey {
    keys: Vec<GroupElement>,
    group: ZpSubgroup,
}

impl TryFrom<RawPublicKey> for ElGamalPublicKey {
    type Error = KeyError;

    fn try_from(raw: RawPublicKey) -> Result<Self, Self::Error> {
        ElGamalPublicKey::new(raw.keys, raw.group)
    }
}

impl ElGamalPublicKey {
    pub fn new(keys: Vec<GroupElement>, group: ZpSubgroup) -> Result<Self, KeyError> {
        if keys.is_empty() {
            return Err(KeyError::Empty);
        }
        if let Some(i) = keys
            .iter()
            .position(|k| k.p() != group.p() || k.q() != group.q())
        {
            return Err(KeyError::ForeignElement(i));
        }
        Ok(ElGamalPublicKey { keys, group })
    }

    pub fn keys(&self) -> &[GroupElement] {
        &self.keys
    }

    pub fn group(&self) -> &ZpSubgroup {
        &self.group
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keeps the first `n - 1` elements and folds the rest into element `n - 1` by multiplication.
    pub fn compress(&self, n: usize) -> Result<ElGamalPublicKey, KeyError> {
        check_compression(n, self.keys.len())?;
        let mut keys = self.keys[..n - 1].to_vec();
        let mut folded = self.keys[n - 1].clone();
        for k in &self.keys[n..] {
            folded = folded.multiply(k)?;
        }
        keys.push(folded);
        Ok(ElGamalPublicKey {
            keys,
            group: self.group.clone(),
        })
    }
}

/// Private exponents of an ElGamal key. Wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPrivateKey")]
pub struct ElGamalPrivateKey {
    keys: Vec<Exponent>,
    group: ZpSubgroup,
}

#[derive(Deserialize)]
struct RawPrivateKey {
    keys: Vec<Exponent>,
    group: ZpSubgroup,
}

impl TryFrom<RawPrivateKey> for ElGamalPrivateKey {
    type Error = KeyError;

    fn try_from(raw: RawPrivateKey) -> Result<Self, Self::Error> {
        ElGamalPrivateKey::new(raw.keys, raw.group)
    }
}

impl ElGamalPrivateKey {
    /// Rejected exponents are wiped on drop like any other [`Exponent`].
    pub fn new(keys: Vec<Exponent>, group: ZpSubgroup) -> Result<Self, KeyError> {
        if keys.is_empty() {
            return Err(KeyError::Empty);
        }
        if let Some(i) = keys.iter().position(|k| k.q() != group.q()) {
            return Err(KeyError::ForeignElement(i));
        }
        Ok(ElGamalPrivateKey { keys, group })
    }

    pub fn keys(&self) -> &[Exponent] {
        &self.keys
    }

    pub fn group(&self) -> &ZpSubgroup {
        &self.group
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `g^{x_i}` for every exponent.
    pub fn derive_public_key(&self) -> Result<ElGamalPublicKey, KeyError> {
        let generator = self.group.generator();
        let keys = self
            .keys
            .iter()
            .map(|x| generator.exponentiate(x))
            .collect::<Result<Vec<_>, _>>()?;
        ElGamalPublicKey::new(keys, self.group.clone())
    }

    /// Counterpart of [`ElGamalPublicKey::compress`]: trailing exponents are summed into exponent `n - 1`.
    pub fn compress(&self, n: usize) -> Result<ElGamalPrivateKey, KeyError> {
        check_compression(n, self.keys.len())?;
        let mut keys = self.keys[..n - 1].to_vec();
        let mut folded = self.keys[n - 1].clone();
        for k in &self.keys[n..] {
            folded = folded.add(k)?;
        }
        keys.push(folded);
        Ok(ElGamalPrivateKey {
            keys,
            group: self.group.clone(),
        })
    }

    pub fn destroy(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for ElGamalPrivateKey {
    fn zeroize(&mut self) {
        self.keys.iter_mut().for_each(Zeroize::zeroize);
        // group parameters are public
    }
}

impl Drop for ElGamalPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalKeyPair {
    pub public_key: ElGamalPublicKey,
    pub private_key: ElGamalPrivateKey,
}

impl ElGamalKeyPair {
    pub fn new(public_key: ElGamalPublicKey, private_key: ElGamalPrivateKey) -> Result<Self, KeyError> {
        if public_key.len() != private_key.len() {
            return Err(KeyError::LengthMismatch {
                public: public_key.len(),
                private: private_key.len(),
            });
        }
        if public_key.group() != private_key.group() {
            return Err(KeyError::GroupMismatch);
        }
        Ok(ElGamalKeyPair {
            public_key,
            private_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn group() -> ZpSubgroup {
        ZpSubgroup::new(BigInt::from(2), BigInt::from(23), BigInt::from(11)).unwrap()
    }

    fn private_key(values: &[u32]) -> ElGamalPrivateKey {
        let keys = values
            .iter()
            .map(|v| Exponent::new(BigInt::from(11), BigInt::from(*v)).unwrap())
            .collect();
        ElGamalPrivateKey::new(keys, group()).unwrap()
    }

    #[test]
    fn test_derive_public_key() {
        let sk = private_key(&[9, 8]);
        let pk = sk.derive_public_key().unwrap();
        // 2^9 = 6, 2^8 = 3 mod 23
        let values: Vec<BigInt> = pk.keys().iter().map(|k| k.value().clone()).collect();
        assert_eq!(values, vec![BigInt::from(6), BigInt::from(3)]);
        assert_eq!(pk.group(), &group());
    }

    #[test]
    fn test_empty_keys_rejected() {
        assert_eq!(ElGamalPublicKey::new(vec![], group()), Err(KeyError::Empty));
        assert_eq!(ElGamalPrivateKey::new(vec![], group()).unwrap_err(), KeyError::Empty);
    }

    #[test]
    fn test_foreign_elements_rejected() {
        let foreign = Exponent::new(BigInt::from(13), BigInt::from(1)).unwrap();
        let ok = Exponent::new(BigInt::from(11), BigInt::from(1)).unwrap();
        assert_eq!(
            ElGamalPrivateKey::new(vec![ok, foreign], group()).unwrap_err(),
            KeyError::ForeignElement(1)
        );
        let other = GroupElement::new(BigInt::from(2), BigInt::from(47), BigInt::from(23)).unwrap();
        assert_eq!(
            ElGamalPublicKey::new(vec![other], group()),
            Err(KeyError::ForeignElement(0))
        );
    }

    #[test]
    fn test_compress_keeps_pair_consistent() {
        let sk = private_key(&[9, 8, 3, 5]);
        let pk = sk.derive_public_key().unwrap();
        let compressed_sk = sk.compress(2).unwrap();
        let compressed_pk = pk.compress(2).unwrap();
        assert_eq!(compressed_sk.len(), 2);
        assert_eq!(compressed_sk.keys()[1].value(), &BigInt::from((8 + 3 + 5) % 11));
        assert_eq!(compressed_sk.derive_public_key().unwrap(), compressed_pk);
        assert_eq!(pk.compress(4).unwrap(), pk);
    }

    #[test]
    fn test_compress_out_of_range() {
        let sk = private_key(&[1, 2]);
        assert_eq!(
            sk.compress(0).unwrap_err(),
            KeyError::InvalidCompression { requested: 0, len: 2 }
        );
        assert_eq!(
            sk.compress(3).unwrap_err(),
            KeyError::InvalidCompression { requested: 3, len: 2 }
        );
    }

    #[test]
    fn test_destroy_zeroes_exponents() {
        let mut sk = private_key(&[9, 8]);
        sk.destroy();
        assert!(sk.keys().iter().all(Exponent::is_zero));
        assert_eq!(sk.group(), &group());
    }

    #[test]
    fn test_key_pair_validation() {
        let sk = private_key(&[9, 8]);
        let pk = sk.derive_public_key().unwrap();
        let short_pk = pk.compress(1).unwrap();
        assert_eq!(
            ElGamalKeyPair::new(short_pk, sk.clone()).unwrap_err(),
            KeyError::LengthMismatch { public: 1, private: 2 }
        );
        assert!(ElGamalKeyPair::new(pk, sk).is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let sk = private_key(&[9, 8]);
        let pk = sk.derive_public_key().unwrap();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(serde_json::from_str::<ElGamalPublicKey>(&json).unwrap(), pk);
        let json = serde_json::to_string(&sk).unwrap();
        assert_eq!(serde_json::from_str::<ElGamalPrivateKey>(&json).unwrap(), sk);
    }
}
