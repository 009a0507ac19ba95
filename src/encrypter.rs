use num_bigint::{BigInt, ParseBigIntError};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::exponent::Exponent;
use crate::group::{random_exponent, short_random_exponent, GroupElement, GroupError};
use crate::keys::ElGamalPublicKey;

#[derive(Error, Debug)]
pub enum ElGamalError {
    #[error("list of group elements to encrypt is empty")]
    EmptyMessages,
    #[error("blank string at position {0}")]
    BlankMessage(usize),
    #[error("{found} messages exceed the public key length {max}")]
    TooManyMessages { found: usize, max: usize },
    #[error("{found} pre-computed phis exceed the public key length {max}")]
    TooManyPrecomputedPhis { found: usize, max: usize },
    #[error("{found} pre-computed phis cannot cover {needed} messages")]
    NotEnoughPrecomputedPhis { found: usize, needed: usize },
    #[error("ciphertext has {found} phis but only {max} private exponents are available")]
    TooManyPhis { found: usize, max: usize },
    #[error("ciphertext element {0} is not a member of the group")]
    NotGroupMember(String),
    #[error("cannot parse group element value: {0}")]
    Parse(#[from] ParseBigIntError),
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// `(gamma, phi_1..phi_n)`. Equality and hashing cover exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCiphertext")]
pub struct ElGamalCiphertext {
    gamma: GroupElement,
    phis: Vec<GroupElement>,
}

#[derive(Deserialize)]
struct RawCiphertext {
    gamma: GroupElement,
    phis: Vec<GroupElement>,
}

impl TryFrom<RawCiphertext> for ElGamalCiphertext {
    type Error = GroupError;

    fn try_from(raw: RawCiphertext) -> Result<Self, Self::Error> {
        ElGamalCiphertext::new(raw.gamma, raw.phis)
    }
}

impl ElGamalCiphertext {
    /// Every phi must share `gamma`'s `(p, q)`.
    pub fn new(gamma: GroupElement, phis: Vec<GroupElement>) -> Result<Self, GroupError> {
        if let Some(phi) = phis.iter().find(|phi| !gamma.is_compatible(phi)) {
            return Err(GroupError::IncompatibleGroups {
                expected_p: gamma.p().clone(),
                expected_q: gamma.q().clone(),
                found_p: phi.p().clone(),
                found_q: phi.q().clone(),
            });
        }
        Ok(ElGamalCiphertext { gamma, phis })
    }

    pub fn gamma(&self) -> &GroupElement {
        &self.gamma
    }

    pub fn phis(&self) -> &[GroupElement] {
        &self.phis
    }

    pub fn len(&self) -> usize {
        self.phis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phis.is_empty()
    }
}

/// The randomness `r` together with the ciphertext computed from it. `r` is wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElGamalEncrypterValues {
    r: Exponent,
    ciphertext: ElGamalCiphertext,
}

impl ElGamalEncrypterValues {
    pub fn new(r: Exponent, ciphertext: ElGamalCiphertext) -> Self {
        ElGamalEncrypterValues { r, ciphertext }
    }

    pub fn r(&self) -> &Exponent {
        &self.r
    }

    pub fn ciphertext(&self) -> &ElGamalCiphertext {
        &self.ciphertext
    }
}

#[derive(Debug, Clone)]
pub struct ElGamalEncrypter {
    public_key: ElGamalPublicKey,
}

impl ElGamalEncrypter {
    pub fn new(public_key: ElGamalPublicKey) -> Self {
        ElGamalEncrypter { public_key }
    }

    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public_key
    }

    pub fn encrypt_group_elements(
        &self,
        messages: &[GroupElement],
    ) -> Result<ElGamalEncrypterValues, ElGamalError> {
        self.encrypt_group_elements_with_rng(messages, &mut OsRng)
    }

    pub fn encrypt_group_elements_with_rng<R: RngCore + CryptoRng>(
        &self,
        messages: &[GroupElement],
        rng: &mut R,
    ) -> Result<ElGamalEncrypterValues, ElGamalError> {
        self.check_messages(messages)?;
        let r = random_exponent(self.public_key.group(), rng)?;
        let ciphertext = self.encrypt_group_elements_with_exponent(messages, &r)?;
        Ok(ElGamalEncrypterValues { r, ciphertext })
    }

    /// Same as [`Self::encrypt_group_elements`] with a 256-bit `r`. Needs `bitlength(q) >= 256`.
    pub fn encrypt_group_elements_with_short_exponent(
        &self,
        messages: &[GroupElement],
    ) -> Result<ElGamalEncrypterValues, ElGamalError> {
        self.check_messages(messages)?;
        let r = short_random_exponent(self.public_key.group(), &mut OsRng)?;
        let ciphertext = self.encrypt_group_elements_with_exponent(messages, &r)?;
        Ok(ElGamalEncrypterValues { r, ciphertext })
    }

    /// `gamma = g^r`, `phi_i = pk_i^r * m_i` for a caller-chosen `r`.
    pub fn encrypt_group_elements_with_exponent(
        &self,
        messages: &[GroupElement],
        r: &Exponent,
    ) -> Result<ElGamalCiphertext, ElGamalError> {
        self.check_messages(messages)?;
        let gamma = self.public_key.group().generator().exponentiate(r)?;
        let phis = self
            .public_key
            .keys()
            .iter()
            .zip(messages)
            .map(|(pk, m)| pk.exponentiate(r)?.multiply(m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ElGamalCiphertext::new(gamma, phis)?)
    }

    /// Message-independent part of an encryption: `gamma = g^r` and `pk_i^r` for every key element.
    pub fn pre_compute(&self) -> Result<ElGamalEncrypterValues, ElGamalError> {
        let r = random_exponent(self.public_key.group(), &mut OsRng)?;
        self.pre_compute_with_exponent(r)
    }

    pub fn pre_compute_with_exponent(&self, r: Exponent) -> Result<ElGamalEncrypterValues, ElGamalError> {
        let gamma = self.public_key.group().generator().exponentiate(&r)?;
        let pre_phis = self
            .public_key
            .keys()
            .iter()
            .map(|pk| pk.exponentiate(&r))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(phis = pre_phis.len(), "pre-computed ElGamal values");
        Ok(ElGamalEncrypterValues {
            r,
            ciphertext: ElGamalCiphertext::new(gamma, pre_phis)?,
        })
    }

    /// Completes a deferred encryption. Message `i` is bound to pre-computed phi `i`;
    /// surplus pre-computed phis are dropped.
    pub fn encrypt_group_elements_with_precomputed(
        &self,
        messages: &[GroupElement],
        precomputed: &ElGamalEncrypterValues,
    ) -> Result<ElGamalEncrypterValues, ElGamalError> {
        self.check_messages(messages)?;
        let pre = &precomputed.ciphertext;
        if pre.len() > self.public_key.len() {
            return Err(ElGamalError::TooManyPrecomputedPhis {
                found: pre.len(),
                max: self.public_key.len(),
            });
        }
        if pre.len() < messages.len() {
            return Err(ElGamalError::NotEnoughPrecomputedPhis {
                found: pre.len(),
                needed: messages.len(),
            });
        }
        let phis = pre
            .phis()
            .iter()
            .zip(messages)
            .map(|(pre_phi, m)| m.multiply(pre_phi))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ElGamalEncrypterValues {
            r: precomputed.r.clone(),
            ciphertext: ElGamalCiphertext::new(pre.gamma.clone(), phis)?,
        })
    }

    /// Parses each decimal string as a group element value and encrypts the result.
    pub fn encrypt_strings<S: AsRef<str>>(&self, messages: &[S]) -> Result<ElGamalEncrypterValues, ElGamalError> {
        let elements = self.parse_elements(messages)?;
        self.encrypt_group_elements(&elements)
    }

    pub fn encrypt_strings_with_precomputed<S: AsRef<str>>(
        &self,
        messages: &[S],
        precomputed: &ElGamalEncrypterValues,
    ) -> Result<ElGamalEncrypterValues, ElGamalError> {
        let elements = self.parse_elements(messages)?;
        self.encrypt_group_elements_with_precomputed(&elements, precomputed)
    }

    fn parse_elements<S: AsRef<str>>(&self, messages: &[S]) -> Result<Vec<GroupElement>, ElGamalError> {
        if messages.is_empty() {
            return Err(ElGamalError::EmptyMessages);
        }
        if let Some(i) = messages.iter().position(|s| s.as_ref().trim().is_empty()) {
            return Err(ElGamalError::BlankMessage(i));
        }
        self.check_len(messages.len())?;
        messages
            .iter()
            .map(|s| -> Result<GroupElement, ElGamalError> {
                let value = BigInt::from_str(s.as_ref())?;
                Ok(self.public_key.group().element(value)?)
            })
            .collect()
    }

    fn check_messages(&self, messages: &[GroupElement]) -> Result<(), ElGamalError> {
        if messages.is_empty() {
            return Err(ElGamalError::EmptyMessages);
        }
        self.check_len(messages.len())
    }

    fn check_len(&self, found: usize) -> Result<(), ElGamalError> {
        let max = self.public_key.len();
        if found > max {
            return Err(ElGamalError::TooManyMessages { found, max });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ZpSubgroup;
    use crate::keys::ElGamalPrivateKey;

    fn group() -> ZpSubgroup {
        ZpSubgroup::new(BigInt::from(2), BigInt::from(23), BigInt::from(11)).unwrap()
    }

    fn element(value: u32) -> GroupElement {
        group().element(BigInt::from(value)).unwrap()
    }

    fn exponent(value: u32) -> Exponent {
        Exponent::new(BigInt::from(11), BigInt::from(value)).unwrap()
    }

    fn encrypter() -> ElGamalEncrypter {
        let sk = ElGamalPrivateKey::new(vec![exponent(9), exponent(8)], group()).unwrap();
        ElGamalEncrypter::new(sk.derive_public_key().unwrap())
    }

    #[test]
    fn test_encrypt_with_exponent() {
        // pk = [6, 3], r = 2: gamma = 4, phis = [36 * 6, 9 * 12] mod 23
        let ciphertext = encrypter()
            .encrypt_group_elements_with_exponent(&[element(6), element(12)], &exponent(2))
            .unwrap();
        assert_eq!(ciphertext.gamma(), &element(4));
        assert_eq!(ciphertext.phis(), &[element(9), element(16)]);
    }

    #[test]
    fn test_encrypt_fewer_messages_than_keys() {
        let values = encrypter().encrypt_group_elements(&[element(13)]).unwrap();
        assert_eq!(values.ciphertext().len(), 1);
        assert_eq!(values.r().q(), group().q());
    }

    #[test]
    fn test_encrypt_too_many_messages() {
        let result = encrypter().encrypt_group_elements(&[element(1), element(2), element(3)]);
        match result {
            Err(ElGamalError::TooManyMessages { found, max }) => {
                assert_eq!(found, 3);
                assert_eq!(max, 2);
            }
            _ => panic!("Expected TooManyMessages error"),
        }
    }

    #[test]
    fn test_encrypt_empty_messages() {
        assert!(matches!(
            encrypter().encrypt_group_elements(&[]),
            Err(ElGamalError::EmptyMessages)
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(encrypter().encrypt_strings(&empty), Err(ElGamalError::EmptyMessages)));
    }

    #[test]
    fn test_precompute_matches_direct_encryption() {
        let enc = encrypter();
        let messages = [element(6), element(12)];
        let pre = enc.pre_compute().unwrap();
        assert_eq!(pre.ciphertext().len(), 2);
        let deferred = enc.encrypt_group_elements_with_precomputed(&messages, &pre).unwrap();
        let direct = enc.encrypt_group_elements_with_exponent(&messages, pre.r()).unwrap();
        assert_eq!(deferred.ciphertext(), &direct);
        assert_eq!(deferred.r(), pre.r());
    }

    #[test]
    fn test_precompute_with_fewer_messages() {
        let enc = encrypter();
        let pre = enc.pre_compute_with_exponent(exponent(2)).unwrap();
        let deferred = enc.encrypt_group_elements_with_precomputed(&[element(6)], &pre).unwrap();
        assert_eq!(deferred.ciphertext().phis(), &[element(9)]);
        assert_eq!(deferred.ciphertext().gamma(), &element(4));
    }

    #[test]
    fn test_precompute_too_many_phis() {
        let enc = encrypter();
        let gamma = element(4);
        let phis = vec![element(1), element(2), element(3)];
        let pre = ElGamalEncrypterValues::new(exponent(2), ElGamalCiphertext::new(gamma, phis).unwrap());
        let result = enc.encrypt_group_elements_with_precomputed(&[element(6)], &pre);
        match result {
            Err(ElGamalError::TooManyPrecomputedPhis { found, max }) => {
                assert_eq!(found, 3);
                assert_eq!(max, 2);
            }
            _ => panic!("Expected TooManyPrecomputedPhis error"),
        }
    }

    #[test]
    fn test_encrypt_strings() {
        let enc = encrypter();
        let values = enc.encrypt_strings(&["6", "12"]).unwrap();
        let expected = enc
            .encrypt_group_elements_with_exponent(&[element(6), element(12)], values.r())
            .unwrap();
        assert_eq!(values.ciphertext(), &expected);

        let pre = enc.pre_compute_with_exponent(exponent(2)).unwrap();
        let values = enc.encrypt_strings_with_precomputed(&["6".to_string()], &pre).unwrap();
        assert_eq!(values.ciphertext().phis(), &[element(9)]);
    }

    #[test]
    fn test_encrypt_strings_parse_error() {
        let result = encrypter().encrypt_strings(&["6", "twelve"]);
        assert!(matches!(result, Err(ElGamalError::Parse(_))));
        let result = encrypter().encrypt_strings(&["6", "  "]);
        assert!(matches!(result, Err(ElGamalError::BlankMessage(1))));
    }

    #[test]
    fn test_encrypt_strings_out_of_range() {
        let result = encrypter().encrypt_strings(&["23"]);
        assert!(matches!(result, Err(ElGamalError::Group(GroupError::OutOfRange { .. }))));
    }

    #[test]
    fn test_short_exponent_requires_large_group() {
        let result = encrypter().encrypt_group_elements_with_short_exponent(&[element(6)]);
        assert!(matches!(
            result,
            Err(ElGamalError::Group(GroupError::OrderTooSmallForShortExponent { .. }))
        ));
    }

    #[test]
    fn test_ciphertext_rejects_mixed_groups() {
        let foreign = GroupElement::new(BigInt::from(3), BigInt::from(67), BigInt::from(11)).unwrap();
        let result = ElGamalCiphertext::new(element(4), vec![element(9), foreign]);
        assert!(matches!(result, Err(GroupError::IncompatibleGroups { .. })));
    }

    #[test]
    fn test_ciphertext_serde() {
        let ciphertext = ElGamalCiphertext::new(element(4), vec![element(9), element(16)]).unwrap();
        let json = serde_json::to_string(&ciphertext).unwrap();
        assert_eq!(serde_json::from_str::<ElGamalCiphertext>(&json).unwrap(), ciphertext);
    }
}
