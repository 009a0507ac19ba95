//! ElGamal encryption over prime-order subgroups of `Z_p^*`, with threshold custody of
//! the private key.
//!
//! The private key is a vector of exponents. [`key_shares::MultiKeyShareSplitter`] splits
//! each exponent with Shamir sharing and hands every custodian one
//! [`multishare::MultipleSharesContainer`]; any `threshold` containers rebuild the key.
//! Containers travel to custodian tokens inside an
//! [`encrypted_share::EncryptedShareContainer`] (AES-256-GCM, signed with Ed25519).
//!
//! # Example
//! ```
//! use elgamal_custody::decrypter::ElGamalDecrypter;
//! use elgamal_custody::encrypter::ElGamalEncrypter;
//! use elgamal_custody::key_shares::MultiKeyShareSplitter;
//! use elgamal_custody::keygen::ElGamalKeyPairGenerator;
//! use elgamal_custody::params::ElGamalEncryptionParameters;
//!
//! let params = ElGamalEncryptionParameters::from_json(r#"{"p":"2039","q":"1019","g":"4"}"#).unwrap();
//! let pair = ElGamalKeyPairGenerator::new().generate_keys_from_parameters(&params, 2).unwrap();
//!
//! let group = pair.public_key.group().clone();
//! let messages = vec![group.element(16.into()).unwrap(), group.element(9.into()).unwrap()];
//! let values = ElGamalEncrypter::new(pair.public_key.clone())
//!     .encrypt_group_elements(&messages)
//!     .unwrap();
//!
//! let splitter = MultiKeyShareSplitter::default();
//! let containers = splitter.split(&pair.private_key, 3, 2).unwrap();
//! let recovered = splitter.recover(&containers[1..], &pair.public_key).unwrap();
//!
//! let decrypted = ElGamalDecrypter::new(recovered).decrypt(values.ciphertext(), true).unwrap();
//! assert_eq!(decrypted, messages);
//! ```

pub mod decrypter;
pub mod encrypted_share;
pub mod encrypter;
pub mod exponent;
pub mod functions;
pub mod group;
pub mod key_shares;
pub mod keygen;
pub mod keys;
pub mod multishare;
pub mod params;
pub mod polynomial;
pub mod shamir;
pub mod token;

pub use decrypter::ElGamalDecrypter;
pub use encrypted_share::{EncryptedShareContainer, ShareSigner, ShareVerifier};
pub use encrypter::{ElGamalCiphertext, ElGamalEncrypter, ElGamalEncrypterValues, ElGamalError};
pub use exponent::Exponent;
pub use group::{GroupElement, ZpSubgroup};
pub use key_shares::MultiKeyShareSplitter;
pub use keygen::ElGamalKeyPairGenerator;
pub use keys::{ElGamalKeyPair, ElGamalPrivateKey, ElGamalPublicKey};
pub use multishare::MultipleSharesContainer;
pub use params::ElGamalEncryptionParameters;
pub use shamir::{Share, ThresholdSecretSharing};
