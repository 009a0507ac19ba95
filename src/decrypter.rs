use tracing::warn;

use crate::encrypter::{ElGamalCiphertext, ElGamalError};
use crate::group::GroupElement;
use crate::keys::ElGamalPrivateKey;

#[derive(Debug, Clone)]
pub struct ElGamalDecrypter {
    private_key: ElGamalPrivateKey,
}

impl ElGamalDecrypter {
    pub fn new(private_key: ElGamalPrivateKey) -> Self {
        ElGamalDecrypter { private_key }
    }

    /// `m_i = phi_i * (gamma^{x_i})^{-1}`, with `x_i` taken positionally from the private key.
    ///
    /// With `check_membership` set, `gamma` and every phi must pass the `value^q = 1` test first.
    pub fn decrypt(
        &self,
        ciphertext: &ElGamalCiphertext,
        check_membership: bool,
    ) -> Result<Vec<GroupElement>, ElGamalError> {
        let max = self.private_key.len();
        if ciphertext.len() > max {
            return Err(ElGamalError::TooManyPhis {
                found: ciphertext.len(),
                max,
            });
        }
        if check_membership {
            self.check_membership(ciphertext)?;
        }
        let gamma = ciphertext.gamma();
        ciphertext
            .phis()
            .iter()
            .zip(self.private_key.keys())
            .map(|(phi, x)| phi.multiply(&gamma.exponentiate(x)?.invert()?))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ElGamalError::from)
    }

    fn check_membership(&self, ciphertext: &ElGamalCiphertext) -> Result<(), ElGamalError> {
        let group = self.private_key.group();
        if !group.is_member(ciphertext.gamma()) {
            warn!("rejected ciphertext: gamma is not a group member");
            return Err(ElGamalError::NotGroupMember("gamma".to_string()));
        }
        if let Some(i) = ciphertext.phis().iter().position(|phi| !group.is_member(phi)) {
            warn!(index = i, "rejected ciphertext: phi is not a group member");
            return Err(ElGamalError::NotGroupMember(format!("phi {i}")));
        }
        Ok(())
    }

    pub fn destroy(&mut self) {
        self.private_key.destroy();
    }
}
