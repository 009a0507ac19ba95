use crate::functions::{mod_inverse, random_mod, FunctionError};
use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{One, Zero};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

/// Polynomial over `Z_modulus`. Coefficients are secret and wiped on drop.
pub struct Polynomial {
    coefficients: Vec<BigInt>,
    modulus: BigInt,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolynomialError {
    #[error("random number generation failed: {0}")]
    RandomNumberGeneration(String),
    #[error("invalid degree")]
    InvalidDegree,
    #[error("no points to interpolate")]
    NoPoints,
    #[error("x = {0} appears more than once")]
    RepeatedPoint(BigInt),
    #[error(transparent)]
    Arithmetic(#[from] FunctionError),
}

impl Polynomial {
    /// Degree `degree` polynomial with `f(0) = constant` and the other coefficients uniform in `[0, modulus)`.
    pub fn new_random(
        degree: usize,
        constant: &BigInt,
        modulus: &BigInt,
        rng: &mut impl RngCore,
    ) -> Result<Self, PolynomialError> {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(constant.mod_floor(modulus));
        for _ in 0..degree {
            let coeff = random_mod(modulus, rng)
                .map_err(|e| PolynomialError::RandomNumberGeneration(e.to_string()))?;
            coefficients.push(coeff);
        }
        Ok(Polynomial {
            coefficients,
            modulus: modulus.clone(),
        })
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn evaluate(&self, x: &BigInt) -> Result<BigInt, PolynomialError> {
        if self.coefficients.is_empty() {
            return Err(PolynomialError::InvalidDegree);
        }
        let mut result = BigInt::zero();
        let mut x_power = BigInt::one();
        for coeff in &self.coefficients {
            result = (result + coeff * &x_power).mod_floor(&self.modulus);
            x_power = (x_power * x).mod_floor(&self.modulus);
        }
        Ok(result)
    }
}

impl Zeroize for Polynomial {
    fn zeroize(&mut self) {
        self.coefficients.iter_mut().for_each(Zeroize::zeroize);
    }
}

impl Drop for Polynomial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Lagrange interpolation of `points` evaluated at `x = 0`, modulo a prime.
pub fn interpolate_at_zero(points: &[(BigInt, BigInt)], modulus: &BigInt) -> Result<BigInt, PolynomialError> {
    if points.is_empty() {
        return Err(PolynomialError::NoPoints);
    }
    for (i, (x, _)) in points.iter().enumerate() {
        if points[..i].iter().any(|(other, _)| other == x) {
            return Err(PolynomialError::RepeatedPoint(x.clone()));
        }
    }
    let mut result = BigInt::zero();
    for (j, (x_j, y_j)) in points.iter().enumerate() {
        let mut num = BigInt::one();
        let mut den = BigInt::one();
        for (m, (x_m, _)) in points.iter().enumerate() {
            if m != j {
                num = (num * x_m).mod_floor(modulus);
                den = (den * (x_m - x_j)).mod_floor(modulus);
            }
        }
        let lambda = (num * mod_inverse(&den, modulus)?).mod_floor(modulus);
        result = (result + y_j * lambda).mod_floor(modulus);
    }
    Ok(result)
}
