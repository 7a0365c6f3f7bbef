//! Bounded-denominator rational approximation.
//!
//! Integer-only backends need every coefficient of a row scaled by one
//! common multiplier. [`RationalConverter`] finds the best fraction with a
//! bounded denominator for each value and the least common multiple of
//! the denominators for a whole coefficient set.

mod algorithms;


use std::collections::BTreeMap;
use std::fmt;

use num_traits::ToPrimitive;

use crate::error::{ModelForgeError, Result};

/// Search strategy for the best rational approximation.
///
/// All strategies return the same fraction for the same input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RationalAlgorithm {
    /// One mediant at a time through the Farey sequence. Linear in the
    /// partial quotients of the input, so slow for large denominator bounds.
    #[default]
    Farey,
    /// Partial quotients computed directly, as in a continued-fraction expansion.
    ContinuedFraction,
    /// Binary search over runs of the Stern–Brocot tree.
    SternBrocot,
}

impl RationalAlgorithm {
    /// Every algorithm.
    pub const ALL: [RationalAlgorithm; 3] = [
        RationalAlgorithm::Farey,
        RationalAlgorithm::ContinuedFraction,
        RationalAlgorithm::SternBrocot,
    ];
}

impl fmt::Display for RationalAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RationalAlgorithm::Farey => write!(f, "farey"),
            RationalAlgorithm::ContinuedFraction => write!(f, "continued_fraction"),
            RationalAlgorithm::SternBrocot => write!(f, "stern_brocot"),
        }
    }
}

/// Converts floats to fractions with a bounded denominator.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use modelforge_core::RationalConverter;
///
/// let conv = RationalConverter::new(100);
/// assert_eq!(conv.to_rational(0.75).unwrap(), (3, 4));
/// assert_eq!(conv.to_rational(-2.5).unwrap(), (-5, 2));
///
/// let coeffs = BTreeMap::from([("x", 0.5), ("y", 1.0 / 3.0), ("rhs", 2.0)]);
/// let (ints, denominator) = conv.with_tolerance(1e-6).convert_coefficients(&coeffs).unwrap();
/// assert_eq!(denominator, 6);
/// assert_eq!(ints["x"], 3);
/// assert_eq!(ints["y"], 2);
/// assert_eq!(ints["rhs"], 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RationalConverter {
    max_denominator: i64,
    tolerance: f64,
    algorithm: RationalAlgorithm,
}

impl Default for RationalConverter {
    fn default() -> Self {
        Self {
            max_denominator: 10_000,
            tolerance: 1e-9,
            algorithm: RationalAlgorithm::Farey,
        }
    }
}

impl RationalConverter {
    /// Creates a converter with the given denominator bound.
    pub fn new(max_denominator: i64) -> Self {
        Self {
            max_denominator,
            ..Self::default()
        }
    }

    /// Sets the tolerance used for integer short-circuits and batch checks.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the search algorithm.
    pub fn with_algorithm(mut self, algorithm: RationalAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Denominator bound.
    pub fn max_denominator(&self) -> i64 {
        self.max_denominator
    }

    /// Tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Search algorithm.
    pub fn algorithm(&self) -> RationalAlgorithm {
        self.algorithm
    }

    /// Best fraction `(numerator, denominator)` for `x` with
    /// `denominator <= max_denominator`. Ties go to the smaller denominator.
    ///
    /// # Errors
    ///
    /// Non-finite input and a denominator bound below 1 are configuration
    /// errors. Values beyond the `i64` range fail with a rational error.
    pub fn to_rational(&self, x: f64) -> Result<(i64, i64)> {
        if !x.is_finite() {
            return Err(ModelForgeError::Config(format!(
                "cannot convert non-finite value {} to a rational",
                x
            )));
        }
        if self.max_denominator < 1 {
            return Err(ModelForgeError::Config(format!(
                "max_denominator must be at least 1, got {}",
                self.max_denominator
            )));
        }

        let rounded = x.round();
        if x == rounded || (x - rounded).abs() <= self.tolerance {
            return Ok((to_int(rounded)?, 1));
        }

        let magnitude = x.abs();
        let whole = magnitude.floor();
        let frac = magnitude - whole;
        let (p, q) = match self.algorithm {
            RationalAlgorithm::Farey => algorithms::farey(frac, self.max_denominator),
            RationalAlgorithm::ContinuedFraction => {
                algorithms::continued_fraction(frac, self.max_denominator)
            }
            RationalAlgorithm::SternBrocot => algorithms::stern_brocot(frac, self.max_denominator),
        };
        let numerator = to_int(whole)?
            .checked_mul(q)
            .and_then(|n| n.checked_add(p))
            .ok_or_else(|| ModelForgeError::Rational(format!("numerator of {} overflows", x)))?;
        Ok((if x < 0.0 { -numerator } else { numerator }, q))
    }

    /// Converts a coefficient set to integers over one common denominator.
    ///
    /// Returns the integer coefficients and the denominator `D` such that
    /// `ints[k] / D` reconstructs `coeffs[k]` within the tolerance.
    ///
    /// # Errors
    ///
    /// Fails if the common denominator or any scaled coefficient overflows,
    /// or if a value cannot be reconstructed within the tolerance.
    pub fn convert_coefficients<K>(
        &self,
        coeffs: &BTreeMap<K, f64>,
    ) -> Result<(BTreeMap<K, i64>, i64)>
    where
        K: Ord + Clone,
    {
        let mut fractions = Vec::with_capacity(coeffs.len());
        let mut denominator: i64 = 1;
        for (key, &value) in coeffs {
            let (p, q) = self.to_rational(value)?;
            denominator = lcm(denominator, q).ok_or_else(|| {
                ModelForgeError::Rational(format!(
                    "common denominator overflows at {}/{}",
                    p, q
                ))
            })?;
            fractions.push((key, p, q, value));
        }

        let mut out = BTreeMap::new();
        for (key, p, q, value) in fractions {
            let scaled = p.checked_mul(denominator / q).ok_or_else(|| {
                ModelForgeError::Rational(format!(
                    "{} scaled by {} overflows",
                    value, denominator
                ))
            })?;
            let error = (scaled as f64 / denominator as f64 - value).abs();
            if error > self.tolerance * value.abs().max(1.0) {
                return Err(ModelForgeError::Rational(format!(
                    "{} cannot be represented within tolerance {} using denominators up to {} (best {}/{})",
                    value, self.tolerance, self.max_denominator, p, q
                )));
            }
            out.insert(key.clone(), scaled);
        }
        Ok((out, denominator))
    }
}

fn to_int(x: f64) -> Result<i64> {
    x.to_i64()
        .ok_or_else(|| ModelForgeError::Rational(format!("{} is outside the i64 range", x)))
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

fn lcm(a: i64, b: i64) -> Option<i64> {
    (a / gcd(a, b)).checked_mul(b)
}
