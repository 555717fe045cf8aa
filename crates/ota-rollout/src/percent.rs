//! Integer rollout percentages
//!
//! The operand stored in the tree is a fraction in `[0, 1]`; operators and
//! callers always see an integer percent in `[0, 100]`. Conversion from the
//! operand rounds, so the integer percent is the canonical representation.

use ota_branch_mapping::{BranchMappingResult, BranchMappingValidationError};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Share of clients routed to the rolled-out branch, 0 to 100 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    /// No clients
    pub const ZERO: Self = Self(0);

    /// Every client
    pub const FULL: Self = Self(100);

    /// Create percent, rejecting values above 100
    ///
    /// # Errors
    /// Returns [`BranchMappingValidationError::InvalidPercent`] above 100.
    pub fn new(value: u8) -> BranchMappingResult<Self> {
        if value <= 100 {
            Ok(Self(value))
        } else {
            Err(BranchMappingValidationError::invalid_percent(value))
        }
    }

    /// Integer value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Fraction stored as the `hash_lt` operand
    #[inline]
    #[must_use]
    pub fn to_operand(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Percent of a `hash_lt` operand, `round(operand * 100)`
    ///
    /// # Errors
    /// Returns [`BranchMappingValidationError::InvalidPercent`] if the operand
    /// lies outside `[0, 1]`.
    pub fn from_operand(operand: f64) -> BranchMappingResult<Self> {
        Self::try_from((operand * 100.0).round())
            .map_err(|_| BranchMappingValidationError::invalid_percent(operand * 100.0))
    }
}

impl TryFrom<f64> for Percent {
    type Error = BranchMappingValidationError;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value.fract() == 0.0 && (0.0..=100.0).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(BranchMappingValidationError::invalid_percent(value))
        }
    }
}

impl TryFrom<i64> for Percent {
    type Error = BranchMappingValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| BranchMappingValidationError::invalid_percent(value))
            .and_then(Self::new)
    }
}

impl TryFrom<i32> for Percent {
    type Error = BranchMappingValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl FromStr for Percent {
    type Err = BranchMappingValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| BranchMappingValidationError::invalid_percent(s))?;
        Self::try_from(value)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
