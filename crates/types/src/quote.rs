/// Request-scoped value types shared by the quote functions

use crate::{WhorlError, WhorlResult, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact fraction used for slippage tolerances and dev fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percentage {
    pub numerator: u64,
    pub denominator: u64,
}

impl Percentage {
    pub fn from_fraction(numerator: u64, denominator: u64) -> WhorlResult<Self> {
        if denominator == 0 {
            return Err(WhorlError::division_by_zero("percentage denominator"));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Percentage expressed in basis points
    pub fn from_bps(bps: u16) -> Self {
        Self {
            numerator: bps as u64,
            denominator: BPS_DENOMINATOR,
        }
    }

    pub fn zero() -> Self {
        Self::from_bps(0)
    }

    /// True when the fraction is 100% or more
    pub fn is_whole_or_more(&self) -> bool {
        self.numerator >= self.denominator
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Terminal state of a simulated swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillState {
    /// The requested amount was fully swapped
    Complete,
    /// The sqrt price limit was reached with amount left over
    PriceLimitReached,
    /// The supplied tick arrays ran out with amount left over
    PartialFill,
}

impl FillState {
    pub fn is_complete(self) -> bool {
        matches!(self, FillState::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_constructors() {
        let p = Percentage::from_bps(250);
        assert_eq!(p.numerator, 250);
        assert_eq!(p.denominator, 10_000);
        assert!(!p.is_whole_or_more());
        assert!(Percentage::from_fraction(1, 1).unwrap().is_whole_or_more());
        assert!(Percentage::from_fraction(1, 0).is_err());
    }
}
