//! Referral reward tiers.
//!
//! The multiplier is a step function of a player's referral count. Tiers are
//! checked from the highest threshold down and each threshold is an inclusive
//! lower bound, so every non-negative count maps to exactly one tier.

use std::fmt;

use serde::Serialize;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTier {
    Base,
    Bronze,
    Silver,
    Gold,
}

impl RewardTier {
    const THRESHOLDS: [(u64, RewardTier); 3] =
        [(50, RewardTier::Gold), (10, RewardTier::Silver), (5, RewardTier::Bronze)];

    pub fn for_referrals(referral_count: u64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(threshold, _)| referral_count >= *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or(Self::Base)
    }

    /// Signed entry point for counts that did not come through the store decoder.
    pub fn try_for_referrals(referral_count: i64) -> Result<Self, DomainError> {
        u64::try_from(referral_count)
            .map(Self::for_referrals)
            .map_err(|_| DomainError::NegativeReferralCount(referral_count))
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Bronze => 1.5,
            Self::Silver => 2.0,
            Self::Gold => 5.0,
        }
    }
}

/// Renders as `x<multiplier>` with one decimal place, e.g. `x1.5`.
impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{:.1}", self.multiplier())
    }
}

#[cfg(test)]
mod tests {
    use super::RewardTier;
    use crate::errors::DomainError;

    #[test]
    fn boundary_values_match_tier_table() {
        for (count, expected) in
            [(0, 1.0), (4, 1.0), (5, 1.5), (9, 1.5), (10, 2.0), (49, 2.0), (50, 5.0), (500, 5.0)]
        {
            assert_eq!(
                RewardTier::for_referrals(count).multiplier(),
                expected,
                "unexpected multiplier for {count} referrals"
            );
        }
    }

    #[test]
    fn multiplier_is_monotonic_and_bounded() {
        let allowed = [1.0, 1.5, 2.0, 5.0];
        let mut previous = 0.0;
        for count in 0..=200 {
            let multiplier = RewardTier::for_referrals(count).multiplier();
            assert!(allowed.contains(&multiplier));
            assert!(multiplier >= previous, "multiplier decreased at {count}");
            previous = multiplier;
        }
        assert_eq!(RewardTier::for_referrals(u64::MAX), RewardTier::Gold);
    }

    #[test]
    fn renders_with_one_decimal_place() {
        assert_eq!(RewardTier::for_referrals(50).to_string(), "x5.0");
        assert_eq!(RewardTier::for_referrals(7).to_string(), "x1.5");
        assert_eq!(RewardTier::for_referrals(0).to_string(), "x1.0");
    }

    #[test]
    fn negative_referral_count_is_rejected() {
        assert_eq!(RewardTier::try_for_referrals(-1), Err(DomainError::NegativeReferralCount(-1)));
        assert_eq!(RewardTier::try_for_referrals(12), Ok(RewardTier::Silver));
    }
}
