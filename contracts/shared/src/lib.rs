#![no_std]

//! Constants and pure math shared by the vote-escrow and amplifier contracts.

// ============================================================================
// Constants
// ============================================================================

/// Basis points representing 100% (10000 basis points = 100%)
pub const MAX_BASIS_POINTS: i128 = 10_000;

/// Seconds in a day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Seconds in a week
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

/// Shortest accepted lock duration (1 week)
pub const MIN_LOCK_DURATION: u64 = SECONDS_PER_WEEK;

/// Longest accepted lock duration (52 weeks)
pub const MAX_LOCK_DURATION: u64 = 52 * SECONDS_PER_WEEK;

/// Fixed-point scale for the reward-per-share accumulator. 1e12 keeps
/// `elapsed * rate * SHARE_PRECISION` inside i128 for 18-decimal token
/// amounts over year-length epochs.
pub const SHARE_PRECISION: i128 = 1_000_000_000_000;

/// Exit fee charged on withdrawn stake, in basis points (300 = 3%)
pub const EXIT_FEE_BPS: i128 = 300;

// ============================================================================
// Helpers
// ============================================================================

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: i128) -> bool {
    amount > 0
}

/// Validate that a lock duration is within the accepted bounds
pub fn validate_lock_duration(duration: u64) -> bool {
    (MIN_LOCK_DURATION..=MAX_LOCK_DURATION).contains(&duration)
}

/// Voting weight of a lock: `principal * duration / MAX_LOCK_DURATION`.
/// Fixed for the life of the position; never exceeds the principal.
pub fn lock_weight(principal: i128, duration: u64) -> i128 {
    principal
        .saturating_mul(duration as i128)
        .checked_div(MAX_LOCK_DURATION as i128)
        .unwrap_or(0)
}

/// Exit fee withheld from a withdrawn stake amount
pub fn exit_fee(amount: i128) -> i128 {
    amount.saturating_mul(EXIT_FEE_BPS) / MAX_BASIS_POINTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_scales_linearly_with_duration() {
        let principal = 10_000_000_000_000_000_000_000i128; // 10000e18
        assert_eq!(lock_weight(principal, MAX_LOCK_DURATION), principal);
        assert_eq!(lock_weight(principal, MIN_LOCK_DURATION), principal / 52);
        assert_eq!(lock_weight(principal, 26 * SECONDS_PER_WEEK), principal / 2);
        assert_eq!(lock_weight(0, MAX_LOCK_DURATION), 0);
    }

    #[test]
    fn weight_never_exceeds_principal() {
        let principal = 123_456_789i128;
        for weeks in 1..=52u64 {
            assert!(lock_weight(principal, weeks * SECONDS_PER_WEEK) <= principal);
        }
    }

    #[test]
    fn duration_bounds() {
        assert!(!validate_lock_duration(SECONDS_PER_DAY));
        assert!(!validate_lock_duration(MIN_LOCK_DURATION - 1));
        assert!(validate_lock_duration(MIN_LOCK_DURATION));
        assert!(validate_lock_duration(MAX_LOCK_DURATION));
        assert!(!validate_lock_duration(MAX_LOCK_DURATION + 1));
        assert!(!validate_lock_duration(500 * SECONDS_PER_DAY));
    }

    #[test]
    fn exit_fee_is_three_percent() {
        let staked = 2_400_000_000_000_000_000_000i128; // 2400e18
        let fee = exit_fee(staked);
        assert_eq!(fee, staked * 3 / 100);
        assert_eq!(staked - fee, staked * 97 / 100);
    }
}
