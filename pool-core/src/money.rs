//! Fixed-point money arithmetic
//!
//! All amounts are integers in the smallest currency unit; no operation
//! accepts or returns a floating-point value. Divisions round half to even
//! so that results are reproducible bit-for-bit across platforms, and
//! overflow on any intermediate product is a fatal `ArithmeticOverflow`,
//! never a silent wrap or clamp.

use crate::constants::{BPS_DENOMINATOR, SECONDS_PER_YEAR};
use crate::error::{LedgerError, LedgerResult};

/// Checked addition.
pub fn add(a: u64, b: u64) -> LedgerResult<u64> {
    a.checked_add(b)
        .ok_or(LedgerError::ArithmeticOverflow { operation: "add" })
}

/// Checked subtraction; underflow is an overflow error too.
pub fn sub(a: u64, b: u64) -> LedgerResult<u64> {
    a.checked_sub(b)
        .ok_or(LedgerError::ArithmeticOverflow { operation: "sub" })
}

/// `amount * bps / 10_000` with round-half-to-even.
pub fn scale_by_bps(amount: u64, bps: u32) -> LedgerResult<u64> {
    let numerator = u128::from(amount) * u128::from(bps);
    let scaled = div_round_half_even(numerator, u128::from(BPS_DENOMINATOR));
    u64::try_from(scaled).map_err(|_| LedgerError::ArithmeticOverflow {
        operation: "scale_by_bps",
    })
}

/// Annualized simple interest accrued over `elapsed_secs`, capped at
/// `term_secs`:
///
/// ```text
/// amount * bps * min(elapsed, term) / (10_000 * SECONDS_PER_YEAR)
/// ```
///
/// with round-half-to-even on the final division. At `elapsed == term` this
/// is the full-term interest `amount * bps/10_000 * term/SECONDS_PER_YEAR`.
pub fn pro_rata_by_time(
    amount: u64,
    bps: u32,
    elapsed_secs: u64,
    term_secs: u64,
) -> LedgerResult<u64> {
    let elapsed = elapsed_secs.min(term_secs);

    let numerator = u128::from(amount)
        .checked_mul(u128::from(bps))
        .and_then(|n| n.checked_mul(u128::from(elapsed)))
        .ok_or(LedgerError::ArithmeticOverflow {
            operation: "pro_rata_by_time",
        })?;
    let denominator = u128::from(BPS_DENOMINATOR) * u128::from(SECONDS_PER_YEAR);

    let accrued = div_round_half_even(numerator, denominator);
    u64::try_from(accrued).map_err(|_| LedgerError::ArithmeticOverflow {
        operation: "pro_rata_by_time",
    })
}

/// Integer division with round-half-to-even (banker's rounding).
///
/// `denominator` must be non-zero; callers only pass fixed constants.
fn div_round_half_even(numerator: u128, denominator: u128) -> u128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    match (remainder * 2).cmp(&denominator) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sub() {
        assert_eq!(add(2, 3).unwrap(), 5);
        assert_eq!(sub(5, 3).unwrap(), 2);
        assert!(matches!(
            add(u64::MAX, 1),
            Err(LedgerError::ArithmeticOverflow { operation: "add" })
        ));
        assert!(matches!(
            sub(3, 5),
            Err(LedgerError::ArithmeticOverflow { operation: "sub" })
        ));
    }

    #[test]
    fn test_scale_by_bps_exact() {
        // 8.5% of 10_000 = 850, no rounding involved
        assert_eq!(scale_by_bps(10_000, 850).unwrap(), 850);
        // 100% and 0%
        assert_eq!(scale_by_bps(12_345, 10_000).unwrap(), 12_345);
        assert_eq!(scale_by_bps(12_345, 0).unwrap(), 0);
    }

    #[test]
    fn test_scale_by_bps_rounds_half_to_even() {
        // 25 * 500 / 10000 = 1.25 -> ties not involved, truncation side
        assert_eq!(scale_by_bps(25, 500).unwrap(), 1);
        // 1 * 5000 / 10000 = 0.5 -> ties to even -> 0
        assert_eq!(scale_by_bps(1, 5_000).unwrap(), 0);
        // 3 * 5000 / 10000 = 1.5 -> ties to even -> 2
        assert_eq!(scale_by_bps(3, 5_000).unwrap(), 2);
        // 5 * 5000 / 10000 = 2.5 -> ties to even -> 2
        assert_eq!(scale_by_bps(5, 5_000).unwrap(), 2);
    }

    #[test]
    fn test_pro_rata_pinned_vector() {
        // 1000 principal, 8.5% APY, 90-day term, full term elapsed:
        // 1000 * 850 * 7_776_000 / (10_000 * 31_536_000) = 20.958... -> 21
        assert_eq!(pro_rata_by_time(1_000, 850, 7_776_000, 7_776_000).unwrap(), 21);
    }

    #[test]
    fn test_pro_rata_caps_elapsed_at_term() {
        let full = pro_rata_by_time(1_000, 850, 7_776_000, 7_776_000).unwrap();
        let over = pro_rata_by_time(1_000, 850, 99_999_999, 7_776_000).unwrap();
        assert_eq!(full, over);
    }

    #[test]
    fn test_pro_rata_partial_accrual() {
        // half the term accrues roughly half the interest
        let full = pro_rata_by_time(1_000_000, 850, 7_776_000, 7_776_000).unwrap();
        let half = pro_rata_by_time(1_000_000, 850, 3_888_000, 7_776_000).unwrap();
        assert!(half <= full);
        assert!(full - half * 2 <= 1);
    }

    #[test]
    fn test_pro_rata_zero_cases() {
        assert_eq!(pro_rata_by_time(0, 850, 1_000, 1_000).unwrap(), 0);
        assert_eq!(pro_rata_by_time(1_000, 0, 1_000, 1_000).unwrap(), 0);
        assert_eq!(pro_rata_by_time(1_000, 850, 0, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_pro_rata_intermediate_overflow_is_fatal() {
        let result = pro_rata_by_time(u64::MAX, 10_000, u64::MAX, u64::MAX);
        assert!(matches!(
            result,
            Err(LedgerError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_div_round_half_even() {
        assert_eq!(div_round_half_even(7, 2), 4); // 3.5 -> 4
        assert_eq!(div_round_half_even(5, 2), 2); // 2.5 -> 2
        assert_eq!(div_round_half_even(3, 2), 2); // 1.5 -> 2
        assert_eq!(div_round_half_even(1, 2), 0); // 0.5 -> 0
        assert_eq!(div_round_half_even(9, 4), 2); // 2.25 -> 2
        assert_eq!(div_round_half_even(11, 4), 3); // 2.75 -> 3
    }
}
