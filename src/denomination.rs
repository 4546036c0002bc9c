//! The toy peso denomination set and the rounding helpers built on it.

use crate::error::FareError;
use log::debug;

/// Every coin and bill value in circulation, smallest first.
pub const DENOMINATIONS: [i64; 9] = [1, 5, 10, 20, 50, 100, 200, 500, 1000];

/// The coin-only subset. Anything from P50 up is a bill.
pub const COINS: [i64; 4] = [1, 5, 10, 20];

/// Smallest value that is only ever paid as a bill.
const SMALLEST_BILL: i64 = 50;

/// Returns `true` if `amount` is one of [`DENOMINATIONS`].
pub fn is_denomination(amount: i64) -> bool {
    DENOMINATIONS.contains(&amount)
}

/// Breaks `value` into coins, largest first, using only P20 and below.
///
/// ```
/// use jeepney_fares::round_to_coins;
///
/// assert_eq!(round_to_coins(37).unwrap(), vec![20, 10, 5, 1, 1]);
/// ```
pub fn round_to_coins(value: i64) -> Result<Vec<i64>, FareError> {
    if value < 0 {
        return Err(FareError::NegativeValue(value));
    }

    let mut remaining = value;
    let mut coins = Vec::new();
    for &coin in COINS.iter().rev() {
        while remaining >= coin {
            coins.push(coin);
            remaining -= coin;
        }
    }

    debug!("Rounded P{} to coins {:?}", value, coins);
    Ok(coins)
}

/// Rounds `value` down to the largest single denomination that fits.
///
/// Values below P50 are returned untouched unless `round_coins` is set, so
/// small amounts keep being paid in exact change. Nothing below P1 can be
/// paid at all.
pub fn round_to_bill(value: i64, round_coins: bool) -> Result<i64, FareError> {
    if value < DENOMINATIONS[0] {
        return Err(FareError::NoSuitableDenomination(value));
    }
    if value < SMALLEST_BILL && !round_coins {
        return Ok(value);
    }

    DENOMINATIONS
        .iter()
        .rev()
        .copied()
        .find(|&denomination| denomination <= value)
        .ok_or(FareError::NoSuitableDenomination(value))
}
