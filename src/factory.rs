//! Passenger creation: fares, the cash they carry, and where they get off.

use crate::config::{SettlementMode, SimConfig};
use crate::denomination::{COINS, DENOMINATIONS};
use crate::error::ConfigError;
use crate::passenger::{Passenger, PassengerId};
use log::debug;
use rand::Rng;

/// Cash draws rejected for falling outside the pay bounds before the last
/// draw is kept as is.
const MAX_CASH_DRAWS: usize = 16;

/// Samples `[min, max)` skewed towards `average`.
///
/// The further `average` sits from the midpoint, the stronger the skew. An
/// `average` right on the midpoint still skews slightly low.
pub fn biased_random<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64, average: f64) -> f64 {
    let range = max - min;
    if range <= 0.0 {
        return min;
    }
    let midpoint = (min + max) / 2.0;

    let bias_right = average > midpoint;

    let distance = (average - midpoint).abs() / (range / 2.0);
    let exponent = if bias_right {
        (1.0 - distance) * 2.0 + 1.0
    } else {
        (1.0 + distance) * 2.0 + 1.0
    };

    let u: f64 = rng.gen();
    let skewed = if bias_right {
        u.powf(1.0 / exponent)
    } else {
        1.0 - (1.0 - u).powf(1.0 / exponent)
    };

    min + skewed * range
}

/// Builds passengers for one carrier.
///
/// Bounds are checked once in [`PassengerFactory::new`]; [`create`] cannot
/// fail afterwards.
///
/// [`create`]: PassengerFactory::create
#[derive(Debug, Clone)]
pub struct PassengerFactory {
    min_fare: i64,
    max_fare: i64,
    fare_average: Option<f64>,
    min_pay: i64,
    max_pay: i64,
    drop_off_distance_min: f64,
    drop_off_distance_max: f64,
    cash: &'static [i64],
}

impl PassengerFactory {
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let cash: &'static [i64] = match config.settlement {
            SettlementMode::Change => &DENOMINATIONS,
            SettlementMode::Exact => &COINS,
        };

        Ok(PassengerFactory {
            min_fare: config.min_fare,
            max_fare: config.max_fare,
            fare_average: config.fare_average,
            min_pay: config.min_pay,
            max_pay: config.max_pay,
            drop_off_distance_min: config.drop_off_distance_min,
            drop_off_distance_max: config.drop_off_distance_max,
            cash,
        })
    }

    /// Denominations passengers from this factory pay with.
    pub fn cash_denominations(&self) -> &'static [i64] {
        self.cash
    }

    /// Creates a passenger boarding a carrier currently at `carrier_y`.
    pub fn create<R: Rng + ?Sized>(&self, id: PassengerId, carrier_y: f64, rng: &mut R) -> Passenger {
        let fare_owed = self.sample_fare(rng);
        let coin_options = self.sample_cash(rng);

        let distance = if self.drop_off_distance_max > self.drop_off_distance_min {
            rng.gen_range(self.drop_off_distance_min..self.drop_off_distance_max)
        } else {
            self.drop_off_distance_min
        };

        let passenger = Passenger::new(id, fare_owed, coin_options, carrier_y + distance);
        debug!(
            "Created {}: owes P{}, carries {:?}, alights at y={:.1}",
            id, passenger.fare_owed, passenger.coin_options, passenger.drop_off_at_y
        );
        passenger
    }

    fn sample_fare<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match self.fare_average {
            Some(average) => {
                let fare = biased_random(rng, self.min_fare as f64, self.max_fare as f64, average);
                (fare as i64).clamp(self.min_fare, self.max_fare)
            }
            None => rng.gen_range(self.min_fare..=self.max_fare),
        }
    }

    /// Four independent uniform picks from the cash set, redrawn while the
    /// total falls outside the pay bounds.
    fn sample_cash<R: Rng + ?Sized>(&self, rng: &mut R) -> [i64; 4] {
        let mut coins = [0; 4];
        for _ in 0..MAX_CASH_DRAWS {
            for coin in coins.iter_mut() {
                *coin = self.cash[rng.gen_range(0..self.cash.len())];
            }
            let total: i64 = coins.iter().sum();
            if (self.min_pay..=self.max_pay).contains(&total) {
                return coins;
            }
        }
        debug!("Keeping out-of-bounds cash draw {:?}", coins);
        coins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denomination::is_denomination;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_biased_random_matches_formula() {
        let mut a = rng();
        let mut b = rng();
        let sample = biased_random(&mut a, 0.0, 100.0, 75.0);

        // distance 0.5 -> exponent 2 on the right-biased branch
        let u: f64 = b.gen();
        assert!((sample - 100.0 * u.powf(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_biased_random_left_branch_matches_formula() {
        let mut a = rng();
        let mut b = rng();
        let sample = biased_random(&mut a, 10.0, 30.0, 15.0);

        // distance 0.5 -> exponent 4 on the left-biased branch
        let u: f64 = b.gen();
        let expected = 10.0 + (1.0 - (1.0 - u).powf(0.25)) * 20.0;
        assert!((sample - expected).abs() < 1e-12);
    }

    #[test]
    fn test_biased_random_stays_in_range_and_skews() {
        let mut r = rng();
        let samples: Vec<f64> = (0..2000).map(|_| biased_random(&mut r, 11.0, 30.0, 28.0)).collect();
        assert!(samples.iter().all(|s| (11.0..=30.0).contains(s)));

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean > 20.5, "mean {} should skew right", mean);
    }

    #[test]
    fn test_biased_random_degenerate_range() {
        assert_eq!(biased_random(&mut rng(), 5.0, 5.0, 5.0), 5.0);
    }

    #[test]
    fn test_created_passengers_hold_invariants() {
        let config = SimConfig::default();
        let factory = PassengerFactory::new(&config).unwrap();
        let mut r = rng();

        for n in 0..500 {
            let p = factory.create(PassengerId(n), 40.0, &mut r);
            assert_eq!(p.coin_options.iter().sum::<i64>(), p.fare_to_pay);
            assert!(p.coin_options.iter().all(|&c| is_denomination(c)));
            assert!((config.min_fare..=config.max_fare).contains(&p.fare_owed));
            assert!(p.drop_off_at_y >= 40.0 + config.drop_off_distance_min);
            assert!(p.drop_off_at_y < 40.0 + config.drop_off_distance_max);
            assert!(!p.fully_paid && !p.to_drop_off);
        }
    }

    #[test]
    fn test_exact_mode_pays_in_coins() {
        let config = SimConfig {
            settlement: SettlementMode::Exact,
            ..SimConfig::default()
        };
        let factory = PassengerFactory::new(&config).unwrap();
        let mut r = rng();

        for n in 0..200 {
            let p = factory.create(PassengerId(n), 0.0, &mut r);
            assert!(p.coin_options.iter().all(|c| COINS.contains(c)));
        }
    }

    #[test]
    fn test_biased_fares_stay_in_bounds() {
        let config = SimConfig {
            fare_average: Some(20.0),
            ..SimConfig::default()
        };
        let factory = PassengerFactory::new(&config).unwrap();
        let mut r = rng();

        for n in 0..200 {
            let p = factory.create(PassengerId(n), 0.0, &mut r);
            assert!((11..=30).contains(&p.fare_owed));
        }
    }

    #[test]
    fn test_same_seed_same_passenger() {
        let factory = PassengerFactory::new(&SimConfig::default()).unwrap();
        let a = factory.create(PassengerId(1), 0.0, &mut rng());
        let b = factory.create(PassengerId(1), 0.0, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_bounds_fail_at_construction() {
        let config = SimConfig {
            min_pay: 500,
            max_pay: 100,
            ..SimConfig::default()
        };
        assert!(PassengerFactory::new(&config).is_err());
    }
}
