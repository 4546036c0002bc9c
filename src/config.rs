//! Session configuration and the game's tuning constants.

use crate::decimal::Pesos;
use crate::error::ConfigError;
use crate::seating::Position;

/// How `accept_payment` treats a passenger who hands over more than they owe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettlementMode {
    /// Overpayment is settled by staging and giving change back.
    #[default]
    Change,

    /// Reduced configuration: coins only, no staging, paying at least the
    /// fare settles the passenger outright.
    Exact,
}

/// Flat penalty amounts, plus the per-second missed-stop rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltySchedule {
    pub collision: Pesos,
    pub no_pay: Pesos,
    pub slow_change: Pesos,
    /// Charged per second per passenger carried past their stop.
    pub missed_stop_per_second: Pesos,
}

impl Default for PenaltySchedule {
    fn default() -> Self {
        PenaltySchedule {
            collision: Pesos::from_whole(100),
            no_pay: Pesos::from_whole(300),
            slow_change: Pesos::from_whole(300),
            missed_stop_per_second: Pesos::from_whole(50),
        }
    }
}

/// Everything a [`Session`](crate::Session) needs to know up front.
///
/// Distances are in world units along the road (Y grows forward); lateral
/// positions are X. Durations are seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub min_fare: i64,
    pub max_fare: i64,
    pub min_pay: i64,
    pub max_pay: i64,
    /// When set, fares are drawn with [`biased_random`](crate::biased_random)
    /// skewed towards this value instead of uniformly.
    pub fare_average: Option<f64>,

    pub max_passengers: usize,
    pub min_pay_wait: f64,
    pub max_pay_wait: f64,

    /// Carrier X at or below which it counts as pulled over on the left curb.
    pub drop_off_x_left: f64,
    /// Carrier X at or above which it counts as pulled over on the right curb.
    pub drop_off_x_right: f64,
    /// How far past the curb line a dropped passenger is placed.
    pub drop_off_x_offset: f64,
    pub drop_off_distance_min: f64,
    pub drop_off_distance_max: f64,
    /// Grace distance past the drop-off threshold before the stop is missed.
    pub drop_off_within: f64,
    /// Seconds the stop condition must hold before the passenger alights.
    pub drop_off_dwell: f64,
    /// Speeds with magnitude at or below this count as stopped.
    pub stop_speed_threshold: f64,

    /// Where rejected passengers are put back, relative to the carrier.
    pub entrance_offset: Position,

    pub settlement: SettlementMode,
    pub penalties: PenaltySchedule,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            min_fare: 11,
            max_fare: 30,
            min_pay: 11,
            max_pay: 1000,
            fare_average: None,
            max_passengers: 16,
            min_pay_wait: 3.0,
            max_pay_wait: 5.0,
            drop_off_x_left: -2.0,
            drop_off_x_right: 2.0,
            drop_off_x_offset: 1.0,
            drop_off_distance_min: 50.0,
            drop_off_distance_max: 200.0,
            drop_off_within: 20.0,
            drop_off_dwell: 0.0,
            stop_speed_threshold: 0.0,
            entrance_offset: Position::new(0.0, -3.0),
            settlement: SettlementMode::Change,
            penalties: PenaltySchedule::default(),
        }
    }
}

impl SimConfig {
    /// Checks every bound once; sessions refuse to start on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bounds("fare", self.min_fare as f64, self.max_fare as f64)?;
        check_bounds("pay", self.min_pay as f64, self.max_pay as f64)?;
        check_bounds("pay wait", self.min_pay_wait, self.max_pay_wait)?;
        check_bounds(
            "drop-off distance",
            self.drop_off_distance_min,
            self.drop_off_distance_max,
        )?;
        check_bounds("curb thresholds", self.drop_off_x_left, self.drop_off_x_right)?;

        if self.min_fare < 0 || self.min_pay < 0 {
            return Err(ConfigError::InvalidValue {
                name: "fare",
                message: "fares and payments cannot be negative".to_string(),
            });
        }
        if self.max_passengers == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max passengers",
                message: "the carrier must hold at least one passenger".to_string(),
            });
        }
        if self.min_pay_wait < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "pay wait",
                message: format!("negative wait {}", self.min_pay_wait),
            });
        }
        for (name, value) in [
            ("drop-off dwell", self.drop_off_dwell),
            ("drop-off grace distance", self.drop_off_within),
            ("curb drop-off offset", self.drop_off_x_offset),
            ("stop speed threshold", self.stop_speed_threshold),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    message: format!("must be a non-negative number, got {}", value),
                });
            }
        }
        if let Some(average) = self.fare_average {
            if average < self.min_fare as f64 || average > self.max_fare as f64 {
                return Err(ConfigError::InvalidValue {
                    name: "fare average",
                    message: format!(
                        "{} lies outside [{}, {}]",
                        average, self.min_fare, self.max_fare
                    ),
                });
            }
        }
        Ok(())
    }
}

fn check_bounds(name: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max || min.is_nan() || max.is_nan() {
        return Err(ConfigError::InvalidBounds { name, min, max });
    }
    Ok(())
}
