//! Passenger records and the roster that owns them while they ride.
//!
//! # Lifecycle
//!
//! ```text
//! Boarding -> AwaitingPayment -> SettlingChange -> AwaitingDropOff -> Dropped
//!                      \_________________________/^
//! ```
//!
//! A passenger who pays exactly (or short) skips `SettlingChange`. Partial
//! change keeps the passenger in `SettlingChange` until the rest is handed
//! over.

use log::debug;
use std::fmt;

/// Stable identity of a passenger for the whole session.
///
/// Handed out in boarding order by the session, never reused. The ledger and
/// the seat registry refer to passengers only through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassengerId(pub u64);

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passenger #{}", self.0)
    }
}

/// Where a passenger is in their ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassengerState {
    /// Aboard, payment timer still running.
    Boarding,
    /// Queued with the ledger, waiting for the driver to take the fare.
    AwaitingPayment,
    /// Fare taken, change still owed.
    SettlingChange,
    /// Nothing left to settle; riding until their stop.
    AwaitingDropOff,
    /// Left the carrier.
    Dropped,
}

/// A boarded passenger.
///
/// # Invariants
///
/// - `fare_to_pay == coin_options.iter().sum()`
/// - `expected_change >= 0`, and it only ever decreases after acceptance
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    pub id: PassengerId,

    /// Amount required to settle, fixed at creation.
    pub fare_owed: i64,

    /// Sum of the cash the passenger hands over.
    pub fare_to_pay: i64,

    /// The cash itself: four denominations.
    pub coin_options: [i64; 4],

    /// Change still owed back to the passenger.
    pub expected_change: i64,

    pub fully_paid: bool,
    pub to_drop_off: bool,

    /// Road position past which the passenger wants to alight.
    pub drop_off_at_y: f64,

    pub state: PassengerState,

    /// Seconds the carrier has held a valid stop for this passenger.
    pub(crate) stopped_for: f64,
}

impl Passenger {
    /// Creates a passenger carrying `coin_options`; `fare_to_pay` is derived.
    pub fn new(id: PassengerId, fare_owed: i64, coin_options: [i64; 4], drop_off_at_y: f64) -> Self {
        Passenger {
            id,
            fare_owed,
            fare_to_pay: coin_options.iter().sum(),
            coin_options,
            expected_change: 0,
            fully_paid: false,
            to_drop_off: false,
            drop_off_at_y,
            state: PassengerState::Boarding,
            stopped_for: 0.0,
        }
    }

    /// Marks the passenger ready to hand over their fare.
    pub fn pay(&mut self) {
        self.state = PassengerState::AwaitingPayment;
        debug!("{} is ready to pay P{}", self.id, self.fare_to_pay);
    }

    /// Marks the fare settled with nothing further owed either way.
    pub(crate) fn settle(&mut self) {
        self.expected_change = 0;
        self.fully_paid = true;
        self.to_drop_off = true;
        self.state = PassengerState::AwaitingDropOff;
    }

    /// Takes `amount` of change from the driver.
    ///
    /// Returns `true` once everything owed has been received. Anything less
    /// is credited against `expected_change` and the passenger keeps waiting.
    pub fn receive_change(&mut self, amount: i64) -> bool {
        if amount >= self.expected_change {
            debug!(
                "{} completed change: P{} / P{}",
                self.id, amount, self.expected_change
            );
            self.settle();
            return true;
        }

        debug!(
            "{} insufficient change: P{} / P{}",
            self.id, amount, self.expected_change
        );
        self.fully_paid = false;
        self.expected_change -= amount.max(0);
        false
    }
}

/// The carrier's boarded passengers, in boarding order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    passengers: Vec<Passenger>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    pub fn contains(&self, id: PassengerId) -> bool {
        self.passengers.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: PassengerId) -> Option<&Passenger> {
        self.passengers.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PassengerId) -> Option<&mut Passenger> {
        self.passengers.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passenger> {
        self.passengers.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Passenger> {
        self.passengers.iter_mut()
    }

    pub(crate) fn push(&mut self, passenger: Passenger) {
        self.passengers.push(passenger);
    }

    pub(crate) fn remove(&mut self, id: PassengerId) -> Option<Passenger> {
        let index = self.passengers.iter().position(|p| p.id == id)?;
        Some(self.passengers.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overpaying_passenger() -> Passenger {
        let mut p = Passenger::new(PassengerId(1), 15, [20, 10, 5, 1], 120.0);
        p.expected_change = p.fare_to_pay - p.fare_owed;
        p.state = PassengerState::SettlingChange;
        p
    }

    #[test]
    fn test_new_passenger_derives_fare_to_pay() {
        let p = Passenger::new(PassengerId(3), 20, [100, 5, 1, 1], 80.0);
        assert_eq!(p.fare_to_pay, 107);
        assert_eq!(p.expected_change, 0);
        assert!(!p.fully_paid);
        assert!(!p.to_drop_off);
        assert_eq!(p.state, PassengerState::Boarding);
    }

    #[test]
    fn test_full_change_settles() {
        let mut p = overpaying_passenger();
        assert!(p.receive_change(21));
        assert!(p.fully_paid);
        assert!(p.to_drop_off);
        assert_eq!(p.expected_change, 0);
        assert_eq!(p.state, PassengerState::AwaitingDropOff);
    }

    #[test]
    fn test_partial_change_is_credited() {
        let mut p = overpaying_passenger();
        assert!(!p.receive_change(10));
        assert!(!p.fully_paid);
        assert_eq!(p.expected_change, 11);
        assert_eq!(p.state, PassengerState::SettlingChange);

        assert!(p.receive_change(11));
        assert!(p.fully_paid);
    }

    #[test]
    fn test_roster_remove_keeps_order() {
        let mut roster = Roster::new();
        for id in 1..=3 {
            roster.push(Passenger::new(PassengerId(id), 11, [5, 5, 1, 1], 10.0));
        }

        let removed = roster.remove(PassengerId(2)).unwrap();
        assert_eq!(removed.id, PassengerId(2));
        let ids: Vec<_> = roster.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(roster.remove(PassengerId(2)).is_none());
    }
}
