//! The carrier: who is aboard, when they pay, and where they get off.
//!
//! Everything here runs on the tick loop. Payment timers are entries in a
//! min-heap polled once per tick, and drop-off scanning decides first and
//! ejects afterwards so the roster is never mutated mid-scan.

use crate::config::SimConfig;
use crate::error::FareError;
use crate::event::{EventLog, SimEvent};
use crate::factory::PassengerFactory;
use crate::ledger::{FareLedger, PenaltyKind};
use crate::passenger::{Passenger, PassengerId, PassengerState, Roster};
use crate::seating::{Position, SeatRegistry, Spawner};
use log::{debug, info, warn};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Kinematic state of the vehicle for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    pub position: Position,
    pub speed: f64,
}

impl VehicleState {
    pub fn new(x: f64, y: f64, speed: f64) -> Self {
        VehicleState {
            position: Position::new(x, y),
            speed,
        }
    }
}

/// A passenger's pending "ready to pay" moment.
#[derive(Debug)]
struct PendingPayment {
    deadline: f64,
    sequence: u64,
    passenger: PassengerId,
}

impl PartialEq for PendingPayment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingPayment {}

impl PartialOrd for PendingPayment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingPayment {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the earliest deadline first
        other
            .deadline
            .total_cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Boarded passengers plus the rules for letting them on and off.
///
/// Seat registry and spawner are optional. Without a seat registry every
/// boarding is refused; without a spawner ejected passengers simply leave
/// the simulation.
pub struct CarrierScheduler<S, W> {
    roster: Roster,
    max_passengers: usize,
    seats: Option<S>,
    spawner: Option<W>,

    pending: BinaryHeap<PendingPayment>,
    sequence: u64,
    clock: f64,

    min_pay_wait: f64,
    max_pay_wait: f64,
    drop_off_x_left: f64,
    drop_off_x_right: f64,
    drop_off_x_offset: f64,
    drop_off_within: f64,
    drop_off_dwell: f64,
    stop_speed_threshold: f64,
    entrance_offset: Position,
}

impl<S: SeatRegistry, W: Spawner> CarrierScheduler<S, W> {
    pub fn new(config: &SimConfig, seats: Option<S>, spawner: Option<W>) -> Self {
        if seats.is_none() {
            warn!("{}; every boarding will be refused", FareError::MissingCollaborator("seat registry"));
        }
        if spawner.is_none() {
            warn!("{}; ejected passengers will not be spawned", FareError::MissingCollaborator("spawner"));
        }

        CarrierScheduler {
            roster: Roster::new(),
            max_passengers: config.max_passengers,
            seats,
            spawner,
            pending: BinaryHeap::new(),
            sequence: 0,
            clock: 0.0,
            min_pay_wait: config.min_pay_wait,
            max_pay_wait: config.max_pay_wait,
            drop_off_x_left: config.drop_off_x_left,
            drop_off_x_right: config.drop_off_x_right,
            drop_off_x_offset: config.drop_off_x_offset,
            drop_off_within: config.drop_off_within,
            drop_off_dwell: config.drop_off_dwell,
            stop_speed_threshold: config.stop_speed_threshold,
            entrance_offset: config.entrance_offset,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub(crate) fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn max_passengers(&self) -> usize {
        self.max_passengers
    }

    pub fn seats(&self) -> Option<&S> {
        self.seats.as_ref()
    }

    pub fn spawner(&self) -> Option<&W> {
        self.spawner.as_ref()
    }

    /// Seconds since the session started.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Number of payment timers not yet fired.
    pub fn pending_payments(&self) -> usize {
        self.pending.len()
    }

    /// Moves the clock forward. Negative or non-finite steps are ignored.
    pub fn advance(&mut self, elapsed: f64) -> f64 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.clock += elapsed;
        }
        self.clock
    }

    /// Boards `passenger` if there is room and a seat to give them.
    pub fn add_passenger(&mut self, passenger: Passenger) -> bool {
        self.admit(passenger).is_ok()
    }

    fn admit(&mut self, passenger: Passenger) -> Result<(), FareError> {
        if self.roster.len() >= self.max_passengers {
            debug!(
                "Over capacity ({}/{}), refusing {}",
                self.roster.len(),
                self.max_passengers,
                passenger.id
            );
            return Err(FareError::OverCapacity);
        }

        let seats = self
            .seats
            .as_mut()
            .ok_or(FareError::MissingCollaborator("seat registry"))?;
        if seats.is_occupied(passenger.id) || !seats.assign_to_seat(passenger.id) {
            return Err(FareError::SeatUnavailable);
        }

        debug!(
            "{} boarded ({}/{})",
            passenger.id,
            self.roster.len() + 1,
            self.max_passengers
        );
        self.roster.push(passenger);
        Ok(())
    }

    /// Picks up a new passenger at the vehicle's current position.
    ///
    /// On success a payment timer is started. A refused passenger is put
    /// straight back out at the entrance. Returns whether they boarded.
    pub fn abduct_passenger<R: Rng + ?Sized>(
        &mut self,
        factory: &PassengerFactory,
        id: PassengerId,
        vehicle: &VehicleState,
        rng: &mut R,
        events: &mut EventLog,
    ) -> bool {
        let passenger = factory.create(id, vehicle.position.y, rng);

        match self.admit(passenger) {
            Ok(()) => {
                let wait = if self.max_pay_wait > self.min_pay_wait {
                    rng.gen_range(self.min_pay_wait..self.max_pay_wait)
                } else {
                    self.min_pay_wait
                };
                self.schedule_payment(id, wait);
                events.record(SimEvent::PassengerBoarded { passenger: id });
                true
            }
            Err(reason) => {
                let entrance = Position::new(
                    vehicle.position.x + self.entrance_offset.x,
                    vehicle.position.y + self.entrance_offset.y,
                );
                info!("Refused {} ({}), ejecting at entrance", id, reason);
                if let Some(spawner) = self.spawner.as_mut() {
                    spawner.spawn_at(entrance);
                }
                events.record(SimEvent::PassengerRejected {
                    passenger: id,
                    reason,
                });
                false
            }
        }
    }

    fn schedule_payment(&mut self, passenger: PassengerId, delay: f64) {
        let deadline = self.clock + delay;
        debug!("{} will pay at t={:.2}", passenger, deadline);
        self.pending.push(PendingPayment {
            deadline,
            sequence: self.sequence,
            passenger,
        });
        self.sequence += 1;
    }

    /// Fires every payment timer whose deadline has passed, queueing those
    /// passengers with the ledger. Timers of departed passengers are dropped.
    pub fn poll_payments(&mut self, ledger: &mut FareLedger, events: &mut EventLog) -> usize {
        let mut fired = 0;

        while self
            .pending
            .peek()
            .is_some_and(|next| next.deadline <= self.clock)
        {
            let Some(due) = self.pending.pop() else {
                break;
            };

            let Some(passenger) = self.roster.get_mut(due.passenger) else {
                debug!("Ignoring payment timer for departed {}", due.passenger);
                continue;
            };
            passenger.pay();

            match ledger.queue_payment(due.passenger, &self.roster, events) {
                Ok(()) => fired += 1,
                Err(e) => warn!("Could not queue {}: {}", due.passenger, e),
            }
        }

        fired
    }

    /// Where a passenger would be let off if the vehicle stopped here, or
    /// `None` when it is moving or not pulled over to a curb.
    pub fn curb_drop_position(&self, vehicle: &VehicleState) -> Option<Position> {
        if vehicle.speed.abs() > self.stop_speed_threshold {
            return None;
        }

        let Position { x, y } = vehicle.position;
        if x <= self.drop_off_x_left {
            Some(Position::new(self.drop_off_x_left - self.drop_off_x_offset, y))
        } else if x >= self.drop_off_x_right {
            Some(Position::new(self.drop_off_x_right + self.drop_off_x_offset, y))
        } else {
            None
        }
    }

    /// Lets the passenger off if they have reached their stop and the vehicle
    /// is stopped at a curb. Returns whether they were ejected.
    pub fn request_full_stop(
        &mut self,
        passenger: PassengerId,
        vehicle: &VehicleState,
        ledger: &mut FareLedger,
        events: &mut EventLog,
    ) -> bool {
        let Some(record) = self.roster.get(passenger) else {
            return false;
        };
        if vehicle.position.y < record.drop_off_at_y {
            return false;
        }

        match self.curb_drop_position(vehicle) {
            Some(position) => self
                .eject_passenger(passenger, position, ledger, events)
                .is_some(),
            None => false,
        }
    }

    /// Per-tick drop-off pass over every boarded passenger.
    ///
    /// Passengers carried past their stop plus the grace distance accrue the
    /// missed-stop rate for `elapsed` seconds each. Returns the passengers
    /// let off this tick.
    pub fn check_drop_offs(
        &mut self,
        vehicle: &VehicleState,
        elapsed: f64,
        ledger: &mut FareLedger,
        events: &mut EventLog,
    ) -> Vec<PassengerId> {
        let carrier_y = vehicle.position.y;
        let stop = self.curb_drop_position(vehicle);
        let dwell = self.drop_off_dwell;
        let within = self.drop_off_within;
        let step = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };

        let mut missed = 0u32;
        let mut leaving = Vec::new();

        for passenger in self.roster.iter_mut() {
            passenger.to_drop_off = carrier_y >= passenger.drop_off_at_y;
            if carrier_y > passenger.drop_off_at_y + within {
                missed += 1;
            }
            if !passenger.to_drop_off {
                continue;
            }

            match stop {
                Some(position) => {
                    passenger.stopped_for += step;
                    if passenger.stopped_for >= dwell {
                        leaving.push((passenger.id, position));
                    }
                }
                None => passenger.stopped_for = 0.0,
            }
        }

        if missed > 0 {
            let amount = ledger.missed_stop_rate().per_second(step * f64::from(missed));
            ledger.apply_penalty(PenaltyKind::MissedStop, amount, events);
        }

        leaving
            .into_iter()
            .filter_map(|(id, position)| {
                self.eject_passenger(id, position, ledger, events)
                    .map(|passenger| passenger.id)
            })
            .collect()
    }

    /// Takes the passenger out of the carrier and hands them to the world at
    /// `position`. Returns the departed record, or `None` if not aboard.
    pub fn eject_passenger(
        &mut self,
        passenger: PassengerId,
        position: Position,
        ledger: &mut FareLedger,
        events: &mut EventLog,
    ) -> Option<Passenger> {
        let mut departed = self.roster.remove(passenger)?;
        departed.state = PassengerState::Dropped;

        if let Some(seats) = self.seats.as_mut() {
            seats.clear_seat(passenger);
        }
        ledger.forget(passenger);

        match self.spawner.as_mut() {
            Some(spawner) => {
                let handle = spawner.spawn_at(position);
                debug!("{} spawned as entity {:?}", passenger, handle);
            }
            None => debug!("{} left without a world entity", passenger),
        }

        info!(
            "Dropped off {} at ({:.1}, {:.1}), {} still aboard",
            passenger,
            position.x,
            position.y,
            self.roster.len()
        );
        events.record(SimEvent::PassengerDropped {
            passenger,
            position,
        });
        Some(departed)
    }
}
