//! One game session: the context every fare component works inside.

use crate::config::SimConfig;
use crate::decimal::Pesos;
use crate::error::{ConfigError, FareError};
use crate::event::{EventLog, TimedEvent};
use crate::factory::PassengerFactory;
use crate::ledger::{FareLedger, PenaltyKind, SettlementView};
use crate::passenger::PassengerId;
use crate::scheduler::{CarrierScheduler, VehicleState};
use crate::seating::{RecordingSpawner, SeatRegistry, SeatRow, Spawner};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 42;

/// Totals of a session at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub clock: f64,
    pub balance: i64,
    pub total_penalty: Pesos,
    pub net_balance: Pesos,
    pub aboard: usize,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.1}s: balance P{}, penalties P{}, net P{}, {} aboard",
            self.clock, self.balance, self.total_penalty, self.net_balance, self.aboard
        )
    }
}

/// Owns the factory, ledger, carrier, RNG and event log for one session.
///
/// Driver actions (`accept_payment`, `give_change`, ...) and the tick loop
/// all go through here, so a ledger action can never run in the middle of a
/// drop-off scan.
pub struct Session<S = SeatRow, W = RecordingSpawner> {
    config: SimConfig,
    factory: PassengerFactory,
    ledger: FareLedger,
    carrier: CarrierScheduler<S, W>,
    rng: ChaCha8Rng,
    events: EventLog,
    vehicle: VehicleState,
    next_passenger: u64,
}

impl Session {
    /// Session with one seat per passenger place and a recording spawner.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Session::with_seed(config, DEFAULT_SEED)
    }

    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        let seats = SeatRow::new(config.max_passengers);
        Session::with_collaborators(config, Some(seats), Some(RecordingSpawner::new()), seed)
    }
}

impl<S: SeatRegistry, W: Spawner> Session<S, W> {
    /// Builds a session around caller-supplied collaborators.
    ///
    /// The configuration is validated here, once.
    pub fn with_collaborators(
        config: SimConfig,
        seats: Option<S>,
        spawner: Option<W>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let factory = PassengerFactory::new(&config)?;
        let ledger = FareLedger::new(config.settlement, config.penalties.clone());
        let carrier = CarrierScheduler::new(&config, seats, spawner);

        Ok(Session {
            config,
            factory,
            ledger,
            carrier,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: EventLog::new(),
            vehicle: VehicleState::default(),
            next_passenger: 1,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn ledger(&self) -> &FareLedger {
        &self.ledger
    }

    pub fn carrier(&self) -> &CarrierScheduler<S, W> {
        &self.carrier
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hands over every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<TimedEvent> {
        self.events.drain()
    }

    /// Vehicle state as of the last tick.
    pub fn vehicle(&self) -> VehicleState {
        self.vehicle
    }

    pub fn clock(&self) -> f64 {
        self.carrier.clock()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            clock: self.clock(),
            balance: self.ledger.balance(),
            total_penalty: self.ledger.total_penalty(),
            net_balance: self.ledger.net_balance(),
            aboard: self.carrier.len(),
        }
    }

    /// Advances the session by `elapsed` seconds with the vehicle in the
    /// given state: fires due payment timers, then scans for drop-offs.
    ///
    /// Returns the passengers let off this tick.
    pub fn tick(&mut self, vehicle: VehicleState, elapsed: f64) -> Vec<PassengerId> {
        self.vehicle = vehicle;
        let now = self.carrier.advance(elapsed);
        self.events.set_time(now);

        let queued = self.carrier.poll_payments(&mut self.ledger, &mut self.events);
        if queued > 0 {
            debug!("t={:.2}: {} passenger(s) ready to pay", now, queued);
        }

        self.carrier
            .check_drop_offs(&vehicle, elapsed, &mut self.ledger, &mut self.events)
    }

    /// Picks up a passenger at the vehicle's current position.
    ///
    /// Returns the new passenger's id if they boarded.
    pub fn board(&mut self) -> Option<PassengerId> {
        let id = PassengerId(self.next_passenger);
        self.next_passenger += 1;

        let vehicle = self.vehicle;
        self.carrier
            .abduct_passenger(&self.factory, id, &vehicle, &mut self.rng, &mut self.events)
            .then_some(id)
    }

    pub fn accept_payment(&mut self) -> Result<i64, FareError> {
        self.ledger
            .accept_payment(self.carrier.roster_mut(), &mut self.events)
    }

    pub fn stage_change(&mut self, amount: i64) -> Result<(), FareError> {
        self.ledger.stage_change(amount)
    }

    pub fn unstage_change(&mut self, amount: i64) -> bool {
        self.ledger.unstage_change(amount)
    }

    pub fn cancel_staged_change(&mut self) {
        self.ledger.cancel_staged_change();
    }

    pub fn give_change(&mut self) -> Result<i64, FareError> {
        self.ledger
            .give_change(self.carrier.roster_mut(), &mut self.events)
    }

    pub fn penalize(&mut self, kind: PenaltyKind) -> Pesos {
        self.ledger.penalize(kind, &mut self.events)
    }

    /// Lets a specific passenger off if the current vehicle state allows it.
    pub fn request_full_stop(&mut self, passenger: PassengerId) -> bool {
        let vehicle = self.vehicle;
        self.carrier
            .request_full_stop(passenger, &vehicle, &mut self.ledger, &mut self.events)
    }

    pub fn settlement_view(&self) -> Option<SettlementView> {
        self.ledger.settlement_view(self.carrier.roster())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SimEvent;
    use crate::passenger::PassengerState;

    fn stopped_at(x: f64, y: f64) -> VehicleState {
        VehicleState::new(x, y, 0.0)
    }

    #[test]
    fn test_invalid_config_rejected_once_at_startup() {
        let config = SimConfig {
            min_fare: 50,
            max_fare: 10,
            ..SimConfig::default()
        };
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_board_pay_and_accept() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        session.tick(stopped_at(0.0, 0.0), 0.0);
        let id = session.board().unwrap();

        for _ in 0..6 {
            session.tick(VehicleState::new(0.0, 1.0, 2.0), 1.0);
        }
        assert_eq!(session.ledger().queue_len(), 1);

        let fare_to_pay = session.carrier().roster().get(id).unwrap().fare_to_pay;
        assert_eq!(session.accept_payment(), Ok(fare_to_pay));
        assert_eq!(session.ledger().balance(), fare_to_pay);
    }

    #[test]
    fn test_same_seed_same_session() {
        let run = |seed| {
            let mut session = Session::with_seed(SimConfig::default(), seed).unwrap();
            for _ in 0..4 {
                session.board();
            }
            session
                .carrier()
                .roster()
                .iter()
                .map(|p| (p.fare_owed, p.coin_options, p.drop_off_at_y.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_change_flow_through_session() {
        let config = SimConfig {
            min_pay: 100,
            max_pay: 4000,
            ..SimConfig::default()
        };
        let mut session = Session::new(config).unwrap();
        let id = session.board().unwrap();
        session.tick(stopped_at(0.0, 0.0), 6.0);
        session.accept_payment().unwrap();

        let owed = session.settlement_view().unwrap().expected_change;
        assert!(owed > 0);
        assert_eq!(
            session.carrier().roster().get(id).unwrap().state,
            PassengerState::SettlingChange
        );

        // pay it all back in P1 coins, staged then partly reconsidered
        for _ in 0..owed {
            session.stage_change(1).unwrap();
        }
        session.stage_change(5).unwrap();
        assert!(session.unstage_change(5));
        assert_eq!(session.give_change(), Ok(owed));

        let passenger = session.carrier().roster().get(id).unwrap();
        assert!(passenger.fully_paid);
        assert_eq!(session.ledger().current_passenger(), None);
    }

    #[test]
    fn test_drop_off_round_trip() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        let id = session.board().unwrap();
        let stop = session.carrier().roster().get(id).unwrap().drop_off_at_y;

        session.tick(VehicleState::new(0.0, stop - 1.0, 8.0), 0.5);
        assert!(session.carrier().roster().contains(id));

        let dropped = session.tick(stopped_at(2.5, stop + 1.0), 0.5);
        assert_eq!(dropped, vec![id]);
        assert!(session.events().iter().any(|e| matches!(
            e.event,
            SimEvent::PassengerDropped { passenger, .. } if passenger == id
        )));
    }

    #[test]
    fn test_request_full_stop_uses_last_vehicle_state() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        let id = session.board().unwrap();
        let stop = session.carrier().roster().get(id).unwrap().drop_off_at_y;

        session.tick(VehicleState::new(0.0, stop, 0.0), 0.0);
        assert!(!session.request_full_stop(id));

        // direct request: no drop-off scan has run at this spot yet
        session.vehicle = stopped_at(-2.0, stop);
        assert!(session.request_full_stop(id));
        assert!(session.carrier().is_empty());
    }

    #[test]
    fn test_enormous_tick_saturates_missed_stop_penalty() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        session.board().unwrap();

        session.tick(VehicleState::new(0.0, 1000.0, 5.0), 1e28);
        assert_eq!(session.ledger().total_penalty(), Pesos::MAX);

        session.tick(VehicleState::new(0.0, 1010.0, 5.0), 1e28);
        assert_eq!(session.ledger().total_penalty(), Pesos::MAX);
        assert_eq!(session.ledger().net_balance(), Pesos::ZERO - Pesos::MAX);
        assert_eq!(session.carrier().len(), 1);
    }

    #[test]
    fn test_summary_reports_totals() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        session.board().unwrap();
        session.tick(VehicleState::new(0.0, 10.0, 3.0), 2.5);
        session.penalize(PenaltyKind::Collision);

        let summary = session.summary();
        assert_eq!(summary.balance, 0);
        assert_eq!(summary.net_balance, Pesos::from_whole(-100));
        assert_eq!(summary.aboard, 1);
        assert_eq!(
            summary.to_string(),
            "t=2.5s: balance P0, penalties P100.00, net P-100.00, 1 aboard"
        );
    }

    #[test]
    fn test_penalize_records_event() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        assert_eq!(session.penalize(PenaltyKind::SlowChange), Pesos::from_whole(300));
        assert_eq!(session.ledger().net_balance(), Pesos::from_whole(-300));
        assert_eq!(session.drain_events().len(), 1);
    }
}
