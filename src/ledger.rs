//! The fare ledger: balance, the payment queue, staged change and penalties.
//!
//! Passengers are owned by the carrier's [`Roster`]; the ledger only holds
//! their ids and borrows the roster for each operation.
//!
//! # Invariants
//!
//! - `balance >= 0` after every operation
//! - at most one passenger is in settlement at a time
//! - a failed operation leaves queue, staging and balance untouched

use crate::config::{PenaltySchedule, SettlementMode};
use crate::decimal::Pesos;
use crate::denomination::is_denomination;
use crate::error::FareError;
use crate::event::{EventLog, SimEvent};
use crate::passenger::{PassengerId, PassengerState, Roster};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;

/// What a penalty was charged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PenaltyKind {
    Collision,
    NoPay,
    SlowChange,
    /// Charged continuously while a passenger is carried past their stop.
    MissedStop,
}

impl PenaltyKind {
    pub(crate) fn event_name(self) -> &'static str {
        match self {
            PenaltyKind::Collision => "collision_penalty",
            PenaltyKind::NoPay => "no_pay_penalty",
            PenaltyKind::SlowChange => "slow_change_penalty",
            PenaltyKind::MissedStop => "missed_stop_penalty",
        }
    }
}

impl PenaltySchedule {
    /// One-off amount for `kind`. Missed stops charge one second's worth.
    pub fn amount(&self, kind: PenaltyKind) -> Pesos {
        match kind {
            PenaltyKind::Collision => self.collision,
            PenaltyKind::NoPay => self.no_pay,
            PenaltyKind::SlowChange => self.slow_change,
            PenaltyKind::MissedStop => self.missed_stop_per_second,
        }
    }
}

/// Snapshot of the settlement in progress, for the fare display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementView {
    pub passenger: PassengerId,
    pub paid: i64,
    pub owed: i64,
    pub staged_change: i64,
    pub expected_change: i64,
}

impl fmt::Display for SettlementView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Paid: {}\nOwed: {}\nChange: {}",
            self.paid, self.owed, self.staged_change
        )
    }
}

/// Money collected by one carrier.
#[derive(Debug, Clone)]
pub struct FareLedger {
    balance: i64,
    total_penalty: Pesos,
    payment_queue: VecDeque<PassengerId>,
    current_passenger: Option<PassengerId>,
    staged_change: i64,
    staged_coins: Vec<i64>,
    settlement: SettlementMode,
    penalties: PenaltySchedule,
}

impl FareLedger {
    pub fn new(settlement: SettlementMode, penalties: PenaltySchedule) -> Self {
        FareLedger {
            balance: 0,
            total_penalty: Pesos::ZERO,
            payment_queue: VecDeque::new(),
            current_passenger: None,
            staged_change: 0,
            staged_coins: Vec::new(),
            settlement,
            penalties,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn total_penalty(&self) -> Pesos {
        self.total_penalty
    }

    /// `balance - total_penalty`.
    pub fn net_balance(&self) -> Pesos {
        Pesos::from_whole(self.balance) - self.total_penalty
    }

    pub fn queue_len(&self) -> usize {
        self.payment_queue.len()
    }

    /// Passengers waiting to pay, front first.
    pub fn queued(&self) -> impl Iterator<Item = PassengerId> + '_ {
        self.payment_queue.iter().copied()
    }

    pub fn current_passenger(&self) -> Option<PassengerId> {
        self.current_passenger
    }

    pub fn staged_change(&self) -> i64 {
        self.staged_change
    }

    pub fn staged_coins(&self) -> &[i64] {
        &self.staged_coins
    }

    pub fn settlement_mode(&self) -> SettlementMode {
        self.settlement
    }

    /// Queues a boarded passenger to hand over their fare.
    pub fn queue_payment(
        &mut self,
        passenger: PassengerId,
        roster: &Roster,
        events: &mut EventLog,
    ) -> Result<(), FareError> {
        if !roster.contains(passenger) {
            return Err(FareError::NullPassenger);
        }

        if self.payment_queue.contains(&passenger) || self.current_passenger == Some(passenger) {
            debug!("{} is already queued for payment", passenger);
            return Ok(());
        }

        self.payment_queue.push_back(passenger);
        debug!(
            "Queued {} for payment ({} waiting)",
            passenger,
            self.payment_queue.len()
        );
        events.record(SimEvent::PaymentQueued { passenger });
        Ok(())
    }

    /// Takes the fare from the passenger at the front of the queue.
    ///
    /// Returns the amount added to the balance.
    pub fn accept_payment(
        &mut self,
        roster: &mut Roster,
        events: &mut EventLog,
    ) -> Result<i64, FareError> {
        if let Some(current) = self.current_passenger {
            return Err(FareError::SettlementInProgress(current));
        }

        while let Some(&front) = self.payment_queue.front() {
            if roster.contains(front) {
                break;
            }
            warn!("Dropping stale queue entry for {}", front);
            self.payment_queue.pop_front();
        }
        let id = self.payment_queue.pop_front().ok_or(FareError::EmptyQueue)?;
        let passenger = roster.get_mut(id).ok_or(FareError::NullPassenger)?;

        let delta = passenger.fare_to_pay;
        self.balance += delta;
        debug!("Received payment from {}: P{}", id, delta);
        events.record(SimEvent::PaymentAccepted {
            passenger: id,
            balance_delta: delta,
        });

        match self.settlement {
            SettlementMode::Change if passenger.fare_to_pay > passenger.fare_owed => {
                passenger.expected_change = passenger.fare_to_pay - passenger.fare_owed;
                passenger.state = PassengerState::SettlingChange;
                self.current_passenger = Some(id);
                debug!("{} expects P{} change", id, passenger.expected_change);
            }
            SettlementMode::Exact if passenger.fare_to_pay < passenger.fare_owed => {
                passenger.fully_paid = false;
                passenger.state = PassengerState::AwaitingDropOff;
                warn!(
                    "{} paid short: P{} of P{}",
                    id, passenger.fare_to_pay, passenger.fare_owed
                );
            }
            _ => {
                passenger.settle();
                debug!("Completed transaction with {}", id);
            }
        }

        Ok(delta)
    }

    /// Sets a coin or bill aside as change for the current passenger.
    pub fn stage_change(&mut self, amount: i64) -> Result<(), FareError> {
        if self.settlement == SettlementMode::Exact {
            return Err(FareError::NothingExpected);
        }
        if !is_denomination(amount) {
            return Err(FareError::InvalidDenomination(amount));
        }

        self.staged_coins.push(amount);
        self.staged_change += amount;
        debug!("Staged P{}, total P{}", amount, self.staged_change);
        Ok(())
    }

    /// Takes one staged `amount` back. Returns `false` if none was staged.
    pub fn unstage_change(&mut self, amount: i64) -> bool {
        match self.staged_coins.iter().position(|&coin| coin == amount) {
            Some(index) => {
                self.staged_coins.remove(index);
                self.staged_change -= amount;
                true
            }
            None => {
                warn!("Cannot unstage P{}, it is not staged", amount);
                false
            }
        }
    }

    /// Discards everything staged without handing it over.
    pub fn cancel_staged_change(&mut self) {
        if !self.staged_coins.is_empty() {
            debug!("Cleared P{} of staged change", self.staged_change);
        }
        self.staged_change = 0;
        self.staged_coins.clear();
    }

    /// Hands the staged change to the current passenger.
    ///
    /// Short change is credited and the passenger stays current so the rest
    /// can be staged and given. Returns the amount handed over.
    pub fn give_change(
        &mut self,
        roster: &mut Roster,
        events: &mut EventLog,
    ) -> Result<i64, FareError> {
        let id = self.current_passenger.ok_or(FareError::NoCurrentPassenger)?;
        let passenger = roster.get_mut(id).ok_or(FareError::NoCurrentPassenger)?;

        if passenger.expected_change <= 0 {
            return Err(FareError::NothingExpected);
        }
        if self.staged_change <= 0 && self.staged_coins.is_empty() {
            return Err(FareError::NothingStaged);
        }

        let amount = self.staged_change;
        self.balance = (self.balance - amount).max(0);
        let complete = passenger.receive_change(amount);
        debug!(
            "Gave P{} change to {}, P{} still owed",
            amount, id, passenger.expected_change
        );

        self.staged_change = 0;
        self.staged_coins.clear();
        if complete {
            self.current_passenger = None;
        }

        events.record(SimEvent::ChangeGiven {
            passenger: id,
            amount,
        });
        Ok(amount)
    }

    /// Charges the flat penalty for `kind`.
    pub fn penalize(&mut self, kind: PenaltyKind, events: &mut EventLog) -> Pesos {
        let amount = self.penalties.amount(kind);
        self.apply_penalty(kind, amount, events);
        amount
    }

    /// Charges `amount` under `kind`.
    pub fn apply_penalty(&mut self, kind: PenaltyKind, amount: Pesos, events: &mut EventLog) {
        if amount.is_zero() {
            return;
        }
        self.total_penalty += amount;
        debug!(
            "{:?} penalty: P{} (total P{})",
            kind, amount, self.total_penalty
        );
        events.record(SimEvent::PenaltyApplied { kind, amount });
    }

    /// Per-second missed-stop rate.
    pub fn missed_stop_rate(&self) -> Pesos {
        self.penalties.missed_stop_per_second
    }

    /// Removes every trace of a passenger who left the carrier.
    pub fn forget(&mut self, passenger: PassengerId) {
        self.payment_queue.retain(|&queued| queued != passenger);
        if self.current_passenger == Some(passenger) {
            info!("{} left before receiving their change", passenger);
            self.current_passenger = None;
            self.cancel_staged_change();
        }
    }

    /// Paid/owed/staged figures for the passenger being settled.
    pub fn settlement_view(&self, roster: &Roster) -> Option<SettlementView> {
        let id = self.current_passenger?;
        let passenger = roster.get(id)?;
        Some(SettlementView {
            passenger: id,
            paid: passenger.fare_to_pay,
            owed: passenger.fare_owed,
            staged_change: self.staged_change,
            expected_change: passenger.expected_change,
        })
    }
}

impl Default for FareLedger {
    fn default() -> Self {
        FareLedger::new(SettlementMode::default(), PenaltySchedule::default())
    }
}
