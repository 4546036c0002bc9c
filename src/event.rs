//! Events the engine reports to its consumers (UI, audio, analytics).

use crate::decimal::Pesos;
use crate::error::{FareError, Result};
use crate::ledger::PenaltyKind;
use crate::passenger::PassengerId;
use crate::seating::Position;
use serde::Serialize;
use std::io::Write;

/// Something observable that happened inside the fare engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    PassengerBoarded {
        passenger: PassengerId,
    },
    /// Boarding refused; the passenger was put straight back out.
    PassengerRejected {
        passenger: PassengerId,
        reason: FareError,
    },
    PaymentQueued {
        passenger: PassengerId,
    },
    PaymentAccepted {
        passenger: PassengerId,
        balance_delta: i64,
    },
    ChangeGiven {
        passenger: PassengerId,
        amount: i64,
    },
    PassengerDropped {
        passenger: PassengerId,
        position: Position,
    },
    PenaltyApplied {
        kind: PenaltyKind,
        amount: Pesos,
    },
}

impl SimEvent {
    /// Short snake_case name used in CSV output.
    pub fn name(&self) -> &'static str {
        match self {
            SimEvent::PassengerBoarded { .. } => "passenger_boarded",
            SimEvent::PassengerRejected { .. } => "passenger_rejected",
            SimEvent::PaymentQueued { .. } => "payment_queued",
            SimEvent::PaymentAccepted { .. } => "payment_accepted",
            SimEvent::ChangeGiven { .. } => "change_given",
            SimEvent::PassengerDropped { .. } => "passenger_dropped",
            SimEvent::PenaltyApplied { kind, .. } => kind.event_name(),
        }
    }

    /// The passenger involved, if any.
    pub fn passenger(&self) -> Option<PassengerId> {
        match self {
            SimEvent::PassengerBoarded { passenger }
            | SimEvent::PassengerRejected { passenger, .. }
            | SimEvent::PaymentQueued { passenger }
            | SimEvent::PaymentAccepted { passenger, .. }
            | SimEvent::ChangeGiven { passenger, .. }
            | SimEvent::PassengerDropped { passenger, .. } => Some(*passenger),
            SimEvent::PenaltyApplied { .. } => None,
        }
    }
}

/// An event stamped with the session clock.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub time: f64,
    pub event: SimEvent,
}

/// Flat CSV row for a [`TimedEvent`].
#[derive(Debug, Serialize)]
struct EventRecord {
    time: String,
    event: &'static str,
    passenger: Option<u64>,
    amount: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
}

impl From<&TimedEvent> for EventRecord {
    fn from(timed: &TimedEvent) -> Self {
        let (amount, position) = match &timed.event {
            SimEvent::PaymentAccepted { balance_delta, .. } => (Some(balance_delta.to_string()), None),
            SimEvent::ChangeGiven { amount, .. } => (Some(amount.to_string()), None),
            SimEvent::PenaltyApplied { amount, .. } => (Some(amount.to_string()), None),
            SimEvent::PassengerDropped { position, .. } => (None, Some(*position)),
            SimEvent::PassengerRejected { reason, .. } => (Some(reason.to_string()), None),
            _ => (None, None),
        };

        EventRecord {
            time: format!("{:.3}", timed.time),
            event: timed.event.name(),
            passenger: timed.event.passenger().map(|id| id.0),
            amount,
            x: position.map(|p| p.x),
            y: position.map(|p| p.y),
        }
    }
}

/// Append-only event buffer, stamped with the time of the current tick.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    now: f64,
    events: Vec<TimedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_time(&mut self, now: f64) {
        self.now = now;
    }

    pub fn record(&mut self, event: SimEvent) {
        self.events.push(TimedEvent {
            time: self.now,
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter()
    }

    /// Hands over everything recorded so far.
    pub fn drain(&mut self) -> Vec<TimedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Writes every event as CSV: `time,event,passenger,amount,x,y`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for timed in &self.events {
            csv_writer.serialize(EventRecord::from(timed))?;
        }
        if self.events.is_empty() {
            csv_writer.write_record(["time", "event", "passenger", "amount", "x", "y"])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_stamped_with_current_time() {
        let mut log = EventLog::new();
        log.set_time(1.5);
        log.record(SimEvent::PassengerBoarded {
            passenger: PassengerId(1),
        });
        log.set_time(2.0);
        log.record(SimEvent::PaymentQueued {
            passenger: PassengerId(1),
        });

        let times: Vec<f64> = log.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1.5, 2.0]);
    }

    #[test]
    fn test_drain_empties_log() {
        let mut log = EventLog::new();
        log.record(SimEvent::PassengerBoarded {
            passenger: PassengerId(1),
        });
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_csv_output_format() {
        let mut log = EventLog::new();
        log.set_time(4.0);
        log.record(SimEvent::PaymentAccepted {
            passenger: PassengerId(2),
            balance_delta: 36,
        });
        log.record(SimEvent::PassengerDropped {
            passenger: PassengerId(2),
            position: Position::new(-3.0, 120.5),
        });
        log.record(SimEvent::PenaltyApplied {
            kind: PenaltyKind::Collision,
            amount: Pesos::from_whole(100),
        });

        let mut output = Vec::new();
        log.write_csv(&mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.starts_with("time,event,passenger,amount,x,y"));
        assert!(output.contains("4.000,payment_accepted,2,36,,"));
        assert!(output.contains("4.000,passenger_dropped,2,,-3.0,120.5"));
        assert!(output.contains("4.000,collision_penalty,,100.00,,"));
    }

    #[test]
    fn test_empty_log_still_writes_header() {
        let mut output = Vec::new();
        EventLog::new().write_csv(&mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap().trim(), "time,event,passenger,amount,x,y");
    }
}
