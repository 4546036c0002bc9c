//! # Jeepney Fares
//!
//! The passenger transit and fare economy engine of a jeepney-driving game:
//! passengers board, pay after a short wait, get their change, and alight
//! once the jeepney pulls over at their stop.
//!
//! ## Design Principles
//!
//! - **Tick-driven**: one logical thread; payment timers and drop-off scans
//!   are polled from [`Session::tick`], nothing ever blocks
//! - **Single owner**: the carrier's [`Roster`] owns passengers, the ledger
//!   only refers to them by [`PassengerId`]
//! - **Validate, then mutate**: a failed operation leaves queue, roster and
//!   balance exactly as they were; `balance >= 0` always holds
//! - **Reproducible**: sessions draw from a seeded `ChaCha8Rng`
//!
//! ## Example
//!
//! ```
//! use jeepney_fares::{Session, SimConfig, VehicleState};
//!
//! let mut session = Session::new(SimConfig::default()).unwrap();
//! let passenger = session.board().unwrap();
//!
//! // payment timers fire within five seconds
//! session.tick(VehicleState::new(0.0, 10.0, 4.0), 5.0);
//! let paid = session.accept_payment().unwrap();
//!
//! assert_eq!(session.ledger().balance(), paid);
//! assert!(session.carrier().roster().contains(passenger));
//! ```

pub mod config;
pub mod decimal;
pub mod denomination;
pub mod error;
pub mod event;
pub mod factory;
pub mod ledger;
pub mod passenger;
pub mod scheduler;
pub mod script;
pub mod seating;
pub mod session;

pub use config::{PenaltySchedule, SettlementMode, SimConfig};
pub use decimal::Pesos;
pub use denomination::{is_denomination, round_to_bill, round_to_coins, COINS, DENOMINATIONS};
pub use error::{ConfigError, FareError, Result, SimError};
pub use event::{EventLog, SimEvent, TimedEvent};
pub use factory::{biased_random, PassengerFactory};
pub use ledger::{FareLedger, PenaltyKind, SettlementView};
pub use passenger::{Passenger, PassengerId, PassengerState, Roster};
pub use scheduler::{CarrierScheduler, VehicleState};
pub use script::{DriverAction, ScriptRecord, ScriptStep};
pub use seating::{EntityHandle, Position, RecordingSpawner, SeatRegistry, SeatRow, Spawner};
pub use session::{Session, SessionSummary, DEFAULT_SEED};
