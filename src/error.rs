//! Error types for the fare economy engine.

use crate::passenger::PassengerId;
use thiserror::Error;

/// Result type alias for session and CLI operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Locally recoverable failures of ledger and carrier operations.
///
/// None of these are fatal to the tick loop. Every operation that returns one
/// validates before mutating, so the ledger and the boarded roster are left
/// exactly as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FareError {
    /// The passenger to queue is not (or no longer) aboard
    #[error("no passenger to queue for payment")]
    NullPassenger,

    /// `accept_payment` called with nobody waiting to pay
    #[error("no passengers in queue to accept payment from")]
    EmptyQueue,

    /// Staged cash value outside the denomination set
    #[error("invalid cash value: {0}, must be one of the denominations")]
    InvalidDenomination(i64),

    /// Another passenger is still waiting for change
    #[error("{0} is still waiting for change")]
    SettlementInProgress(PassengerId),

    /// No passenger is currently being settled
    #[error("no passenger is currently being settled")]
    NoCurrentPassenger,

    /// The current passenger is not owed any change
    #[error("current passenger expects no change")]
    NothingExpected,

    /// `give_change` called with nothing staged
    #[error("no change staged")]
    NothingStaged,

    /// Negative values cannot be broken into coins
    #[error("cannot round negative value {0} to coins")]
    NegativeValue(i64),

    /// No denomination is small enough for the value
    #[error("no suitable denomination for value {0}")]
    NoSuitableDenomination(i64),

    /// The carrier is full
    #[error("carrier is over capacity")]
    OverCapacity,

    /// The seat registry refused or already holds the passenger
    #[error("no seat available for passenger")]
    SeatUnavailable,

    /// A required collaborator was not provided
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Invalid session configuration, reported once at construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A `[min, max]` pair where `min > max`
    #[error("invalid bounds for {name}: min {min} > max {max}")]
    InvalidBounds {
        name: &'static str,
        min: f64,
        max: f64,
    },

    /// A single out-of-range setting
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Errors surfaced by the drive-script CLI.
#[derive(Error, Debug)]
pub enum SimError {
    /// Failed to open or read the script file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Session configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Missing script file argument
    #[error("Missing script file argument. Usage: jeepney-fares <script.csv> [seed]")]
    MissingArgument,

    /// Seed argument is not an unsigned integer
    #[error("Invalid seed '{0}': expected an unsigned integer")]
    InvalidSeed(String),
}
