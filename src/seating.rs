//! Collaborators the carrier consumes but does not own: the seat registry
//! and the world spawner that takes over ejected passengers.

use crate::passenger::PassengerId;
use log::{debug, warn};

/// A point in world space. Y runs along the road, X across it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// Handle to a world entity created by a [`Spawner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// Maps passengers to physical seats.
///
/// Seat identity is whatever the registry decides; the carrier only asks
/// whether a seat could be granted.
pub trait SeatRegistry {
    /// Seats the passenger. Returns `false` if no seat is free.
    fn assign_to_seat(&mut self, passenger: PassengerId) -> bool;

    /// Frees the passenger's seat, if any.
    fn clear_seat(&mut self, passenger: PassengerId);

    /// Whether the passenger already holds a seat.
    fn is_occupied(&self, passenger: PassengerId) -> bool;
}

/// Creates the in-world entity for a passenger leaving the carrier.
pub trait Spawner {
    fn spawn_at(&mut self, position: Position) -> EntityHandle;
}

/// A fixed row of seats filled front to back.
#[derive(Debug, Clone)]
pub struct SeatRow {
    seats: Vec<Option<PassengerId>>,
}

impl SeatRow {
    /// Seat count of the stock jeepney rear bench.
    pub const DEFAULT_SEATS: usize = 6;

    pub fn new(seat_count: usize) -> Self {
        SeatRow {
            seats: vec![None; seat_count],
        }
    }

    /// Number of seats in the row.
    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    /// Number of seats currently taken.
    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|seat| seat.is_some()).count()
    }

    /// Index of the seat held by `passenger`.
    pub fn seat_of(&self, passenger: PassengerId) -> Option<usize> {
        self.seats.iter().position(|seat| *seat == Some(passenger))
    }
}

impl Default for SeatRow {
    fn default() -> Self {
        SeatRow::new(Self::DEFAULT_SEATS)
    }
}

impl SeatRegistry for SeatRow {
    fn assign_to_seat(&mut self, passenger: PassengerId) -> bool {
        if self.is_occupied(passenger) {
            warn!("{} already holds a seat", passenger);
            return false;
        }

        match self.seats.iter_mut().enumerate().find(|(_, s)| s.is_none()) {
            Some((index, seat)) => {
                *seat = Some(passenger);
                debug!("{} seated at seat {}", passenger, index + 1);
                true
            }
            None => {
                debug!("No free seat for {}", passenger);
                false
            }
        }
    }

    fn clear_seat(&mut self, passenger: PassengerId) {
        match self.seat_of(passenger) {
            Some(index) => {
                self.seats[index] = None;
                debug!("Cleared seat {} for {}", index + 1, passenger);
            }
            None => warn!("No seat found to clear for {}", passenger),
        }
    }

    fn is_occupied(&self, passenger: PassengerId) -> bool {
        self.seat_of(passenger).is_some()
    }
}

/// Spawner that remembers every position it was asked to populate.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpawner {
    spawned: Vec<(EntityHandle, Position)>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entity spawned so far, oldest first.
    pub fn spawned(&self) -> &[(EntityHandle, Position)] {
        &self.spawned
    }
}

impl Spawner for RecordingSpawner {
    fn spawn_at(&mut self, position: Position) -> EntityHandle {
        let handle = EntityHandle(self.spawned.len() as u64 + 1);
        self.spawned.push((handle, position));
        handle
    }
}
