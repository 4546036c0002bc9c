//! Drive scripts: CSV rows of vehicle state plus an optional driver action.
//!
//! ```text
//! dt,x,y,speed,action,value
//! 0.0,0.0,0.0,0.0,board,
//! 1.0,0.0,5.0,5.0,,
//! 0.5,0.0,7.5,5.0,stage,20
//! ```
//!
//! Each row advances the session by `dt` seconds with the vehicle at
//! `(x, y)` moving at `speed`, then applies the action.

use crate::error::Result;
use crate::ledger::PenaltyKind;
use crate::scheduler::VehicleState;
use crate::seating::{SeatRegistry, Spawner};
use crate::session::Session;
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::Deserialize;
use std::io::{Read, Write};

/// Raw script row as read from CSV.
#[derive(Debug, Deserialize)]
pub struct ScriptRecord {
    /// Seconds elapsed since the previous row
    pub dt: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,

    /// Driver action, empty for a plain tick
    #[serde(default)]
    pub action: Option<String>,

    /// Amount for `stage` / `unstage`
    #[serde(default)]
    pub value: Option<String>,
}

/// Something the driver does between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverAction {
    /// Pick up a passenger at the current spot.
    Board,
    /// Take the fare from the next passenger in line.
    Accept,
    /// Set a coin or bill aside as change.
    Stage(i64),
    /// Take a staged coin or bill back.
    Unstage(i64),
    /// Hand the staged change over.
    Give,
    /// Put all staged change back.
    Cancel,
    /// Externally detected infraction.
    Penalty(PenaltyKind),
}

/// A parsed script row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub elapsed: f64,
    pub vehicle: VehicleState,
    pub action: Option<DriverAction>,
}

impl ScriptRecord {
    /// Parses the raw row into a typed step.
    ///
    /// Returns `None` for an unknown action or a missing/invalid amount.
    pub fn parse(&self) -> Option<ScriptStep> {
        let action = match self.action.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(self.parse_action(&name.to_lowercase())?),
        };

        Some(ScriptStep {
            elapsed: self.dt,
            vehicle: VehicleState::new(self.x, self.y, self.speed),
            action,
        })
    }

    fn parse_action(&self, name: &str) -> Option<DriverAction> {
        match name {
            "board" => Some(DriverAction::Board),
            "accept" => Some(DriverAction::Accept),
            "stage" => Some(DriverAction::Stage(self.parse_value()?)),
            "unstage" => Some(DriverAction::Unstage(self.parse_value()?)),
            "give" => Some(DriverAction::Give),
            "cancel" => Some(DriverAction::Cancel),
            "collision" => Some(DriverAction::Penalty(PenaltyKind::Collision)),
            "nopay" => Some(DriverAction::Penalty(PenaltyKind::NoPay)),
            "slowchange" => Some(DriverAction::Penalty(PenaltyKind::SlowChange)),
            _ => None,
        }
    }

    fn parse_value(&self) -> Option<i64> {
        let trimmed = self.value.as_ref()?.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse().ok()
    }
}

impl<S: SeatRegistry, W: Spawner> Session<S, W> {
    /// Runs a drive script from a CSV reader, row by row.
    ///
    /// Invalid rows and failing actions are logged at warn level and skipped.
    pub fn process_script<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<ScriptRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse() {
                    Some(step) => self.apply_step(step, row_num),
                    None => warn!("Row {}: Failed to parse script record", row_num),
                },
                Err(e) => warn!("Row {}: CSV parse error: {}", row_num, e),
            }
        }

        Ok(())
    }

    fn apply_step(&mut self, step: ScriptStep, row: usize) {
        let dropped = self.tick(step.vehicle, step.elapsed);
        if !dropped.is_empty() {
            debug!("Row {}: dropped off {:?}", row, dropped);
        }

        let Some(action) = step.action else {
            return;
        };

        let outcome = match action {
            DriverAction::Board => {
                if self.board().is_none() {
                    debug!("Row {}: passenger refused", row);
                }
                Ok(())
            }
            DriverAction::Accept => self.accept_payment().map(drop),
            DriverAction::Stage(amount) => self.stage_change(amount),
            DriverAction::Unstage(amount) => {
                self.unstage_change(amount);
                Ok(())
            }
            DriverAction::Give => self.give_change().map(drop),
            DriverAction::Cancel => {
                self.cancel_staged_change();
                Ok(())
            }
            DriverAction::Penalty(kind) => {
                self.penalize(kind);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            warn!("Row {}: {:?} failed: {}", row, action, e);
        }
    }

    /// Writes the recorded events as CSV.
    pub fn write_output<W2: Write>(&self, writer: W2) -> Result<()> {
        self.events().write_csv(writer)
    }
}
