//! Primitive host commands a plan expands into.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{PlanError, Result};
use crate::position::{Direction, Position};
use crate::worker::UnitId;

/// One order for one unit, in the form the host engine executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Path to `(x, y)` over as many turns as it takes.
    CompoundMove { unit: UnitId, x: i32, y: i32 },
    /// Harvest from the adjacent cell in `direction`.
    Gather { unit: UnitId, direction: Direction },
    /// Hand cargo to the adjacent deposit in `direction`.
    Deposit { unit: UnitId, direction: Direction },
}

impl Command {
    pub fn unit(&self) -> UnitId {
        match *self {
            Command::CompoundMove { unit, .. }
            | Command::Gather { unit, .. }
            | Command::Deposit { unit, .. } => unit,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CompoundMove { unit, x, y } => write!(f, "unit {} move to ({},{})", unit, x, y),
            Command::Gather { unit, direction } => write!(f, "unit {} gather {:?}", unit, direction),
            Command::Deposit { unit, direction } => write!(f, "unit {} deposit {:?}", unit, direction),
        }
    }
}

impl Action {
    /// One command per participating worker, in the order the action lists them.
    ///
    /// # Errors
    ///
    /// [`PlanError::PreconditionNotMet`] when a harvest or deposit acts from a
    /// cell that is not adjacent to its target. Actions that passed their
    /// precondition check never fail here.
    pub fn commands(&self) -> Result<Vec<Command>> {
        match self {
            Action::Move { steps, .. } => Ok(steps
                .iter()
                .map(|step| Command::CompoundMove {
                    unit: step.worker,
                    x: step.to.x,
                    y: step.to.y,
                })
                .collect()),
            Action::Harvest {
                worker,
                at,
                resource,
                ..
            } => Ok(vec![Command::Gather {
                unit: *worker,
                direction: toward(self, *at, *resource)?,
            }]),
            Action::Deposit { workers, deposit } => workers
                .iter()
                .map(|stance| {
                    Ok(Command::Deposit {
                        unit: stance.worker,
                        direction: toward(self, stance.at, *deposit)?,
                    })
                })
                .collect(),
        }
    }
}

fn toward(action: &Action, from: Position, to: Position) -> Result<Direction> {
    from.direction_to(to).ok_or_else(|| {
        PlanError::PreconditionNotMet(format!("{}: {} is not adjacent to {}", action, from, to))
    })
}
