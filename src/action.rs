//! # STRIPS operators
//!
//! The planner knows three operators, each a variant of [`Action`] that
//! carries exactly the fields it needs:
//!
//! * [`Action::Move`]: one or more workers walk to free cells next to a
//!   resource or the deposit. Costs the longest Chebyshev distance walked,
//!   since the workers move at the same time.
//! * [`Action::Harvest`]: an empty worker takes up to one load from an
//!   adjacent resource cell. Costs 1.
//! * [`Action::Deposit`]: one or more loaded workers next to the deposit hand
//!   their cargo in. Costs 1.
//!
//! Every operator exposes a precondition check ([`Action::is_applicable`]) and
//! an effect ([`Action::apply`]) that produces a new state and leaves the input
//! state untouched.
//!
//! ```
//! use harvest_rs::{Action, Goal, PlanningRules, PlanningState, Position, ResourceKind, ResourceMap, Worker};
//!
//! let mut map = ResourceMap::new(8, 8, Position::new(0, 0)).unwrap();
//! map.add_resource(ResourceKind::Wood, Position::new(4, 4), 250).unwrap();
//! let worker = Worker::new(1, Position::new(3, 3));
//! let state = PlanningState::from_parts(map, vec![worker.clone()], 0, 0, PlanningRules::new(Goal::new(0, 100))).unwrap();
//!
//! let chop = Action::harvest(&worker, ResourceKind::Wood, Position::new(4, 4));
//! assert!(chop.is_applicable(&state));
//!
//! let next = chop.apply(&state).unwrap();
//! assert_eq!(next.worker(1).unwrap().carried(), 100);
//! assert_eq!(next.map().amount_at(ResourceKind::Wood, Position::new(4, 4)), 150);
//! assert_eq!(state.map().amount_at(ResourceKind::Wood, Position::new(4, 4)), 250);
//!
//! // A loaded worker cannot harvest again.
//! assert!(!chop.is_applicable(&next));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::position::Position;
use crate::resource_map::{ResourceKind, MAX_HARVEST};
use crate::state::PlanningState;
use crate::worker::{Cargo, UnitId, Worker};

/// One worker's leg of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveStep {
    pub worker: UnitId,
    pub from: Position,
    pub to: Position,
}

/// A worker and the cell it acts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stance {
    pub worker: UnitId,
    pub at: Position,
}

/// A grounded operator instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move {
        steps: Vec<MoveStep>,
        /// The resource or deposit cell the workers end up next to.
        target: Position,
    },
    Harvest {
        worker: UnitId,
        at: Position,
        kind: ResourceKind,
        resource: Position,
    },
    Deposit {
        workers: Vec<Stance>,
        deposit: Position,
    },
}

impl Action {
    pub fn harvest(worker: &Worker, kind: ResourceKind, resource: Position) -> Self {
        Action::Harvest {
            worker: worker.id,
            at: worker.position,
            kind,
            resource,
        }
    }

    pub fn deposit(workers: &[&Worker], deposit: Position) -> Self {
        Action::Deposit {
            workers: workers
                .iter()
                .map(|w| Stance {
                    worker: w.id,
                    at: w.position,
                })
                .collect(),
            deposit,
        }
    }

    /// Sends `members` next to `target`, each to the nearest free cell around
    /// it not already claimed by an earlier member. `None` when the target has
    /// too few free cells.
    pub fn move_group(state: &PlanningState, members: &[&Worker], target: Position) -> Option<Self> {
        let mut steps: Vec<MoveStep> = Vec::with_capacity(members.len());
        for worker in members {
            let cell = target
                .neighbors()
                .filter(|c| state.is_free(*c) && steps.iter().all(|s| s.to != *c))
                .min_by_key(|c| worker.position.chebyshev_distance(*c))?;
            steps.push(MoveStep {
                worker: worker.id,
                from: worker.position,
                to: cell,
            });
        }
        Some(Action::Move { steps, target })
    }

    /// Cost charged to the state this action produces.
    pub fn cost(&self) -> f64 {
        match self {
            Action::Move { steps, .. } => steps
                .iter()
                .map(|s| s.from.chebyshev_distance(s.to))
                .max()
                .map_or(0.0, f64::from),
            Action::Harvest { .. } | Action::Deposit { .. } => 1.0,
        }
    }

    /// Ids of the workers taking part.
    pub fn workers(&self) -> Vec<UnitId> {
        match self {
            Action::Move { steps, .. } => steps.iter().map(|s| s.worker).collect(),
            Action::Harvest { worker, .. } => vec![*worker],
            Action::Deposit { workers, .. } => workers.iter().map(|s| s.worker).collect(),
        }
    }

    pub fn is_joint(&self) -> bool {
        self.workers().len() > 1
    }

    pub fn is_applicable(&self, state: &PlanningState) -> bool {
        self.check(state).is_ok()
    }

    /// Applies this action to a copy of `state`.
    ///
    /// # Errors
    ///
    /// [`PlanError::PreconditionNotMet`] naming the first failed precondition.
    pub fn apply(&self, state: &PlanningState) -> Result<PlanningState> {
        self.check(state)
            .map_err(|reason| PlanError::PreconditionNotMet(format!("{}: {}", self, reason)))?;
        Ok(self.apply_unchecked(state))
    }

    pub(crate) fn apply_unchecked(&self, state: &PlanningState) -> PlanningState {
        let mut next = state.clone();
        match self {
            Action::Move { steps, target } => {
                for step in steps {
                    if let Some(worker) = next.worker_mut(step.worker) {
                        worker.position = step.to;
                        worker.target = Some(*target);
                    }
                }
            }
            Action::Harvest {
                worker,
                kind,
                resource,
                ..
            } => {
                let taken = next.map_mut().harvest(*kind, *resource, MAX_HARVEST);
                if let Some(worker) = next.worker_mut(*worker) {
                    worker.cargo = Cargo::new(*kind, taken);
                    worker.target = Some(*resource);
                }
            }
            Action::Deposit { workers, .. } => {
                for stance in workers {
                    let cargo = next.worker_mut(stance.worker).and_then(Worker::unload);
                    if let Some(cargo) = cargo {
                        next.credit(cargo);
                    }
                }
            }
        }
        next.record(self.clone());
        next
    }

    fn check(&self, state: &PlanningState) -> std::result::Result<(), String> {
        match self {
            Action::Move { steps, target } => check_move(state, steps, *target),
            Action::Harvest {
                worker,
                at,
                kind,
                resource,
            } => {
                let unit = standing_worker(state, *worker, *at)?;
                if !unit.is_empty() {
                    return Err(format!("worker {} is already carrying cargo", worker));
                }
                if !at.is_adjacent(*resource) {
                    return Err(format!("{} is not next to {}", at, resource));
                }
                if state.map().amount_at(*kind, *resource) == 0 {
                    return Err(format!("no {:?} left at {}", kind, resource));
                }
                Ok(())
            }
            Action::Deposit { workers, deposit } => {
                if workers.is_empty() {
                    return Err("no workers to deposit".to_string());
                }
                if *deposit != state.map().deposit() {
                    return Err(format!("{} is not the deposit", deposit));
                }
                for (i, stance) in workers.iter().enumerate() {
                    if workers[..i].iter().any(|s| s.worker == stance.worker) {
                        return Err(format!("worker {} listed twice", stance.worker));
                    }
                    let unit = standing_worker(state, stance.worker, stance.at)?;
                    if unit.is_empty() {
                        return Err(format!("worker {} has nothing to deposit", stance.worker));
                    }
                    if !stance.at.is_adjacent(*deposit) {
                        return Err(format!("{} is not next to the deposit", stance.at));
                    }
                }
                Ok(())
            }
        }
    }
}

fn standing_worker(state: &PlanningState, id: UnitId, at: Position) -> std::result::Result<&Worker, String> {
    let worker = state
        .worker(id)
        .ok_or_else(|| format!("unknown worker {}", id))?;
    if worker.position != at {
        return Err(format!("worker {} is at {}, not {}", id, worker.position, at));
    }
    Ok(worker)
}

fn check_move(state: &PlanningState, steps: &[MoveStep], target: Position) -> std::result::Result<(), String> {
    if steps.is_empty() {
        return Err("no workers to move".to_string());
    }
    let map = state.map();
    let resource = if target == map.deposit() {
        None
    } else {
        Some(
            map.kind_at(target)
                .ok_or_else(|| format!("nothing left at {}", target))?,
        )
    };

    for (i, step) in steps.iter().enumerate() {
        let worker = standing_worker(state, step.worker, step.from)?;
        if steps[..i].iter().any(|s| s.worker == step.worker) {
            return Err(format!("worker {} listed twice", step.worker));
        }
        match resource {
            None if worker.is_empty() => {
                return Err(format!("worker {} has nothing to deposit", step.worker))
            }
            Some(_) if !worker.is_empty() => {
                return Err(format!("worker {} is already carrying cargo", step.worker))
            }
            _ => {}
        }
        if worker.is_adjacent_to(target) {
            return Err(format!("worker {} is already next to {}", step.worker, target));
        }
        if !step.to.is_adjacent(target) {
            return Err(format!("{} is not next to {}", step.to, target));
        }
        if !state.is_free(step.to) {
            return Err(format!("{} is blocked or occupied", step.to));
        }
        if steps[..i].iter().any(|s| s.to == step.to) {
            return Err(format!("{} is assigned to two workers", step.to));
        }
    }

    if let Some(kind) = resource {
        let movers = steps.len() as u32;
        if movers > 1 {
            let loads = |amount: u32| amount.div_ceil(MAX_HARVEST);
            if loads(map.amount_at(kind, target)) < movers {
                return Err(format!("{} cannot fill {} loads", target, movers));
            }
            if loads(state.outstanding(kind)) < movers {
                return Err(format!("{:?} demand does not need {} workers", kind, movers));
            }
        }
    }
    Ok(())
}

/// STRIPS-style rendering, e.g. `Harvest(1, Gold, (5,6))`.
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { steps, .. } => {
                write!(f, "Move(")?;
                for (i, step) in steps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}->{}", step.worker, step.from, step.to)?;
                }
                write!(f, ")")
            }
            Action::Harvest {
                worker,
                kind,
                resource,
                ..
            } => write!(f, "Harvest({}, {:?}, {})", worker, kind, resource),
            Action::Deposit { workers, deposit } => {
                let ids: Vec<String> = workers.iter().map(|s| s.worker.to_string()).collect();
                write!(f, "Deposit({} @ {})", ids.join(","), deposit)
            }
        }
    }
}
