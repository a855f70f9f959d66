//! # Planning state
//!
//! A [`PlanningState`] is one node of the planner's search space: the resource
//! map, every worker with its position and cargo, the running gold and wood
//! totals, and the action sequence that produced it along with its cost.
//!
//! States never share mutable data. Producing a successor clones the parent
//! (the map grids are copy-on-write) and mutates only the clone, so states
//! already sitting in the frontier or the closed set are never altered.
//!
//! Two states are equal when their totals and their workers' positions and
//! cargo match. How the state was reached does not matter, so the search does
//! not re-explore configurations reached through a different action order.
//!
//! ```
//! use harvest_rs::{Goal, NodeType, PlanningState, Position, ResourceNodeView, Snapshot, UnitRoles, UnitView};
//! use harvest_rs::PlanningRules;
//!
//! let snapshot = Snapshot::new(6, 6, 0)
//!     .with_unit(UnitView::new(1, 0, "TownHall", Position::new(0, 0)))
//!     .with_unit(UnitView::new(2, 0, "Peasant", Position::new(2, 2)))
//!     .with_resource(ResourceNodeView::new(9, NodeType::GoldMine, Position::new(3, 3), 300));
//! let goal = Goal::new(100, 0);
//!
//! let state = PlanningState::from_snapshot(&snapshot, &UnitRoles::default(), PlanningRules::new(goal)).unwrap();
//! assert!(!state.is_goal());
//! assert!(state.plan().is_empty());
//!
//! let harvested = state
//!     .generate_successors()
//!     .into_iter()
//!     .find(|s| s.workers()[0].carried() == 100)
//!     .unwrap();
//! assert_eq!(harvested.cost(), 1.0);
//! ```

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{PlanError, Result};
use crate::heuristic::{self, HeuristicWeights};
use crate::position::Position;
use crate::resource_map::{ResourceKind, ResourceMap, MAX_HARVEST};
use crate::snapshot::{Goal, Snapshot, UnitRoles};
use crate::worker::{Cargo, UnitId, Worker};

/// Bounds on the joint (multi-worker) actions considered during expansion.
///
/// Groups are enumerated over subsets of workers, so the number of candidate
/// groups grows combinatorially. Joint groups are only built when the worker
/// count is at most `max_workers_for_joint`, and never larger than
/// `max_group_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointActionLimits {
    pub max_workers_for_joint: usize,
    pub max_group_size: usize,
}

impl Default for JointActionLimits {
    fn default() -> Self {
        Self {
            max_workers_for_joint: 4,
            max_group_size: 3,
        }
    }
}

/// Immutable rules shared by every state of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningRules {
    pub goal: Goal,
    pub weights: HeuristicWeights,
    pub joint: JointActionLimits,
}

impl PlanningRules {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            weights: HeuristicWeights::default(),
            joint: JointActionLimits::default(),
        }
    }

    pub fn with_weights(mut self, weights: HeuristicWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_joint_limits(mut self, joint: JointActionLimits) -> Self {
        self.joint = joint;
        self
    }
}

/// The part of a state that decides equality, usable as a set or map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    gold: u32,
    wood: u32,
    workers: Vec<(UnitId, Position, Option<Cargo>)>,
}

#[derive(Debug, Clone)]
pub struct PlanningState {
    map: ResourceMap,
    /// Sorted by id.
    workers: Vec<Worker>,
    current_gold: u32,
    current_wood: u32,
    rules: Arc<PlanningRules>,
    cost: f64,
    heuristic: f64,
    plan: Vec<Action>,
}

impl PlanningState {
    /// Builds the initial state from a host snapshot.
    ///
    /// # Errors
    ///
    /// * [`PlanError::MissingDeposit`] if the player owns no deposit unit
    /// * [`PlanError::NoWorkers`] if the player owns no worker unit
    /// * [`PlanError::InvalidSnapshot`] for bad extents, off-map or overlapping
    ///   positions, duplicate ids, or cargo above capacity
    pub fn from_snapshot(snapshot: &Snapshot, roles: &UnitRoles, rules: PlanningRules) -> Result<Self> {
        let mut deposits = snapshot.own_units().filter(|u| roles.is_deposit(u));
        let deposit = deposits.next().ok_or(PlanError::MissingDeposit)?;
        if deposits.next().is_some() {
            log::warn!(
                "Snapshot has several '{}' units; depositing at unit {} only",
                roles.deposit,
                deposit.id
            );
        }

        let mut map = ResourceMap::new(snapshot.width, snapshot.height, deposit.position)?;
        for node in &snapshot.resources {
            map.add_resource(node.kind.resource_kind(), node.position, node.amount_remaining)?;
        }

        let mut workers = Vec::new();
        for unit in snapshot.own_units() {
            if roles.is_worker(unit) {
                let cargo = unit.cargo.and_then(|c| Cargo::new(c.kind, c.amount));
                workers.push(Worker::new(unit.id, unit.position).with_cargo(cargo));
            } else if unit.id != deposit.id {
                log::debug!("Ignoring unit {} ('{}')", unit.id, unit.template);
            }
        }
        if workers.is_empty() {
            return Err(PlanError::NoWorkers);
        }
        if rules.goal.build_workers {
            log::debug!("Worker production requested but not planned for");
        }

        Self::from_parts(map, workers, snapshot.gold, snapshot.wood, rules)
    }

    /// Builds a state from an already constructed map and worker list.
    pub fn from_parts(
        map: ResourceMap,
        mut workers: Vec<Worker>,
        current_gold: u32,
        current_wood: u32,
        rules: PlanningRules,
    ) -> Result<Self> {
        if workers.is_empty() {
            return Err(PlanError::NoWorkers);
        }
        workers.sort_by_key(|w| w.id);

        let mut seen = HashSet::new();
        for (i, worker) in workers.iter().enumerate() {
            if i > 0 && workers[i - 1].id == worker.id {
                return Err(PlanError::InvalidSnapshot(format!(
                    "duplicate worker id {}",
                    worker.id
                )));
            }
            if !map.in_bounds(worker.position) || map.is_blocked(worker.position) {
                return Err(PlanError::InvalidSnapshot(format!(
                    "worker {} stands on an unusable cell {}",
                    worker.id, worker.position
                )));
            }
            if !seen.insert(worker.position) {
                return Err(PlanError::InvalidSnapshot(format!(
                    "worker {} shares cell {} with another worker",
                    worker.id, worker.position
                )));
            }
            if worker.carried() > MAX_HARVEST {
                return Err(PlanError::InvalidSnapshot(format!(
                    "worker {} carries {} which exceeds capacity {}",
                    worker.id,
                    worker.carried(),
                    MAX_HARVEST
                )));
            }
        }

        let mut state = Self {
            map,
            workers,
            current_gold,
            current_wood,
            rules: Arc::new(rules),
            cost: 0.0,
            heuristic: 0.0,
            plan: Vec::new(),
        };
        state.heuristic = heuristic::estimate(&state);
        Ok(state)
    }

    pub fn map(&self) -> &ResourceMap {
        &self.map
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn worker(&self, id: UnitId) -> Option<&Worker> {
        self.workers
            .binary_search_by_key(&id, |w| w.id)
            .ok()
            .map(|idx| &self.workers[idx])
    }

    pub fn current_gold(&self) -> u32 {
        self.current_gold
    }

    pub fn current_wood(&self) -> u32 {
        self.current_wood
    }

    pub fn total(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Gold => self.current_gold,
            ResourceKind::Wood => self.current_wood,
        }
    }

    pub fn goal(&self) -> &Goal {
        &self.rules.goal
    }

    pub fn rules(&self) -> &PlanningRules {
        &self.rules
    }

    /// Cumulative cost of the actions that produced this state.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Cached remaining-cost estimate, see [`crate::heuristic`].
    pub fn heuristic(&self) -> f64 {
        self.heuristic
    }

    pub fn plan(&self) -> &[Action] {
        &self.plan
    }

    pub fn into_plan(self) -> Vec<Action> {
        self.plan
    }

    pub fn is_goal(&self) -> bool {
        self.current_gold >= self.rules.goal.gold && self.current_wood >= self.rules.goal.wood
    }

    /// How much of `kind` is still missing from the totals.
    pub fn deficit(&self, kind: ResourceKind) -> u32 {
        self.rules.goal.required(kind).saturating_sub(self.total(kind))
    }

    /// The deficit of `kind` not already covered by cargo on the way.
    pub fn outstanding(&self, kind: ResourceKind) -> u32 {
        let in_flight: u32 = self.workers.iter().map(|w| w.carried_of(kind)).sum();
        self.deficit(kind).saturating_sub(in_flight)
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.workers.iter().any(|w| w.position == pos)
    }

    /// A worker could stand on `pos`.
    pub fn is_free(&self, pos: Position) -> bool {
        self.map.in_bounds(pos) && !self.map.is_blocked(pos) && !self.is_occupied(pos)
    }

    pub fn key(&self) -> StateKey {
        StateKey {
            gold: self.current_gold,
            wood: self.current_wood,
            workers: self
                .workers
                .iter()
                .map(|w| (w.id, w.position, w.cargo))
                .collect(),
        }
    }

    pub(crate) fn worker_mut(&mut self, id: UnitId) -> Option<&mut Worker> {
        let idx = self.workers.binary_search_by_key(&id, |w| w.id).ok()?;
        Some(&mut self.workers[idx])
    }

    pub(crate) fn map_mut(&mut self) -> &mut ResourceMap {
        &mut self.map
    }

    pub(crate) fn credit(&mut self, cargo: Cargo) {
        match cargo.kind {
            ResourceKind::Gold => self.current_gold = self.current_gold.saturating_add(cargo.amount),
            ResourceKind::Wood => self.current_wood = self.current_wood.saturating_add(cargo.amount),
        }
    }

    /// Appends `action` to the plan, charges its cost and refreshes the estimate.
    pub(crate) fn record(&mut self, action: Action) {
        self.cost += action.cost();
        self.plan.push(action);
        self.heuristic = heuristic::estimate(self);
    }

    /// Worker groups eligible to act together, as indices into `workers`.
    ///
    /// Singletons always qualify. Larger groups are listed in ascending bitmask
    /// order when joint actions are enabled for this worker count.
    fn worker_groups(&self) -> Vec<Vec<usize>> {
        let n = self.workers.len();
        let limits = self.rules.joint;
        let joint = n >= 2 && n <= limits.max_workers_for_joint.min(16);
        if !joint {
            return (0..n).map(|i| vec![i]).collect();
        }

        let max_size = limits.max_group_size.max(1);
        (1u32..(1u32 << n))
            .filter(|mask| mask.count_ones() as usize <= max_size)
            .map(|mask| (0..n).filter(|i| mask & (1 << i) != 0).collect())
            .collect()
    }

    /// Every operator instance whose preconditions hold in this state, in a
    /// fixed order.
    pub fn applicable_actions(&self) -> Vec<Action> {
        let mut candidates = Vec::new();
        let deposit = self.map.deposit();
        let wanted: Vec<(ResourceKind, u32)> = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.outstanding(kind)))
            .filter(|(_, need)| *need > 0)
            .collect();

        for group in self.worker_groups() {
            let members: Vec<&Worker> = group.iter().map(|&i| &self.workers[i]).collect();
            if members.iter().all(|w| w.is_empty()) {
                for &(kind, need) in &wanted {
                    if let Some(target) = self.map.best_resource(kind, members[0].position, need) {
                        candidates.extend(Action::move_group(self, &members, target));
                    }
                }
            } else if members.iter().all(|w| !w.is_empty()) {
                if members.iter().all(|w| w.is_adjacent_to(deposit)) {
                    candidates.push(Action::deposit(&members, deposit));
                } else {
                    candidates.extend(Action::move_group(self, &members, deposit));
                }
            }
        }

        for worker in self.workers.iter().filter(|w| w.is_empty()) {
            for &(kind, _) in &wanted {
                if let Some(cell) = self.map.richest_adjacent(kind, worker.position) {
                    candidates.push(Action::harvest(worker, kind, cell));
                }
            }
        }

        candidates.retain(|action| action.is_applicable(self));
        candidates
    }

    /// Applies every applicable action to a fresh copy of this state.
    pub fn generate_successors(&self) -> Vec<PlanningState> {
        self.applicable_actions()
            .into_iter()
            .map(|action| action.apply_unchecked(self))
            .collect()
    }
}

impl PartialEq for PlanningState {
    fn eq(&self, other: &Self) -> bool {
        self.current_gold == other.current_gold
            && self.current_wood == other.current_wood
            && self.workers.len() == other.workers.len()
            && self
                .workers
                .iter()
                .zip(&other.workers)
                .all(|(a, b)| a.id == b.id && a.position == b.position && a.cargo == b.cargo)
    }
}

impl Eq for PlanningState {}

impl Hash for PlanningState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
