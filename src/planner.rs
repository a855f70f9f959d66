//! # Planner for resource-gathering workers
//!
//! The planner is the entry point of the crate, responsible for:
//! - Turning a host [`Snapshot`] and a [`Goal`] into an initial planning state
//! - Running a search algorithm (A* by default) over the operator model
//! - Packaging the result as a [`Plan`] that can be expanded into host commands
//!
//! ## Overview
//!
//! Planning is forward state-space search:
//! 1. Start from the snapshot: workers, their cargo, resource cells, the deposit
//! 2. Define the gold and wood totals to reach
//! 3. Expand states with the Move, Harvest and Deposit operators
//! 4. Return the cheapest-looking action sequence that reaches both totals
//!
//! ## Basic Usage
//!
//! ```
//! use harvest_rs::{Goal, NodeType, Planner, Position, ResourceNodeView, Snapshot, UnitView};
//!
//! // Step 1: Describe the world
//! let snapshot = Snapshot::new(8, 8, 0)
//!     .with_unit(UnitView::new(1, 0, "TownHall", Position::new(0, 0)))
//!     .with_unit(UnitView::new(2, 0, "Peasant", Position::new(2, 2)))
//!     .with_resource(ResourceNodeView::new(10, NodeType::GoldMine, Position::new(5, 5), 500))
//!     .with_resource(ResourceNodeView::new(11, NodeType::Tree, Position::new(1, 5), 300));
//!
//! // Step 2: Decide what to collect
//! let goal = Goal::new(100, 100);
//!
//! // Step 3: Plan with the default configuration
//! let planner = Planner::default();
//! let plan = planner.plan(&snapshot, &goal).unwrap();
//!
//! assert!(plan.gold >= 100 && plan.wood >= 100);
//! for command in plan.commands().unwrap() {
//!     println!("{}", command);
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::search::{AStarSearch, SearchAlgorithm, SearchLimits, SearchStats};
use crate::snapshot::{Goal, Snapshot, UnitRoles};
use crate::state::{JointActionLimits, PlanningRules, PlanningState};
use crate::{Action, HeuristicWeights, Result};

/// Everything tunable about a planning run.
///
/// Every field falls back to its default when missing from JSON:
///
/// ```
/// use harvest_rs::PlannerConfig;
///
/// let config = PlannerConfig::from_json(r#"{
///     "limits": {"max_expansions": 5000},
///     "heuristic": {"cargo": 0.8},
///     "roles": {"worker": "Peon", "deposit": "GreatHall"}
/// }"#).unwrap();
/// assert_eq!(config.limits.max_expansions, Some(5000));
/// assert_eq!(config.heuristic.harvest, 0.25);
/// assert_eq!(config.joint.max_group_size, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub limits: SearchLimits,
    pub heuristic: HeuristicWeights,
    pub joint: JointActionLimits,
    pub roles: UnitRoles,
}

impl PlannerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn rules(&self, goal: Goal) -> PlanningRules {
        PlanningRules::new(goal)
            .with_weights(self.heuristic)
            .with_joint_limits(self.joint)
    }
}

/// The result of a successful planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in execution order. Empty when the goal was already met.
    pub actions: Vec<Action>,
    /// Sum of the action costs.
    pub cost: f64,
    /// Gold total once the plan has run.
    pub gold: u32,
    /// Wood total once the plan has run.
    pub wood: u32,
    pub stats: SearchStats,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// The plan as host commands, in order. See [`Action::commands`].
    pub fn commands(&self) -> Result<Vec<Command>> {
        let mut commands = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            commands.extend(action.commands()?);
        }
        Ok(commands)
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The planner for gathering workers.
///
/// A `Planner` owns its configuration and the search algorithm it runs. It is
/// stateless between calls, so one planner can serve any number of snapshots.
///
/// # Examples
///
/// Using Dijkstra's algorithm instead of A*:
///
/// ```
/// use harvest_rs::{DijkstraSearch, Goal, NodeType, Planner, PlannerConfig, Position, ResourceNodeView, Snapshot, UnitView};
///
/// let config = PlannerConfig::default();
/// let planner = Planner::with_search_algorithm(config.clone(), Box::new(DijkstraSearch::new(config.limits)));
///
/// let snapshot = Snapshot::new(5, 3, 0)
///     .with_unit(UnitView::new(1, 0, "TownHall", Position::new(3, 1)))
///     .with_unit(UnitView::new(2, 0, "Peasant", Position::new(1, 1)))
///     .with_resource(ResourceNodeView::new(10, NodeType::GoldMine, Position::new(2, 1), 50));
///
/// let plan = planner.plan(&snapshot, &Goal::new(50, 0)).unwrap();
/// assert_eq!(plan.len(), 3);
/// assert_eq!(plan.cost, 3.0);
/// ```
pub struct Planner {
    config: PlannerConfig,
    /// The algorithm used to search for a plan
    search_algorithm: Box<dyn SearchAlgorithm>,
}

impl Planner {
    /// Creates a planner that runs A* with the configured limits.
    pub fn new(config: PlannerConfig) -> Self {
        let search_algorithm = Box::new(AStarSearch::with_limits(config.limits));
        Self {
            config,
            search_algorithm,
        }
    }

    /// Creates a planner with a custom search algorithm.
    ///
    /// The algorithm brings its own limits; `config.limits` is not applied to it.
    pub fn with_search_algorithm(config: PlannerConfig, search_algorithm: Box<dyn SearchAlgorithm>) -> Self {
        Self {
            config,
            search_algorithm,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Builds the state planning starts from.
    pub fn initial_state(&self, snapshot: &Snapshot, goal: &Goal) -> Result<PlanningState> {
        PlanningState::from_snapshot(snapshot, &self.config.roles, self.config.rules(*goal))
    }

    /// Finds a plan that brings the player's gold and wood up to `goal`.
    ///
    /// # Returns
    ///
    /// * `Ok(Plan)` - The actions to run, empty if the goal is already satisfied
    /// * `Err(PlanError)` - If the snapshot is unusable or no plan exists
    ///
    /// # Errors
    ///
    /// * [`PlanError::MissingDeposit`], [`PlanError::NoWorkers`] or
    ///   [`PlanError::InvalidSnapshot`] when the snapshot cannot be planned on
    /// * [`PlanError::NoPlanFound`] when the reachable states never meet the goal,
    ///   for example when the map holds too little of a resource
    /// * [`PlanError::BudgetExhausted`] when the search limits run out first
    ///
    /// [`PlanError::MissingDeposit`]: crate::PlanError::MissingDeposit
    /// [`PlanError::NoWorkers`]: crate::PlanError::NoWorkers
    /// [`PlanError::InvalidSnapshot`]: crate::PlanError::InvalidSnapshot
    /// [`PlanError::NoPlanFound`]: crate::PlanError::NoPlanFound
    /// [`PlanError::BudgetExhausted`]: crate::PlanError::BudgetExhausted
    pub fn plan(&self, snapshot: &Snapshot, goal: &Goal) -> Result<Plan> {
        let initial = self.initial_state(snapshot, goal)?;

        if initial.is_goal() {
            log::info!(
                "Goal already satisfied (gold {}, wood {})",
                initial.current_gold(),
                initial.current_wood()
            );
            return Ok(Plan {
                actions: Vec::new(),
                cost: 0.0,
                gold: initial.current_gold(),
                wood: initial.current_wood(),
                stats: SearchStats::default(),
            });
        }

        let outcome = self.search_algorithm.search(initial)?;
        let state = outcome.state;
        Ok(Plan {
            cost: state.cost(),
            gold: state.current_gold(),
            wood: state.current_wood(),
            actions: state.into_plan(),
            stats: outcome.stats,
        })
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeType, PlanError, Position, ResourceKind, ResourceNodeView, UnitView};

    fn corridor() -> Snapshot {
        Snapshot::new(5, 3, 0)
            .with_unit(UnitView::new(1, 0, "TownHall", Position::new(3, 1)))
            .with_unit(UnitView::new(2, 0, "Peasant", Position::new(1, 1)))
            .with_resource(ResourceNodeView::new(10, NodeType::GoldMine, Position::new(2, 1), 50))
    }

    #[test]
    fn test_plan_corridor() {
        let plan = Planner::default()
            .plan(&corridor(), &Goal::new(50, 0))
            .unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.cost, 3.0);
        assert_eq!(plan.gold, 50);
        let commands = plan.commands().unwrap();
        assert_eq!(commands.len(), 3);
        assert!(matches!(
            commands[0],
            Command::Gather { unit: 2, .. }
        ));
    }

    #[test]
    fn test_satisfied_goal_gives_empty_plan() {
        let snapshot = corridor().with_stockpile(80, 0);
        let plan = Planner::default()
            .plan(&snapshot, &Goal::new(50, 0))
            .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.cost, 0.0);
        assert_eq!(plan.gold, 80);
        assert_eq!(plan.stats, SearchStats::default());
    }

    #[test]
    fn test_missing_deposit_propagates() {
        let snapshot = Snapshot::new(5, 3, 0)
            .with_unit(UnitView::new(2, 0, "Peasant", Position::new(1, 1)));
        assert!(matches!(
            Planner::default().plan(&snapshot, &Goal::new(50, 0)),
            Err(PlanError::MissingDeposit)
        ));
    }

    #[test]
    fn test_custom_roles() {
        let config = PlannerConfig::from_json(r#"{"roles": {"worker": "peon", "deposit": "greathall"}}"#).unwrap();
        let snapshot = Snapshot::new(5, 3, 0)
            .with_unit(UnitView::new(1, 0, "GreatHall", Position::new(3, 1)))
            .with_unit(UnitView::new(2, 0, "Peon", Position::new(1, 1)))
            .with_resource(ResourceNodeView::new(10, NodeType::Tree, Position::new(2, 1), 50));
        let plan = Planner::new(config)
            .plan(&snapshot, &Goal::new(0, 50))
            .unwrap();
        assert_eq!(plan.wood, 50);
        assert!(plan.iter().any(|a| matches!(
            a,
            Action::Harvest {
                kind: ResourceKind::Wood,
                ..
            }
        )));
    }

    #[test]
    fn test_config_from_json_rejects_garbage() {
        assert!(matches!(
            PlannerConfig::from_json("{\"limits\": 3}"),
            Err(PlanError::Json(_))
        ));
    }
}
