mod action;
mod command;
mod error;
pub mod heuristic;
mod planner;
mod position;
mod resource_map;
mod search;
mod snapshot;
mod state;
mod visualizer;
mod worker;

pub use action::{Action, MoveStep, Stance};
pub use command::Command;
pub use error::{PlanError, Result};
pub use heuristic::HeuristicWeights;
pub use planner::{Plan, Planner, PlannerConfig};
pub use position::{Direction, Position};
pub use resource_map::{ResourceKind, ResourceMap, ResourceNode, MAX_CELLS, MAX_HARVEST};
pub use search::{
    AStarSearch, DefaultHeuristic, DijkstraSearch, HeuristicStrategy, SearchAlgorithm, SearchLimits,
    SearchOutcome, SearchStats, ZeroHeuristic,
};
pub use snapshot::{Goal, NodeType, ResourceNodeView, Snapshot, UnitRoles, UnitView};
pub use state::{JointActionLimits, PlanningRules, PlanningState, StateKey};
pub use visualizer::PlanVisualizer;
pub use worker::{Cargo, UnitId, Worker};
