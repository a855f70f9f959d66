//! Remaining-cost estimate for planning states.
//!
//! The estimate starts from the outstanding gold and wood deficits and then
//! credits each worker for progress already made. A loaded worker earns a share
//! of its cargo and loses the distance it still has to walk to the deposit. An
//! empty worker earns a share of the richest useful cell next to it and loses
//! half the distance to the cell it would be sent to next.
//!
//! The weights are tuned defaults. They shape the search toward finishing
//! harvest/deposit cycles and are not an admissible bound.

use serde::{Deserialize, Serialize};

use crate::resource_map::{ResourceKind, MAX_HARVEST};
use crate::state::PlanningState;
use crate::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    /// Share of carried cargo counted as already delivered.
    pub cargo: f64,
    /// Share of the richest adjacent useful cell credited to an empty worker.
    pub harvest: f64,
    /// Penalty per cell a loaded worker still has to walk to the deposit.
    pub loaded_travel: f64,
    /// Penalty per cell an empty worker still has to walk to its resource.
    pub empty_travel: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            cargo: 0.6,
            harvest: 0.25,
            loaded_travel: 1.0,
            empty_travel: 0.5,
        }
    }
}

/// Cells still to walk before standing next to something `distance` away.
fn owed(distance: u32) -> f64 {
    f64::from(distance.saturating_sub(1))
}

/// Estimated remaining cost from `state` to any goal state. Zero for goals.
pub fn estimate(state: &PlanningState) -> f64 {
    if state.is_goal() {
        return 0.0;
    }

    let deficit = ResourceKind::ALL
        .into_iter()
        .map(|kind| f64::from(state.deficit(kind)))
        .sum::<f64>();
    let wanted: Vec<(ResourceKind, u32)> = ResourceKind::ALL
        .into_iter()
        .map(|kind| (kind, state.outstanding(kind)))
        .filter(|(_, need)| *need > 0)
        .collect();

    let credit: f64 = state
        .workers()
        .iter()
        .map(|worker| worker_bonus(state, worker, &wanted))
        .sum();

    (deficit - credit).max(0.0)
}

fn worker_bonus(state: &PlanningState, worker: &Worker, wanted: &[(ResourceKind, u32)]) -> f64 {
    let weights = &state.rules().weights;
    let map = state.map();
    let pos = worker.position;

    if let Some(cargo) = worker.cargo {
        let to_deposit = owed(pos.chebyshev_distance(map.deposit()));
        return weights.cargo * f64::from(cargo.amount) - weights.loaded_travel * to_deposit;
    }

    let travel = wanted
        .iter()
        .filter_map(|(kind, need)| map.best_resource(*kind, pos, *need))
        .map(|cell| pos.chebyshev_distance(cell))
        .min();
    let Some(travel) = travel else {
        return 0.0;
    };

    let within_reach = wanted
        .iter()
        .filter_map(|(kind, _)| {
            map.richest_adjacent(*kind, pos)
                .map(|cell| map.amount_at(*kind, cell))
        })
        .max()
        .unwrap_or(0)
        .min(MAX_HARVEST);

    weights.harvest * f64::from(within_reach) - weights.empty_travel * owed(travel)
}
