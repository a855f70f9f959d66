//! Per-cell resource amounts and occupancy for one planning state.
//!
//! A [`ResourceMap`] is built once from the initial snapshot and then cloned
//! into every successor state. The grids sit behind [`Arc`]s and are copied on
//! first write, so cloning is cheap and a write made while producing one state
//! is never visible through any other state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::position::Position;

/// Most units a single harvest can take, and the carrying capacity of a worker.
pub const MAX_HARVEST: u32 = 100;

/// Largest map, in cells, the planner accepts.
pub const MAX_CELLS: usize = 1 << 22;

/// The two resource kinds the planner gathers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Gold,
    Wood,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Gold, ResourceKind::Wood];
}

/// A resource node known to the map. Its remaining amount lives in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct ResourceMap {
    width: i32,
    height: i32,
    gold: Arc<Vec<u32>>,
    wood: Arc<Vec<u32>>,
    blocked: Arc<Vec<bool>>,
    deposit: Position,
    /// Sorted by position; this is the scan order of [`ResourceMap::best_resource`].
    nodes: Arc<Vec<ResourceNode>>,
}

impl ResourceMap {
    /// Creates an empty map whose only blocked cell is the deposit.
    pub fn new(width: i32, height: i32, deposit: Position) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(PlanError::InvalidSnapshot(format!(
                "map extents must be positive, got {}x{}",
                width, height
            )));
        }
        let cells = (width as usize)
            .checked_mul(height as usize)
            .filter(|cells| *cells <= MAX_CELLS)
            .ok_or_else(|| {
                PlanError::InvalidSnapshot(format!(
                    "map of {}x{} exceeds {} cells",
                    width, height, MAX_CELLS
                ))
            })?;
        let mut map = Self {
            width,
            height,
            gold: Arc::new(vec![0; cells]),
            wood: Arc::new(vec![0; cells]),
            blocked: Arc::new(vec![false; cells]),
            deposit,
            nodes: Arc::new(Vec::new()),
        };
        let idx = map.index(deposit).ok_or_else(|| {
            PlanError::InvalidSnapshot(format!("deposit {} is outside the map", deposit))
        })?;
        Arc::make_mut(&mut map.blocked)[idx] = true;
        Ok(map)
    }

    /// Registers a resource node. Nodes with nothing left are ignored.
    pub fn add_resource(&mut self, kind: ResourceKind, position: Position, amount: u32) -> Result<()> {
        let idx = self.index(position).ok_or_else(|| {
            PlanError::InvalidSnapshot(format!("resource at {} is outside the map", position))
        })?;
        if self.blocked[idx] {
            return Err(PlanError::InvalidSnapshot(format!(
                "resource at {} overlaps the deposit or another resource",
                position
            )));
        }
        if amount == 0 {
            log::debug!("Ignoring depleted {:?} node at {}", kind, position);
            return Ok(());
        }

        Arc::make_mut(self.grid_mut(kind))[idx] = amount;
        Arc::make_mut(&mut self.blocked)[idx] = true;

        let nodes = Arc::make_mut(&mut self.nodes);
        let at = nodes.partition_point(|n| n.position < position);
        nodes.insert(at, ResourceNode { kind, position });
        Ok(())
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn deposit(&self) -> Position {
        self.deposit
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    fn grid(&self, kind: ResourceKind) -> &[u32] {
        match kind {
            ResourceKind::Gold => &self.gold,
            ResourceKind::Wood => &self.wood,
        }
    }

    fn grid_mut(&mut self, kind: ResourceKind) -> &mut Arc<Vec<u32>> {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Wood => &mut self.wood,
        }
    }

    /// Remaining amount of `kind` at `pos`; zero off the map.
    pub fn amount_at(&self, kind: ResourceKind, pos: Position) -> u32 {
        self.index(pos).map_or(0, |idx| self.grid(kind)[idx])
    }

    /// The kind of resource still present at `pos`, if any.
    pub fn kind_at(&self, pos: Position) -> Option<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| self.amount_at(*kind, pos) > 0)
    }

    /// Off-map cells count as blocked.
    pub fn is_blocked(&self, pos: Position) -> bool {
        self.index(pos).map_or(true, |idx| self.blocked[idx])
    }

    /// Takes up to `requested` units of `kind` from `pos` and returns what was taken.
    ///
    /// The take is clamped to [`MAX_HARVEST`] and to what remains. A resource
    /// cell that runs dry becomes passable; the deposit never does.
    pub fn harvest(&mut self, kind: ResourceKind, pos: Position, requested: u32) -> u32 {
        let Some(idx) = self.index(pos) else {
            return 0;
        };
        let remaining = self.grid(kind)[idx];
        let taken = requested.min(MAX_HARVEST).min(remaining);
        if taken == 0 {
            return 0;
        }

        let left = remaining - taken;
        Arc::make_mut(self.grid_mut(kind))[idx] = left;
        if left == 0 && pos != self.deposit {
            Arc::make_mut(&mut self.blocked)[idx] = false;
        }
        taken
    }

    /// Nodes of `kind` that still hold something, in scan order.
    pub fn resources(&self, kind: ResourceKind) -> impl Iterator<Item = (Position, u32)> + '_ {
        self.nodes
            .iter()
            .filter(move |node| node.kind == kind)
            .map(move |node| (node.position, self.amount_at(kind, node.position)))
            .filter(|(_, amount)| *amount > 0)
    }

    /// Some neighbour of `pos` is on the map and not blocked.
    pub fn has_open_neighbour(&self, pos: Position) -> bool {
        pos.neighbors().any(|cell| !self.is_blocked(cell))
    }

    /// Picks the resource cell of `kind` a worker at `from` should head for.
    ///
    /// Nodes walled in by blocked cells are skipped. Of the rest, the first
    /// in scan order leads. A later node takes over when it
    /// is no farther and holds at least as much, when it alone covers
    /// `outstanding` and the leader does not, or when the leader cannot cover
    /// `outstanding` but does hold a full load and the candidate holds at least
    /// as much.
    pub fn best_resource(&self, kind: ResourceKind, from: Position, outstanding: u32) -> Option<Position> {
        let mut best: Option<(Position, u32, u32)> = None;

        let reachable = self
            .resources(kind)
            .filter(|(pos, _)| self.has_open_neighbour(*pos));
        for (pos, amount) in reachable {
            let distance = from.chebyshev_distance(pos);
            let Some((_, lead_distance, lead_amount)) = best else {
                best = Some((pos, distance, amount));
                continue;
            };

            let covers = amount >= outstanding;
            let lead_covers = lead_amount >= outstanding;
            let replace = (distance <= lead_distance && amount >= lead_amount)
                || (covers && !lead_covers)
                || (!lead_covers && lead_amount >= MAX_HARVEST && amount >= lead_amount);
            if replace {
                best = Some((pos, distance, amount));
            }
        }

        best.map(|(pos, _, _)| pos)
    }

    /// The adjacent cell holding the most of `kind`. Ties go to the first
    /// neighbour in direction order.
    pub fn richest_adjacent(&self, kind: ResourceKind, pos: Position) -> Option<Position> {
        let mut best: Option<(Position, u32)> = None;
        for cell in pos.neighbors() {
            let amount = self.amount_at(kind, cell);
            if amount > 0 && best.map_or(true, |(_, b)| amount > b) {
                best = Some((cell, amount));
            }
        }
        best.map(|(cell, _)| cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(resources: &[(ResourceKind, (i32, i32), u32)]) -> ResourceMap {
        let mut map = ResourceMap::new(10, 10, Position::new(0, 0)).unwrap();
        for (kind, (x, y), amount) in resources {
            map.add_resource(*kind, Position::new(*x, *y), *amount).unwrap();
        }
        map
    }

    #[test]
    fn test_new_rejects_bad_extents_and_deposit() {
        assert!(ResourceMap::new(0, 5, Position::new(0, 0)).is_err());
        assert!(ResourceMap::new(5, 5, Position::new(5, 0)).is_err());
        let map = ResourceMap::new(5, 5, Position::new(2, 2)).unwrap();
        assert!(map.is_blocked(Position::new(2, 2)));
        assert!(!map.is_blocked(Position::new(1, 1)));
        assert!(map.is_blocked(Position::new(-1, 1)));
    }

    #[test]
    fn test_add_resource_rejects_overlap() {
        let mut map = map_with(&[(ResourceKind::Gold, (3, 3), 200)]);
        assert!(map.add_resource(ResourceKind::Wood, Position::new(3, 3), 50).is_err());
        assert!(map.add_resource(ResourceKind::Wood, Position::new(0, 0), 50).is_err());
        assert!(map.add_resource(ResourceKind::Wood, Position::new(11, 0), 50).is_err());
    }

    #[test]
    fn test_harvest_conserves_and_clamps() {
        let mut map = map_with(&[(ResourceKind::Gold, (3, 3), 250)]);
        let cell = Position::new(3, 3);

        let taken = map.harvest(ResourceKind::Gold, cell, 500);
        assert_eq!(taken, 100);
        assert_eq!(map.amount_at(ResourceKind::Gold, cell), 150);

        let taken = map.harvest(ResourceKind::Gold, cell, 30);
        assert_eq!(taken, 30);
        assert_eq!(map.amount_at(ResourceKind::Gold, cell), 120);

        assert_eq!(map.harvest(ResourceKind::Wood, cell, 100), 0);
        assert_eq!(map.amount_at(ResourceKind::Gold, cell), 120);
    }

    #[test]
    fn test_depleted_cell_becomes_passable() {
        let mut map = map_with(&[(ResourceKind::Wood, (4, 1), 60)]);
        let cell = Position::new(4, 1);
        assert!(map.is_blocked(cell));
        assert_eq!(map.harvest(ResourceKind::Wood, cell, 100), 60);
        assert_eq!(map.amount_at(ResourceKind::Wood, cell), 0);
        assert!(!map.is_blocked(cell));
        assert!(map.is_blocked(map.deposit()));
        assert_eq!(map.resources(ResourceKind::Wood).count(), 0);
    }

    #[test]
    fn test_clone_does_not_share_writes() {
        let original = map_with(&[(ResourceKind::Gold, (2, 2), 300)]);
        let mut child = original.clone();
        assert!(Arc::ptr_eq(&original.gold, &child.gold));

        child.harvest(ResourceKind::Gold, Position::new(2, 2), 100);
        assert_eq!(original.amount_at(ResourceKind::Gold, Position::new(2, 2)), 300);
        assert_eq!(child.amount_at(ResourceKind::Gold, Position::new(2, 2)), 200);
        assert!(!Arc::ptr_eq(&original.gold, &child.gold));
        assert!(Arc::ptr_eq(&original.wood, &child.wood));
    }

    #[test]
    fn test_best_resource_prefers_near_and_rich() {
        let map = map_with(&[
            (ResourceKind::Gold, (2, 2), 300),
            (ResourceKind::Gold, (8, 8), 300),
        ]);
        let best = map.best_resource(ResourceKind::Gold, Position::new(1, 1), 200);
        assert_eq!(best, Some(Position::new(2, 2)));
        let best = map.best_resource(ResourceKind::Gold, Position::new(9, 9), 200);
        assert_eq!(best, Some(Position::new(8, 8)));
    }

    #[test]
    fn test_best_resource_prefers_cell_covering_outstanding() {
        let map = map_with(&[
            (ResourceKind::Wood, (2, 1), 40),
            (ResourceKind::Wood, (7, 7), 500),
        ]);
        let best = map.best_resource(ResourceKind::Wood, Position::new(1, 1), 200);
        assert_eq!(best, Some(Position::new(7, 7)));
        let best = map.best_resource(ResourceKind::Wood, Position::new(1, 1), 30);
        assert_eq!(best, Some(Position::new(2, 1)));
    }

    #[test]
    fn test_best_resource_ignores_other_kind_and_empty_map() {
        let map = map_with(&[(ResourceKind::Gold, (5, 5), 100)]);
        assert_eq!(map.best_resource(ResourceKind::Wood, Position::new(1, 1), 100), None);
        assert_eq!(map.kind_at(Position::new(5, 5)), Some(ResourceKind::Gold));
    }

    #[test]
    fn test_best_resource_skips_walled_in_node() {
        let map = map_with(&[
            (ResourceKind::Gold, (5, 2), 100),
            (ResourceKind::Gold, (9, 9), 500),
            (ResourceKind::Wood, (8, 8), 100),
            (ResourceKind::Wood, (8, 9), 100),
            (ResourceKind::Wood, (9, 8), 100),
        ]);
        assert!(!map.has_open_neighbour(Position::new(9, 9)));
        assert!(map.has_open_neighbour(Position::new(5, 2)));
        let best = map.best_resource(ResourceKind::Gold, Position::new(8, 6), 100);
        assert_eq!(best, Some(Position::new(5, 2)));
    }

    #[test]
    fn test_walled_in_node_opens_when_neighbour_depletes() {
        let mut map = map_with(&[
            (ResourceKind::Gold, (9, 9), 500),
            (ResourceKind::Wood, (8, 8), 100),
            (ResourceKind::Wood, (8, 9), 100),
            (ResourceKind::Wood, (9, 8), 100),
        ]);
        assert_eq!(map.best_resource(ResourceKind::Gold, Position::new(8, 6), 100), None);
        map.harvest(ResourceKind::Wood, Position::new(9, 8), 100);
        assert_eq!(
            map.best_resource(ResourceKind::Gold, Position::new(8, 6), 100),
            Some(Position::new(9, 9))
        );
    }

    #[test]
    fn test_new_rejects_oversized_map() {
        assert!(matches!(
            ResourceMap::new(i32::MAX, i32::MAX, Position::new(0, 0)),
            Err(PlanError::InvalidSnapshot(_))
        ));
        assert!(matches!(
            ResourceMap::new(4096, 4096, Position::new(0, 0)),
            Err(PlanError::InvalidSnapshot(_))
        ));
        assert!(ResourceMap::new(2048, 2048, Position::new(0, 0)).is_ok());
    }

    #[test]
    fn test_richest_adjacent() {
        let map = map_with(&[
            (ResourceKind::Gold, (3, 2), 50),
            (ResourceKind::Gold, (4, 3), 400),
            (ResourceKind::Gold, (6, 6), 900),
        ]);
        let pos = Position::new(3, 3);
        assert_eq!(map.richest_adjacent(ResourceKind::Gold, pos), Some(Position::new(4, 3)));
        assert_eq!(map.richest_adjacent(ResourceKind::Wood, pos), None);
    }
}
