//! The read-only view of the host world that planning starts from.
//!
//! A [`Snapshot`] carries only what the planner queries: map extents, units
//! with their position and cargo, and resource nodes with what they have left.
//! It can be built in code or loaded from JSON.
//!
//! ```
//! use harvest_rs::Snapshot;
//!
//! let snapshot = Snapshot::from_json(r#"{
//!     "width": 8, "height": 8, "player": 0,
//!     "units": [
//!         {"id": 1, "player": 0, "template": "TownHall", "position": {"x": 0, "y": 0}},
//!         {"id": 2, "player": 0, "template": "Peasant", "position": {"x": 1, "y": 1}}
//!     ],
//!     "resources": [
//!         {"id": 10, "kind": "GoldMine", "position": {"x": 5, "y": 5}, "amount_remaining": 500}
//!     ]
//! }"#).unwrap();
//! assert_eq!(snapshot.units.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::position::Position;
use crate::resource_map::ResourceKind;
use crate::worker::{Cargo, UnitId};

/// A unit as the host reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub player: u32,
    /// Template name, e.g. `"Peasant"` or `"TownHall"`.
    pub template: String,
    pub position: Position,
    #[serde(default)]
    pub cargo: Option<Cargo>,
    #[serde(default)]
    pub basic_attack: u32,
}

impl UnitView {
    pub fn new(id: UnitId, player: u32, template: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            player,
            template: template.into(),
            position,
            cargo: None,
            basic_attack: 0,
        }
    }

    pub fn with_cargo(mut self, kind: ResourceKind, amount: u32) -> Self {
        self.cargo = Cargo::new(kind, amount);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    GoldMine,
    Tree,
}

impl NodeType {
    pub fn resource_kind(self) -> ResourceKind {
        match self {
            NodeType::GoldMine => ResourceKind::Gold,
            NodeType::Tree => ResourceKind::Wood,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNodeView {
    pub id: u32,
    pub kind: NodeType,
    pub position: Position,
    pub amount_remaining: u32,
}

impl ResourceNodeView {
    pub fn new(id: u32, kind: NodeType, position: Position, amount_remaining: u32) -> Self {
        Self {
            id,
            kind,
            position,
            amount_remaining,
        }
    }
}

/// The world at planning time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    /// The player whose units are being planned for.
    pub player: u32,
    /// Gold already in the player's stockpile.
    #[serde(default)]
    pub gold: u32,
    /// Wood already in the player's stockpile.
    #[serde(default)]
    pub wood: u32,
    #[serde(default)]
    pub units: Vec<UnitView>,
    #[serde(default)]
    pub resources: Vec<ResourceNodeView>,
}

impl Snapshot {
    pub fn new(width: i32, height: i32, player: u32) -> Self {
        Self {
            width,
            height,
            player,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_unit(mut self, unit: UnitView) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_resource(mut self, node: ResourceNodeView) -> Self {
        self.resources.push(node);
        self
    }

    pub fn with_stockpile(mut self, gold: u32, wood: u32) -> Self {
        self.gold = gold;
        self.wood = wood;
        self
    }

    /// Units owned by the planning player.
    pub fn own_units(&self) -> impl Iterator<Item = &UnitView> {
        self.units.iter().filter(move |u| u.player == self.player)
    }
}

/// Template names that identify worker and deposit units, matched without
/// regard to ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitRoles {
    pub worker: String,
    pub deposit: String,
}

impl Default for UnitRoles {
    fn default() -> Self {
        Self {
            worker: "peasant".to_string(),
            deposit: "townhall".to_string(),
        }
    }
}

impl UnitRoles {
    pub fn is_worker(&self, unit: &UnitView) -> bool {
        unit.template.eq_ignore_ascii_case(&self.worker)
    }

    pub fn is_deposit(&self, unit: &UnitView) -> bool {
        unit.template.eq_ignore_ascii_case(&self.deposit)
    }
}

/// Totals the plan must reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub gold: u32,
    pub wood: u32,
    /// Whether unit production may be planned. Not used by this planner.
    #[serde(default)]
    pub build_workers: bool,
}

impl Goal {
    pub fn new(gold: u32, wood: u32) -> Self {
        Self {
            gold,
            wood,
            build_workers: false,
        }
    }

    pub fn required(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }
}
