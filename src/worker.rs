use serde::{Deserialize, Serialize};

use crate::position::Position;
use crate::resource_map::ResourceKind;

/// Stable identity of a unit in the host snapshot.
pub type UnitId = u32;

/// What a worker is carrying. A worker with nothing carries `None`, so a
/// `Cargo` always has a kind and a positive amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cargo {
    pub kind: ResourceKind,
    pub amount: u32,
}

impl Cargo {
    /// `None` for an empty load.
    pub fn new(kind: ResourceKind, amount: u32) -> Option<Self> {
        (amount > 0).then_some(Self { kind, amount })
    }
}

/// Planning-time facts about one worker unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub id: UnitId,
    pub position: Position,
    pub cargo: Option<Cargo>,
    /// The resource or deposit cell this worker last travelled toward.
    pub target: Option<Position>,
}

impl Worker {
    pub fn new(id: UnitId, position: Position) -> Self {
        Self {
            id,
            position,
            cargo: None,
            target: None,
        }
    }

    pub fn with_cargo(mut self, cargo: Option<Cargo>) -> Self {
        self.cargo = cargo;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cargo.is_none()
    }

    pub fn carried(&self) -> u32 {
        self.cargo.map_or(0, |c| c.amount)
    }

    /// Amount of `kind` this worker is carrying.
    pub fn carried_of(&self, kind: ResourceKind) -> u32 {
        match self.cargo {
            Some(cargo) if cargo.kind == kind => cargo.amount,
            _ => 0,
        }
    }

    pub fn is_adjacent_to(&self, pos: Position) -> bool {
        self.position.is_adjacent(pos)
    }

    /// Clears the load and returns what was carried.
    pub fn unload(&mut self) -> Option<Cargo> {
        self.cargo.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cargo_is_none() {
        assert_eq!(Cargo::new(ResourceKind::Gold, 0), None);
        let cargo = Cargo::new(ResourceKind::Wood, 40).unwrap();
        assert_eq!(cargo.amount, 40);
    }

    #[test]
    fn test_carried_amounts() {
        let worker = Worker::new(7, Position::new(1, 1))
            .with_cargo(Cargo::new(ResourceKind::Gold, 100));
        assert!(!worker.is_empty());
        assert_eq!(worker.carried_of(ResourceKind::Gold), 100);
        assert_eq!(worker.carried_of(ResourceKind::Wood), 0);
    }

    #[test]
    fn test_unload() {
        let mut worker = Worker::new(1, Position::new(0, 0))
            .with_cargo(Cargo::new(ResourceKind::Wood, 25));
        let cargo = worker.unload();
        assert_eq!(cargo, Cargo::new(ResourceKind::Wood, 25));
        assert!(worker.is_empty());
        assert_eq!(worker.carried(), 0);
        assert_eq!(worker.unload(), None);
    }
}
