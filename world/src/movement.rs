//! Legality and cost of single-cell steps.

use crisis_response_core::{CellCoord, EntityId, MoveBlocked};

use crate::{grid::Grid, registry::Entity, registry::Registry};

/// Tokens spent by a regular step.
const STEP_COST: u8 = 1;
/// Tokens spent by a medic carrying a survivor.
const CARRYING_STEP_COST: u8 = 2;

/// Movement allowance earned one token per tick and banked up to the cost of
/// the agent's next step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MoveTokens(u8);

impl MoveTokens {
    pub(crate) const fn get(&self) -> u8 {
        self.0
    }

    pub(crate) fn earn(&mut self, cap: u8) {
        self.0 = self.0.saturating_add(1).min(cap);
    }

    pub(crate) fn clamp(&mut self, cap: u8) {
        self.0 = self.0.min(cap);
    }

    pub(crate) fn spend(&mut self, cost: u8) -> bool {
        if self.0 < cost {
            return false;
        }
        self.0 -= cost;
        true
    }
}

/// Tokens the entity pays for its next step.
pub(crate) fn step_cost(entity: &Entity) -> u8 {
    match entity {
        Entity::Medic(medic) if medic.carrying.is_some() => CARRYING_STEP_COST,
        Entity::Drone(_) | Entity::Medic(_) | Entity::Truck(_) => STEP_COST,
        Entity::Survivor(_) => 0,
    }
}

/// Decides whether `agent` may step from `from` to `to` and what it costs.
///
/// Rubble blocks everyone. Medics never share a cell with another medic
/// unless the cell is a depot or a hospital; vehicles overlap freely.
pub(crate) fn can_move(
    grid: &Grid,
    registry: &Registry,
    agent: EntityId,
    entity: &Entity,
    from: CellCoord,
    to: CellCoord,
) -> Result<u8, MoveBlocked> {
    if !grid.contains(to) {
        return Err(MoveBlocked::OutOfBounds);
    }
    if !from.is_adjacent(to) {
        return Err(MoveBlocked::NotAdjacent);
    }
    if grid.hazard(to).map_or(false, |hazard| hazard.is_rubble()) {
        return Err(MoveBlocked::Rubble);
    }

    if let Entity::Medic(_) = entity {
        let landmark = grid
            .terrain(to)
            .map_or(false, |terrain| terrain.is_landmark());
        if !landmark && registry.has_other_medic_at(to, agent) {
            return Err(MoveBlocked::Occupied);
        }
    }

    Ok(step_cost(entity))
}
