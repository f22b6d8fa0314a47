//! Identity-keyed storage for agents and survivors.

use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

use crisis_response_core::{
    AgentKind, AgentSnapshot, AgentStatus, CellCoord, EntityId, SurvivorState,
};

use crate::{movement::MoveTokens, resources::Gauge};

#[derive(Clone, Debug)]
pub(crate) struct Drone {
    pub(crate) cell: CellCoord,
    pub(crate) battery: Gauge,
    pub(crate) tokens: MoveTokens,
}

impl Drone {
    pub(crate) fn new(cell: CellCoord, battery: u32) -> Self {
        Self {
            cell,
            battery: Gauge::full(battery),
            tokens: MoveTokens::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Truck {
    pub(crate) cell: CellCoord,
    pub(crate) battery: Gauge,
    pub(crate) water: Gauge,
    pub(crate) tools: Gauge,
    pub(crate) tokens: MoveTokens,
}

impl Truck {
    pub(crate) fn new(cell: CellCoord, battery: u32, water: u32, tools: u32) -> Self {
        Self {
            cell,
            battery: Gauge::full(battery),
            water: Gauge::full(water),
            tools: Gauge::full(tools),
            tokens: MoveTokens::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Medic {
    pub(crate) cell: CellCoord,
    pub(crate) carrying: Option<EntityId>,
    pub(crate) tokens: MoveTokens,
}

impl Medic {
    pub(crate) fn new(cell: CellCoord) -> Self {
        Self {
            cell,
            carrying: None,
            tokens: MoveTokens::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Survivor {
    pub(crate) deadline: u64,
    pub(crate) state: SurvivorState,
}

/// Every stateful entity of the world, dispatched by exhaustive matching.
#[derive(Clone, Debug)]
pub(crate) enum Entity {
    Drone(Drone),
    Medic(Medic),
    Truck(Truck),
    Survivor(Survivor),
}

impl Entity {
    pub(crate) const fn agent_kind(&self) -> Option<AgentKind> {
        match self {
            Self::Drone(_) => Some(AgentKind::Drone),
            Self::Medic(_) => Some(AgentKind::Medic),
            Self::Truck(_) => Some(AgentKind::Truck),
            Self::Survivor(_) => None,
        }
    }

    /// Cell of an agent. Survivors are located through their state.
    pub(crate) const fn agent_cell(&self) -> Option<CellCoord> {
        match self {
            Self::Drone(drone) => Some(drone.cell),
            Self::Medic(medic) => Some(medic.cell),
            Self::Truck(truck) => Some(truck.cell),
            Self::Survivor(_) => None,
        }
    }

    pub(crate) fn set_agent_cell(&mut self, cell: CellCoord) {
        match self {
            Self::Drone(drone) => drone.cell = cell,
            Self::Medic(medic) => medic.cell = cell,
            Self::Truck(truck) => truck.cell = cell,
            Self::Survivor(_) => {}
        }
    }

    pub(crate) fn tokens(&self) -> Option<MoveTokens> {
        match self {
            Self::Drone(drone) => Some(drone.tokens),
            Self::Medic(medic) => Some(medic.tokens),
            Self::Truck(truck) => Some(truck.tokens),
            Self::Survivor(_) => None,
        }
    }

    pub(crate) fn tokens_mut(&mut self) -> Option<&mut MoveTokens> {
        match self {
            Self::Drone(drone) => Some(&mut drone.tokens),
            Self::Medic(medic) => Some(&mut medic.tokens),
            Self::Truck(truck) => Some(&mut truck.tokens),
            Self::Survivor(_) => None,
        }
    }

    /// Battery of a vehicle, `None` for medics and survivors.
    pub(crate) const fn battery(&self) -> Option<Gauge> {
        match self {
            Self::Drone(drone) => Some(drone.battery),
            Self::Truck(truck) => Some(truck.battery),
            Self::Medic(_) | Self::Survivor(_) => None,
        }
    }

    pub(crate) fn status(&self) -> Option<AgentStatus> {
        match self {
            Self::Drone(_) | Self::Truck(_) => {
                let depleted = self.battery().map_or(false, |battery| battery.is_depleted());
                Some(if depleted {
                    AgentStatus::Depleted
                } else {
                    AgentStatus::Ready
                })
            }
            Self::Medic(medic) => Some(match medic.carrying {
                Some(survivor) => AgentStatus::Carrying(survivor),
                None => AgentStatus::Available,
            }),
            Self::Survivor(_) => None,
        }
    }

    pub(crate) fn snapshot(&self, id: EntityId) -> Option<AgentSnapshot> {
        let kind = self.agent_kind()?;
        let cell = self.agent_cell()?;
        let status = self.status()?;
        let move_tokens = self.tokens().map_or(0, |tokens| tokens.get());
        let (water, tools) = match self {
            Self::Truck(truck) => (Some(truck.water.level()), Some(truck.tools.level())),
            _ => (None, None),
        };

        Some(AgentSnapshot {
            id,
            kind,
            cell,
            status,
            move_tokens,
            battery: self.battery().map(|battery| battery.level()),
            water,
            tools,
        })
    }
}

/// Owns every entity keyed by its stable identifier.
///
/// Iteration is in ascending identifier order so every pass over the
/// registry is reproducible.
#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    entities: BTreeMap<EntityId, Entity>,
}

impl Registry {
    /// Inserts a new entity, refusing identifiers already in use.
    pub(crate) fn insert(&mut self, id: EntityId, entity: Entity) -> Result<(), EntityId> {
        match self.entities.entry(id) {
            Entry::Occupied(_) => Err(id),
            Entry::Vacant(slot) => {
                let _ = slot.insert(entity);
                Ok(())
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> {
        self.entities.iter_mut().map(|(id, entity)| (*id, entity))
    }

    pub(crate) fn survivors(&self) -> impl Iterator<Item = (EntityId, &Survivor)> {
        self.iter().filter_map(|(id, entity)| match entity {
            Entity::Survivor(survivor) => Some((id, survivor)),
            _ => None,
        })
    }

    pub(crate) fn survivor(&self, id: EntityId) -> Option<&Survivor> {
        match self.get(id)? {
            Entity::Survivor(survivor) => Some(survivor),
            _ => None,
        }
    }

    pub(crate) fn survivor_mut(&mut self, id: EntityId) -> Option<&mut Survivor> {
        match self.get_mut(id)? {
            Entity::Survivor(survivor) => Some(survivor),
            _ => None,
        }
    }

    pub(crate) fn medic_mut(&mut self, id: EntityId) -> Option<&mut Medic> {
        match self.get_mut(id)? {
            Entity::Medic(medic) => Some(medic),
            _ => None,
        }
    }

    /// Reports whether a medic other than `except` stands on the cell.
    pub(crate) fn has_other_medic_at(&self, cell: CellCoord, except: EntityId) -> bool {
        self.iter().any(|(id, entity)| {
            id != except && matches!(entity, Entity::Medic(medic) if medic.cell == cell)
        })
    }

    /// Cells holding an agent or an uncarried survivor.
    pub(crate) fn occupied_cells(&self) -> BTreeSet<CellCoord> {
        self.iter()
            .filter_map(|(_, entity)| match entity {
                Entity::Survivor(survivor) => match survivor.state {
                    SurvivorState::Waiting { cell } | SurvivorState::Dead { cell } => Some(cell),
                    _ => None,
                },
                agent => agent.agent_cell(),
            })
            .collect()
    }
}
