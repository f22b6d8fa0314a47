//! Initial map description and its validation.

use std::collections::BTreeSet;

use crisis_response_core::{
    AgentKind, CellCoord, EntityId, Hazard, HospitalId, SurvivorState, Terrain, MAX_FIRE_INTENSITY,
};
use crisis_response_system_hazards::{HazardTuning, MAX_AFTERSHOCK_CELLS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    grid::Grid,
    registry::{Drone, Entity, Medic, Registry, Survivor, Truck},
    resources::{DEFAULT_BATTERY, DEFAULT_TOOLS, DEFAULT_WATER},
    triage::{Hospital, Triage},
};

/// Largest number of cells a map may describe.
pub const MAX_GRID_CELLS: u64 = 1 << 24;

const DEFAULT_SEED: u64 = 42;
const DEFAULT_MAX_TICKS: u64 = 300;

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_max_ticks() -> u64 {
    DEFAULT_MAX_TICKS
}

fn default_intensity() -> u8 {
    1
}

/// Errors raised while turning a [`MapDescription`] into a world.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The grid has no cells.
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    EmptyGrid {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The grid holds more than [`MAX_GRID_CELLS`] cells.
    #[error("grid {width}x{height} exceeds {max} cells", max = MAX_GRID_CELLS)]
    GridTooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// A placement lies outside the grid.
    #[error("cell {cell} lies outside the grid")]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
    },
    /// Two entities share an identifier.
    #[error("entity id {0} is used more than once")]
    DuplicateEntity(EntityId),
    /// Two hospitals share an identifier.
    #[error("hospital id {0} is used more than once")]
    DuplicateHospital(u32),
    /// A hospital cannot hold anyone.
    #[error("hospital {0} has zero capacity")]
    ZeroCapacity(u32),
    /// A hospital cannot serve anyone.
    #[error("hospital {0} has zero service rate")]
    ZeroServiceRate(u32),
    /// A building resistance lies outside `0..=1`.
    #[error("building at {cell} has resistance {resistance} outside 0..=1")]
    InvalidResistance {
        /// Building cell.
        cell: CellCoord,
        /// Configured resistance.
        resistance: f32,
    },
    /// A hazard probability lies outside `0..=1`.
    #[error("{name} must lie within 0..=1, got {value}")]
    InvalidProbability {
        /// Name of the tuning field.
        name: &'static str,
        /// Configured value.
        value: f64,
    },
    /// The aftershock bound lies outside `1..=MAX_AFTERSHOCK_CELLS`.
    #[error(
        "max_aftershock_cells must lie within 1..={max}, got {0}",
        max = MAX_AFTERSHOCK_CELLS
    )]
    InvalidAftershockCells(u32),
    /// An initial fire has an impossible intensity.
    #[error("fire at {cell} has intensity {intensity} outside 1..={max}", max = MAX_FIRE_INTENSITY)]
    InvalidIntensity {
        /// Burning cell.
        cell: CellCoord,
        /// Configured intensity.
        intensity: u8,
    },
    /// Two terrain features were placed on the same cell.
    #[error("cell {cell} already holds terrain")]
    OverlappingTerrain {
        /// Contested cell.
        cell: CellCoord,
    },
    /// Fire and rubble were placed on the same cell.
    #[error("cell {cell} already holds a hazard")]
    OverlappingHazards {
        /// Contested cell.
        cell: CellCoord,
    },
    /// A hazard was placed on a depot or hospital.
    #[error("landmark at {cell} cannot hold a hazard")]
    HazardOnLandmark {
        /// Landmark cell.
        cell: CellCoord,
    },
    /// An agent or survivor starts on rubble.
    #[error("entity {id} starts on rubble at {cell}")]
    PlacedOnRubble {
        /// Offending entity.
        id: EntityId,
        /// Rubble cell.
        cell: CellCoord,
    },
    /// Two medics start on the same ordinary cell.
    #[error("medics overlap at {cell}")]
    MedicsOverlap {
        /// Contested cell.
        cell: CellCoord,
    },
    /// A resource maximum was given to an agent that does not carry it.
    #[error("agent {id} does not carry {resource}")]
    ResourceNotApplicable {
        /// Offending agent.
        id: EntityId,
        /// Name of the resource.
        resource: &'static str,
    },
    /// The tick budget is zero.
    #[error("max_ticks must be positive")]
    ZeroTickBudget,
}

/// Building footprint with its fire resistance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Building cell.
    pub cell: CellCoord,
    /// Fraction of spread probability resisted.
    #[serde(default)]
    pub resistance: f32,
}

/// Hospital landmark with its triage parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalSpec {
    /// Hospital identifier, independent of entity identifiers.
    pub id: u32,
    /// Landmark cell.
    pub cell: CellCoord,
    /// Maximum queue length.
    pub capacity: u32,
    /// Survivors served per tick.
    pub service_rate: u32,
}

/// Fire burning when the simulation starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireSpec {
    /// Burning cell.
    pub cell: CellCoord,
    /// Starting intensity.
    #[serde(default = "default_intensity")]
    pub intensity: u8,
}

/// Agent placement with optional resource maxima.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Entity identifier.
    pub id: u32,
    /// Agent kind.
    pub kind: AgentKind,
    /// Starting cell.
    pub cell: CellCoord,
    /// Battery maximum for vehicles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<u32>,
    /// Water maximum for trucks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<u32>,
    /// Tool maximum for trucks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<u32>,
}

impl AgentSpec {
    /// Places an agent with default resource maxima.
    #[must_use]
    pub const fn new(id: u32, kind: AgentKind, cell: CellCoord) -> Self {
        Self {
            id,
            kind,
            cell,
            battery: None,
            water: None,
            tools: None,
        }
    }

    /// Overrides the battery maximum.
    #[must_use]
    pub const fn with_battery(mut self, battery: u32) -> Self {
        self.battery = Some(battery);
        self
    }

    /// Overrides the water maximum.
    #[must_use]
    pub const fn with_water(mut self, water: u32) -> Self {
        self.water = Some(water);
        self
    }

    /// Overrides the tool maximum.
    #[must_use]
    pub const fn with_tools(mut self, tools: u32) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Survivor waiting on a cell with a deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivorSpec {
    /// Entity identifier.
    pub id: u32,
    /// Starting cell.
    pub cell: CellCoord,
    /// Last tick the survivor can wait before dying.
    pub deadline: u64,
}

/// Complete initial state of a simulation.
///
/// Every list defaults to empty so a description only needs dimensions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDescription {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Seed of the world's random generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Tick budget after which the simulation stops.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Hazard dynamics.
    #[serde(default)]
    pub hazards: HazardTuning,
    /// Building footprints.
    #[serde(default)]
    pub buildings: Vec<BuildingSpec>,
    /// Depot landmarks.
    #[serde(default)]
    pub depots: Vec<CellCoord>,
    /// Hospital landmarks.
    #[serde(default)]
    pub hospitals: Vec<HospitalSpec>,
    /// Fires burning at tick zero.
    #[serde(default)]
    pub fires: Vec<FireSpec>,
    /// Rubble present at tick zero.
    #[serde(default)]
    pub rubble: Vec<CellCoord>,
    /// Agent placements.
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    /// Survivor placements.
    #[serde(default)]
    pub survivors: Vec<SurvivorSpec>,
}

impl MapDescription {
    /// Describes an empty grid with default seed, budget and hazard tuning.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            seed: DEFAULT_SEED,
            max_ticks: DEFAULT_MAX_TICKS,
            hazards: HazardTuning::default(),
            buildings: Vec::new(),
            depots: Vec::new(),
            hospitals: Vec::new(),
            fires: Vec::new(),
            rubble: Vec::new(),
            agents: Vec::new(),
            survivors: Vec::new(),
        }
    }

    /// Replaces the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replaces the tick budget.
    #[must_use]
    pub fn max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Replaces the hazard tuning.
    #[must_use]
    pub fn hazards(mut self, hazards: HazardTuning) -> Self {
        self.hazards = hazards;
        self
    }

    /// Adds a building.
    #[must_use]
    pub fn building(mut self, cell: CellCoord, resistance: f32) -> Self {
        self.buildings.push(BuildingSpec { cell, resistance });
        self
    }

    /// Adds a depot.
    #[must_use]
    pub fn depot(mut self, cell: CellCoord) -> Self {
        self.depots.push(cell);
        self
    }

    /// Adds a hospital.
    #[must_use]
    pub fn hospital(mut self, id: u32, cell: CellCoord, capacity: u32, service_rate: u32) -> Self {
        self.hospitals.push(HospitalSpec {
            id,
            cell,
            capacity,
            service_rate,
        });
        self
    }

    /// Adds a fire of intensity one.
    #[must_use]
    pub fn fire(mut self, cell: CellCoord) -> Self {
        self.fires.push(FireSpec {
            cell,
            intensity: default_intensity(),
        });
        self
    }

    /// Adds rubble.
    #[must_use]
    pub fn rubble(mut self, cell: CellCoord) -> Self {
        self.rubble.push(cell);
        self
    }

    /// Adds an agent.
    #[must_use]
    pub fn agent(mut self, spec: AgentSpec) -> Self {
        self.agents.push(spec);
        self
    }

    /// Adds a survivor.
    #[must_use]
    pub fn survivor(mut self, id: u32, cell: CellCoord, deadline: u64) -> Self {
        self.survivors.push(SurvivorSpec { id, cell, deadline });
        self
    }

    /// Checks every constraint without building a world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _ = self.build()?;
        Ok(())
    }

    pub(crate) fn build(&self) -> Result<Layout, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let cells = u64::from(self.width) * u64::from(self.height);
        let cells = match usize::try_from(cells) {
            Ok(count) if cells <= MAX_GRID_CELLS => count,
            _ => {
                return Err(ConfigError::GridTooLarge {
                    width: self.width,
                    height: self.height,
                })
            }
        };
        if self.max_ticks == 0 {
            return Err(ConfigError::ZeroTickBudget);
        }
        check_probability("spread_probability", self.hazards.spread_probability)?;
        check_probability("aftershock_probability", self.hazards.aftershock_probability)?;
        if !(1..=MAX_AFTERSHOCK_CELLS).contains(&self.hazards.max_aftershock_cells) {
            return Err(ConfigError::InvalidAftershockCells(
                self.hazards.max_aftershock_cells,
            ));
        }

        let mut grid = Grid::new(self.width, self.height, cells);
        let mut terrain_placed = BTreeSet::new();
        let mut place_terrain = |grid: &mut Grid, cell: CellCoord, terrain: Terrain| {
            if !grid.contains(cell) {
                return Err(ConfigError::OutOfBounds { cell });
            }
            if !terrain_placed.insert(cell) {
                return Err(ConfigError::OverlappingTerrain { cell });
            }
            grid.set_terrain(cell, terrain);
            Ok(())
        };

        for building in &self.buildings {
            if !(0.0..=1.0).contains(&building.resistance) {
                return Err(ConfigError::InvalidResistance {
                    cell: building.cell,
                    resistance: building.resistance,
                });
            }
            place_terrain(
                &mut grid,
                building.cell,
                Terrain::Building {
                    resistance: building.resistance,
                    damaged: false,
                },
            )?;
        }
        for depot in &self.depots {
            place_terrain(&mut grid, *depot, Terrain::Depot)?;
        }

        let mut triage = Triage::default();
        for spec in &self.hospitals {
            if spec.capacity == 0 {
                return Err(ConfigError::ZeroCapacity(spec.id));
            }
            if spec.service_rate == 0 {
                return Err(ConfigError::ZeroServiceRate(spec.id));
            }
            let id = HospitalId::new(spec.id);
            place_terrain(&mut grid, spec.cell, Terrain::Hospital(id))?;
            triage
                .insert(Hospital::new(id, spec.cell, spec.capacity, spec.service_rate))
                .map_err(|duplicate| ConfigError::DuplicateHospital(duplicate.get()))?;
        }

        let hazards = self
            .fires
            .iter()
            .map(|fire| {
                if !(1..=MAX_FIRE_INTENSITY).contains(&fire.intensity) {
                    return Err(ConfigError::InvalidIntensity {
                        cell: fire.cell,
                        intensity: fire.intensity,
                    });
                }
                Ok((
                    fire.cell,
                    Hazard::Fire {
                        intensity: fire.intensity,
                    },
                ))
            })
            .chain(self.rubble.iter().map(|cell| Ok((*cell, Hazard::Rubble))));
        for hazard in hazards {
            let (cell, hazard) = hazard?;
            let existing = grid
                .cell(cell)
                .copied()
                .ok_or(ConfigError::OutOfBounds { cell })?;
            if existing.terrain.is_landmark() {
                return Err(ConfigError::HazardOnLandmark { cell });
            }
            if existing.hazard != Hazard::None {
                return Err(ConfigError::OverlappingHazards { cell });
            }
            grid.set_hazard(cell, hazard);
        }

        let mut registry = Registry::default();
        let mut medic_cells = BTreeSet::new();
        for spec in &self.agents {
            let id = EntityId::new(spec.id);
            check_placement(&grid, id, spec.cell)?;
            let entity = agent_entity(id, spec)?;
            if spec.kind == AgentKind::Medic
                && !grid.terrain(spec.cell).map_or(false, |terrain| terrain.is_landmark())
                && !medic_cells.insert(spec.cell)
            {
                return Err(ConfigError::MedicsOverlap { cell: spec.cell });
            }
            registry
                .insert(id, entity)
                .map_err(ConfigError::DuplicateEntity)?;
        }
        for spec in &self.survivors {
            let id = EntityId::new(spec.id);
            check_placement(&grid, id, spec.cell)?;
            let survivor = Survivor {
                deadline: spec.deadline,
                state: SurvivorState::Waiting { cell: spec.cell },
            };
            registry
                .insert(id, Entity::Survivor(survivor))
                .map_err(ConfigError::DuplicateEntity)?;
        }

        Ok(Layout {
            grid,
            registry,
            triage,
        })
    }
}

/// Validated initial state assembled from a description.
pub(crate) struct Layout {
    pub(crate) grid: Grid,
    pub(crate) registry: Registry,
    pub(crate) triage: Triage,
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

fn check_placement(grid: &Grid, id: EntityId, cell: CellCoord) -> Result<(), ConfigError> {
    match grid.hazard(cell) {
        None => Err(ConfigError::OutOfBounds { cell }),
        Some(Hazard::Rubble) => Err(ConfigError::PlacedOnRubble { id, cell }),
        Some(_) => Ok(()),
    }
}

fn agent_entity(id: EntityId, spec: &AgentSpec) -> Result<Entity, ConfigError> {
    let not_applicable = |resource| ConfigError::ResourceNotApplicable { id, resource };
    let battery = spec.battery.unwrap_or(DEFAULT_BATTERY);
    match spec.kind {
        AgentKind::Drone => {
            if spec.water.is_some() {
                return Err(not_applicable("water"));
            }
            if spec.tools.is_some() {
                return Err(not_applicable("tools"));
            }
            Ok(Entity::Drone(Drone::new(spec.cell, battery)))
        }
        AgentKind::Truck => Ok(Entity::Truck(Truck::new(
            spec.cell,
            battery,
            spec.water.unwrap_or(DEFAULT_WATER),
            spec.tools.unwrap_or(DEFAULT_TOOLS),
        ))),
        AgentKind::Medic => {
            if spec.battery.is_some() {
                return Err(not_applicable("battery"));
            }
            if spec.water.is_some() {
                return Err(not_applicable("water"));
            }
            if spec.tools.is_some() {
                return Err(not_applicable("tools"));
            }
            Ok(Entity::Medic(Medic::new(spec.cell)))
        }
    }
}
