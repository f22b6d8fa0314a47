#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the crisis response engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. External planners submit
//! [`CommandRecord`] batches describing desired agent actions, the world
//! validates and executes them, and then broadcasts [`Event`] values that
//! systems fold into metrics deterministically. Consumers outside the tick
//! loop only ever observe owned [`WorldSnapshot`] values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest intensity a burning cell can reach.
pub const MAX_FIRE_INTENSITY: u8 = 3;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Serialized as a two element `[column, row]` array so map descriptions and
/// command scripts can write cells as `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Reports whether `other` shares an edge with this cell.
    ///
    /// The engine uses 4-connectivity throughout: diagonal cells are never
    /// adjacent.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Reports whether `other` is this cell or one of its 4-neighbours.
    #[must_use]
    pub fn is_within_reach(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) <= 1
    }
}

impl From<[u32; 2]> for CellCoord {
    fn from([column, row]: [u32; 2]) -> Self {
        Self::new(column, row)
    }
}

impl From<CellCoord> for [u32; 2] {
    fn from(cell: CellCoord) -> Self {
        [cell.column, cell.row]
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Unique identifier shared by agents and survivors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier assigned to a hospital.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HospitalId(u32);

impl HospitalId {
    /// Creates a new hospital identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Kinds of agents able to act on the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Aerial scout that burns battery quickly.
    Drone,
    /// Ground crew able to carry a single survivor.
    Medic,
    /// Fire truck carrying water and clearing tools.
    Truck,
}

impl AgentKind {
    /// Reports whether the agent can carry survivors.
    #[must_use]
    pub const fn is_carrier(self) -> bool {
        matches!(self, Self::Medic)
    }

    /// Reports whether the agent can extinguish fires.
    #[must_use]
    pub const fn is_extinguisher(self) -> bool {
        matches!(self, Self::Truck)
    }

    /// Reports whether the agent can clear rubble.
    #[must_use]
    pub const fn is_clearer(self) -> bool {
        matches!(self, Self::Truck)
    }

    /// Reports whether the agent replenishes resources at depots.
    #[must_use]
    pub const fn is_rechargeable(self) -> bool {
        matches!(self, Self::Drone | Self::Truck)
    }
}

/// Action kinds accepted on the command wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Step to an adjacent cell.
    Move,
    /// Pick up a waiting survivor.
    Rescue,
    /// Hand the carried survivor to a hospital.
    Deliver,
    /// Put out a burning cell.
    Extinguish,
    /// Remove rubble from a cell.
    Clear,
    /// Replenish resources at a depot.
    Recharge,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Move => "move",
            Self::Rescue => "rescue",
            Self::Deliver => "deliver",
            Self::Extinguish => "extinguish",
            Self::Clear => "clear",
            Self::Recharge => "recharge",
        };
        f.write_str(name)
    }
}

/// Target carried by a command record, either a cell or a numeric id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetRecord {
    /// Cell written as `[x, y]`.
    Cell(CellCoord),
    /// Entity or hospital identifier.
    Id(u32),
}

/// Untrusted command as produced by an external planner.
///
/// Records are parsed into typed [`Command`] values by the executor; a record
/// whose target does not fit its action is rejected rather than trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Identifier of the agent expected to act.
    pub agent_id: u32,
    /// Requested action.
    pub action: ActionKind,
    /// Optional action target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetRecord>,
}

impl CommandRecord {
    /// Builds a record targeting a cell.
    #[must_use]
    pub const fn at_cell(agent_id: u32, action: ActionKind, cell: CellCoord) -> Self {
        Self {
            agent_id,
            action,
            target: Some(TargetRecord::Cell(cell)),
        }
    }

    /// Builds a record targeting an identifier.
    #[must_use]
    pub const fn at_id(agent_id: u32, action: ActionKind, id: u32) -> Self {
        Self {
            agent_id,
            action,
            target: Some(TargetRecord::Id(id)),
        }
    }

    /// Builds a record without a target.
    #[must_use]
    pub const fn untargeted(agent_id: u32, action: ActionKind) -> Self {
        Self {
            agent_id,
            action,
            target: None,
        }
    }

    /// Agent identifier named by the record.
    #[must_use]
    pub const fn agent(&self) -> EntityId {
        EntityId::new(self.agent_id)
    }

    /// Converts the record into a typed command, validating its target shape.
    pub fn parse(&self) -> Result<Command, RejectionReason> {
        let action = match (self.action, self.target) {
            (ActionKind::Move, Some(TargetRecord::Cell(to))) => Action::Move { to },
            (ActionKind::Rescue, Some(TargetRecord::Id(id))) => Action::Rescue {
                survivor: EntityId::new(id),
            },
            (ActionKind::Deliver, Some(TargetRecord::Id(id))) => Action::Deliver {
                hospital: HospitalId::new(id),
            },
            (ActionKind::Extinguish, Some(TargetRecord::Cell(cell))) => {
                Action::Extinguish { cell }
            }
            (ActionKind::Clear, Some(TargetRecord::Cell(cell))) => Action::Clear { cell },
            (ActionKind::Recharge, None) => Action::Recharge,
            _ => return Err(RejectionReason::MalformedTarget),
        };

        Ok(Command {
            agent: self.agent(),
            action,
        })
    }
}

/// Typed action with the target its kind requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Step to a 4-adjacent cell.
    Move {
        /// Destination cell.
        to: CellCoord,
    },
    /// Pick up the survivor waiting on the medic's cell.
    Rescue {
        /// Survivor to pick up.
        survivor: EntityId,
    },
    /// Admit the carried survivor into a hospital's triage queue.
    Deliver {
        /// Receiving hospital.
        hospital: HospitalId,
    },
    /// Put out the fire burning on or next to the truck.
    Extinguish {
        /// Burning cell.
        cell: CellCoord,
    },
    /// Remove rubble lying on or next to the truck.
    Clear {
        /// Rubble cell.
        cell: CellCoord,
    },
    /// Refill every resource while standing on a depot.
    Recharge,
}

impl Action {
    /// Wire kind of the action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Move { .. } => ActionKind::Move,
            Self::Rescue { .. } => ActionKind::Rescue,
            Self::Deliver { .. } => ActionKind::Deliver,
            Self::Extinguish { .. } => ActionKind::Extinguish,
            Self::Clear { .. } => ActionKind::Clear,
            Self::Recharge => ActionKind::Recharge,
        }
    }
}

/// Parsed command naming the acting agent and its action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// Agent expected to act.
    pub agent: EntityId,
    /// Action to perform.
    pub action: Action,
}

/// Reasons a movement request may be blocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum MoveBlocked {
    /// Destination lies outside the grid.
    #[error("destination is out of bounds")]
    OutOfBounds,
    /// Destination does not share an edge with the current cell.
    #[error("destination is not adjacent")]
    NotAdjacent,
    /// Destination is covered by rubble.
    #[error("destination is blocked by rubble")]
    Rubble,
    /// Destination already holds an entity that cannot overlap.
    #[error("destination is occupied")]
    Occupied,
}

/// Reasons a command may be rejected by the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RejectionReason {
    /// The simulation already terminated.
    #[error("simulation has terminated")]
    SimulationTerminated,
    /// No entity carries the provided identifier.
    #[error("unknown agent")]
    UnknownAgent,
    /// The identifier names a survivor rather than an agent.
    #[error("entity is not an agent")]
    NotAnAgent,
    /// The agent lacks the capability the action needs.
    #[error("agent cannot perform this action")]
    Incapable,
    /// The target is missing or does not fit the action.
    #[error("target does not match the action")]
    MalformedTarget,
    /// The target cell lies outside the grid.
    #[error("target is out of bounds")]
    OutOfBounds,
    /// The target is not on or next to the agent.
    #[error("target is out of reach")]
    OutOfReach,
    /// The movement resolver refused the step.
    #[error("movement blocked: {0}")]
    Blocked(#[from] MoveBlocked),
    /// The agent has not earned enough movement tokens this tick.
    #[error("no movement allowance left this tick")]
    MovementSpent,
    /// The agent's battery is below the operating threshold.
    #[error("battery depleted")]
    Depleted,
    /// The truck does not hold enough water.
    #[error("insufficient water: {available} available, {required} required")]
    InsufficientWater {
        /// Water currently held.
        available: u32,
        /// Water the action needs.
        required: u32,
    },
    /// The truck does not hold enough tools.
    #[error("insufficient tools: {available} available, {required} required")]
    InsufficientTools {
        /// Tools currently held.
        available: u32,
        /// Tools the action needs.
        required: u32,
    },
    /// Recharging was requested away from a depot.
    #[error("agent is not on a depot")]
    NotOnDepot,
    /// No survivor carries the provided identifier.
    #[error("unknown survivor")]
    UnknownSurvivor,
    /// The survivor is not waiting for pickup.
    #[error("survivor is not waiting")]
    SurvivorUnavailable,
    /// The medic already carries a survivor.
    #[error("medic is already carrying a survivor")]
    AlreadyCarrying,
    /// The medic carries nobody.
    #[error("medic is not carrying a survivor")]
    NotCarrying,
    /// No hospital carries the provided identifier.
    #[error("unknown hospital")]
    UnknownHospital,
    /// The hospital triage queue is full.
    #[error("hospital queue is full")]
    HospitalFull,
    /// The target cell is not burning.
    #[error("no fire at target")]
    NoFire,
    /// The target cell holds no rubble.
    #[error("no rubble at target")]
    NoRubble,
}

/// Static terrain kind of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Terrain {
    /// Open ground.
    Empty,
    /// Structure resisting fire spread.
    Building {
        /// Fraction of spread probability the building resists, within `0..=1`.
        resistance: f32,
        /// Set once a fire on the building has been put out.
        damaged: bool,
    },
    /// Landmark where vehicles replenish resources.
    Depot,
    /// Landmark hosting a hospital's triage desk.
    Hospital(HospitalId),
}

impl Terrain {
    /// Reports whether the terrain is a landmark shared by any number of entities.
    #[must_use]
    pub const fn is_landmark(&self) -> bool {
        matches!(self, Self::Depot | Self::Hospital(_))
    }

    /// Reports whether fire can burn on the terrain.
    #[must_use]
    pub const fn is_flammable(&self) -> bool {
        matches!(self, Self::Empty | Self::Building { .. })
    }

    /// Fraction of fire spread resisted by the terrain.
    #[must_use]
    pub fn resistance(&self) -> f32 {
        match self {
            Self::Building { resistance, .. } => *resistance,
            _ => 0.0,
        }
    }
}

/// Blocking hazard lying on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hazard {
    /// No hazard.
    None,
    /// Collapsed debris blocking movement.
    Rubble,
    /// Active fire.
    Fire {
        /// Burning intensity within `1..=MAX_FIRE_INTENSITY`.
        intensity: u8,
    },
}

impl Hazard {
    /// Reports whether the hazard is an active fire.
    #[must_use]
    pub const fn is_fire(&self) -> bool {
        matches!(self, Self::Fire { .. })
    }

    /// Reports whether the hazard is rubble.
    #[must_use]
    pub const fn is_rubble(&self) -> bool {
        matches!(self, Self::Rubble)
    }
}

/// Terrain and hazard layers of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Static terrain.
    pub terrain: Terrain,
    /// Blocking hazard.
    pub hazard: Hazard,
}

impl Cell {
    /// Open ground without hazards.
    pub const EMPTY: Cell = Cell {
        terrain: Terrain::Empty,
        hazard: Hazard::None,
    };
}

/// Read-only view into the dense cell grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [Cell],
    columns: u32,
    rows: u32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Cell], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the cell stored at the coordinate, if it lies within the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&'a Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Reports whether the coordinate lies within the grid.
    #[must_use]
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.column() < self.columns && coord.row() < self.rows
    }

    /// Iterates every coordinate paired with its cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &'a Cell)> + 'a {
        let columns = self.columns.max(1) as usize;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let column = (index % columns) as u32;
            let row = u32::try_from(index / columns).unwrap_or(u32::MAX);
            (CellCoord::new(column, row), cell)
        })
    }

    /// Returns the in-bounds 4-neighbours of a cell in north, east, south, west order.
    pub fn neighbors(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> {
        let (columns, rows) = (self.columns, self.rows);
        let column = coord.column();
        let row = coord.row();
        [
            row.checked_sub(1).map(|row| CellCoord::new(column, row)),
            column
                .checked_add(1)
                .filter(|column| *column < columns)
                .map(|column| CellCoord::new(column, row)),
            row.checked_add(1)
                .filter(|row| *row < rows)
                .map(|row| CellCoord::new(column, row)),
            column.checked_sub(1).map(|column| CellCoord::new(column, row)),
        ]
        .into_iter()
        .flatten()
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.contains(coord) {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Lifecycle of a survivor.
///
/// A carried survivor stores its carrier instead of a position; queued and
/// delivered survivors are located at their hospital.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurvivorState {
    /// Waiting for pickup on a cell.
    Waiting {
        /// Cell the survivor waits on.
        cell: CellCoord,
    },
    /// Carried by a medic.
    Carried {
        /// Medic carrying the survivor.
        by: EntityId,
    },
    /// Admitted into a hospital triage queue.
    Queued {
        /// Hospital holding the survivor.
        hospital: HospitalId,
    },
    /// Served by a hospital. Terminal.
    Delivered {
        /// Hospital that served the survivor.
        hospital: HospitalId,
    },
    /// Deadline expired before delivery. Terminal.
    Dead {
        /// Cell where the survivor died.
        cell: CellCoord,
    },
}

impl SurvivorState {
    /// Reports whether the state is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered { .. } | Self::Dead { .. })
    }

    /// Reports whether the survivor's deadline still applies.
    #[must_use]
    pub const fn is_at_risk(&self) -> bool {
        matches!(self, Self::Waiting { .. } | Self::Carried { .. })
    }
}

/// Reasons the tick loop may stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Every survivor was delivered or died.
    AllSurvivorsResolved,
    /// Every agent is a depleted vehicle with no depot underneath.
    AgentsStranded,
    /// The configured tick budget ran out.
    TickLimit,
}

/// Lifecycle of a simulation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationStatus {
    /// Ticks may still be executed.
    Running,
    /// The simulation stopped for the provided reason.
    Terminated(TerminationReason),
}

impl SimulationStatus {
    /// Reports whether the simulation stopped.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Events broadcast by the world while processing a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a command passed validation and was applied.
    CommandAccepted {
        /// Acting agent.
        agent: EntityId,
        /// Applied action.
        action: ActionKind,
    },
    /// Reports that a command was rejected without mutating the world.
    CommandRejected {
        /// Agent named by the command.
        agent: EntityId,
        /// Requested action.
        action: ActionKind,
        /// Specific reason the command failed.
        reason: RejectionReason,
    },
    /// Confirms that an agent moved between two cells.
    AgentMoved {
        /// Agent that moved.
        agent: EntityId,
        /// Cell the agent occupied before moving.
        from: CellCoord,
        /// Cell the agent occupies after moving.
        to: CellCoord,
    },
    /// Reports resources spent by an action.
    ResourcesConsumed {
        /// Agent that spent the resources.
        agent: EntityId,
        /// Battery units spent.
        battery: u32,
        /// Water units spent.
        water: u32,
        /// Tools spent.
        tools: u32,
    },
    /// Confirms that an agent refilled its resources at a depot.
    AgentRecharged {
        /// Agent that recharged.
        agent: EntityId,
        /// Depot cell.
        cell: CellCoord,
    },
    /// Confirms that a medic picked up a survivor.
    SurvivorPickedUp {
        /// Survivor that was picked up.
        survivor: EntityId,
        /// Medic now carrying the survivor.
        medic: EntityId,
        /// Cell of the pickup.
        cell: CellCoord,
    },
    /// Confirms that a survivor joined a hospital triage queue.
    SurvivorAdmitted {
        /// Admitted survivor.
        survivor: EntityId,
        /// Receiving hospital.
        hospital: HospitalId,
        /// Medic that delivered the survivor.
        medic: EntityId,
    },
    /// Reports that a delivery was turned away because the queue was full.
    AdmissionOverflowed {
        /// Survivor that was turned away.
        survivor: EntityId,
        /// Hospital whose queue was full.
        hospital: HospitalId,
    },
    /// Confirms that a hospital served a queued survivor.
    SurvivorDelivered {
        /// Served survivor.
        survivor: EntityId,
        /// Serving hospital.
        hospital: HospitalId,
    },
    /// Reports that a survivor's deadline expired.
    SurvivorDied {
        /// Survivor that died.
        survivor: EntityId,
        /// Cell where the survivor died.
        cell: CellCoord,
    },
    /// Confirms that a truck put out a fire.
    FireExtinguished {
        /// Cell that stopped burning.
        cell: CellCoord,
        /// Truck that used the water.
        by: EntityId,
    },
    /// Confirms that a truck cleared rubble.
    RubbleCleared {
        /// Cell that was cleared.
        cell: CellCoord,
        /// Truck that used the tools.
        by: EntityId,
    },
    /// Reports that fire spread onto a cell.
    FireIgnited {
        /// Newly burning cell.
        cell: CellCoord,
    },
    /// Reports that an existing fire grew stronger.
    FireIntensified {
        /// Burning cell.
        cell: CellCoord,
        /// Intensity after the change.
        intensity: u8,
    },
    /// Reports that an aftershock collapsed cells into rubble.
    AftershockStruck {
        /// Cells that turned into rubble.
        cells: Vec<CellCoord>,
    },
    /// Indicates that the tick counter advanced.
    TickCompleted {
        /// Tick counter after the increment.
        tick: u64,
    },
    /// Announces that the simulation stopped.
    SimulationTerminated {
        /// Tick counter when the simulation stopped.
        tick: u64,
        /// Reason the simulation stopped.
        reason: TerminationReason,
    },
}

/// Current and maximum level of a depletable resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLevel {
    /// Units currently held.
    pub current: u32,
    /// Units held after a full recharge.
    pub max: u32,
}

/// Derived operating status of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Vehicle with enough battery to move.
    Ready,
    /// Vehicle whose battery fell below the operating threshold.
    Depleted,
    /// Medic with free hands.
    Available,
    /// Medic carrying the referenced survivor.
    Carrying(EntityId),
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: EntityId,
    /// Kind of agent.
    pub kind: AgentKind,
    /// Grid cell currently occupied by the agent.
    pub cell: CellCoord,
    /// Derived operating status.
    pub status: AgentStatus,
    /// Movement tokens available for the rest of the tick.
    pub move_tokens: u8,
    /// Battery level, for vehicles.
    pub battery: Option<ResourceLevel>,
    /// Water level, for trucks.
    pub water: Option<ResourceLevel>,
    /// Tool count, for trucks.
    pub tools: Option<ResourceLevel>,
}

/// Immutable representation of a single survivor's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivorSnapshot {
    /// Unique identifier assigned to the survivor.
    pub id: EntityId,
    /// Lifecycle state.
    pub state: SurvivorState,
    /// Resolved location: the carrier's cell while carried, the hospital cell once admitted.
    pub cell: CellCoord,
    /// Last tick the survivor can wait before dying.
    pub deadline: u64,
}

/// Immutable representation of a hospital used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalSnapshot {
    /// Unique identifier assigned to the hospital.
    pub id: HospitalId,
    /// Landmark cell of the hospital.
    pub cell: CellCoord,
    /// Maximum queue length.
    pub capacity: u32,
    /// Survivors served per tick.
    pub service_rate: u32,
    /// Survivors waiting for service, front first.
    pub queue: Vec<EntityId>,
    /// Survivors turned away since the start of the run.
    pub overflow_count: u64,
}

/// Owned snapshot of the whole world emitted once per tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of completed ticks.
    pub tick: u64,
    /// Lifecycle of the simulation.
    pub status: SimulationStatus,
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Row-major terrain and hazard layers.
    pub cells: Vec<Cell>,
    /// Agents sorted by identifier.
    pub agents: Vec<AgentSnapshot>,
    /// Survivors sorted by identifier.
    pub survivors: Vec<SurvivorSnapshot>,
    /// Hospitals sorted by identifier.
    pub hospitals: Vec<HospitalSnapshot>,
}

impl WorldSnapshot {
    /// Read-only grid view over the captured cells.
    #[must_use]
    pub fn grid(&self) -> GridView<'_> {
        GridView::new(&self.cells, self.width, self.height)
    }

    /// Returns the captured cell at the coordinate.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.grid().cell(coord)
    }

    /// Looks up an agent by identifier.
    #[must_use]
    pub fn agent(&self, id: EntityId) -> Option<&AgentSnapshot> {
        self.agents
            .binary_search_by_key(&id, |agent| agent.id)
            .ok()
            .map(|index| &self.agents[index])
    }

    /// Looks up a survivor by identifier.
    #[must_use]
    pub fn survivor(&self, id: EntityId) -> Option<&SurvivorSnapshot> {
        self.survivors
            .binary_search_by_key(&id, |survivor| survivor.id)
            .ok()
            .map(|index| &self.survivors[index])
    }

    /// Looks up a hospital by identifier.
    #[must_use]
    pub fn hospital(&self, id: HospitalId) -> Option<&HospitalSnapshot> {
        self.hospitals
            .binary_search_by_key(&id, |hospital| hospital.id)
            .ok()
            .map(|index| &self.hospitals[index])
    }

    /// Counts burning cells.
    #[must_use]
    pub fn burning_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.hazard.is_fire()).count()
    }

    /// Counts rubble cells.
    #[must_use]
    pub fn rubble_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.hazard.is_rubble())
            .count()
    }
}

/// Counters derived from the events of a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricsDelta {
    /// Survivors served by a hospital.
    pub rescued: u32,
    /// Survivors picked up by medics.
    pub pickups: u32,
    /// Survivors whose deadline expired.
    pub deaths: u32,
    /// Fires put out by trucks.
    pub fires_extinguished: u32,
    /// Cells that caught fire through spread.
    pub fires_ignited: u32,
    /// Rubble cells cleared by trucks.
    pub rubble_cleared: u32,
    /// Rubble cells created by aftershocks.
    pub rubble_created: u32,
    /// Aftershocks that struck.
    pub aftershocks: u32,
    /// Battery units spent.
    pub battery_used: u32,
    /// Water units spent.
    pub water_used: u32,
    /// Tools spent.
    pub tools_used: u32,
    /// Commands applied.
    pub commands_accepted: u32,
    /// Commands rejected.
    pub commands_rejected: u32,
    /// Deliveries turned away by full hospitals.
    pub overflow_events: u32,
}

/// Running totals accumulated from successive [`MetricsDelta`] values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricsTotals {
    /// Number of absorbed deltas.
    pub ticks: u64,
    /// Summed counters.
    pub counters: MetricsDelta,
    /// Sum over every served survivor of the ticks elapsed when it was served.
    pub rescue_ticks: u64,
}

impl MetricsTotals {
    /// Adds a tick's delta to the totals.
    pub fn absorb(&mut self, delta: &MetricsDelta) {
        let totals = &mut self.counters;
        totals.rescued += delta.rescued;
        totals.pickups += delta.pickups;
        totals.deaths += delta.deaths;
        totals.fires_extinguished += delta.fires_extinguished;
        totals.fires_ignited += delta.fires_ignited;
        totals.rubble_cleared += delta.rubble_cleared;
        totals.rubble_created += delta.rubble_created;
        totals.aftershocks += delta.aftershocks;
        totals.battery_used += delta.battery_used;
        totals.water_used += delta.water_used;
        totals.tools_used += delta.tools_used;
        totals.commands_accepted += delta.commands_accepted;
        totals.commands_rejected += delta.commands_rejected;
        totals.overflow_events += delta.overflow_events;
        self.ticks += 1;
        self.rescue_ticks += u64::from(delta.rescued) * self.ticks;
    }

    /// Mean number of ticks from the start of the run until a survivor was
    /// served, or zero when nobody was served.
    #[must_use]
    pub fn average_rescue_time(&self) -> f64 {
        if self.counters.rescued == 0 {
            return 0.0;
        }
        self.rescue_ticks as f64 / f64::from(self.counters.rescued)
    }

    /// Percentage of survivors served, or zero without survivors.
    #[must_use]
    pub fn success_rate(&self, total_survivors: usize) -> f64 {
        if total_survivors == 0 {
            return 0.0;
        }
        f64::from(self.counters.rescued) / total_survivors as f64 * 100.0
    }
}
