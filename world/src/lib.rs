#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the crisis response engine.
//!
//! The world owns the grid, every entity, the hospitals and the seeded
//! generator. It is mutated only through [`apply`], [`execute`] and the tick
//! phase functions, each of which reports what changed as [`Event`] values.
//! Read access goes through [`query`].

mod config;
mod executor;
mod grid;
mod movement;
mod registry;
mod resources;
mod triage;

use crisis_response_core::{
    CellCoord, CommandRecord, EntityId, Event, Hazard, RejectionReason, SimulationStatus,
    SurvivorState, Terrain, TerminationReason,
};
use crisis_response_system_hazards::{HazardChange, HazardEngine};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use config::{
    AgentSpec, BuildingSpec, ConfigError, FireSpec, HospitalSpec, MapDescription, SurvivorSpec,
    MAX_GRID_CELLS,
};
pub use crisis_response_system_hazards::{HazardTuning, MAX_AFTERSHOCK_CELLS};

use grid::Grid;
use registry::{Entity, Registry};
use triage::Triage;

/// Represents the authoritative crisis response world state.
#[derive(Debug)]
pub struct World {
    tick: u64,
    max_ticks: u64,
    status: SimulationStatus,
    grid: Grid,
    registry: Registry,
    triage: Triage,
    hazards: HazardEngine,
    changes: Vec<HazardChange>,
    rng: ChaCha8Rng,
}

impl World {
    /// Builds a world at tick zero from a validated map description.
    pub fn from_description(description: &MapDescription) -> Result<Self, ConfigError> {
        let layout = description.build()?;
        Ok(Self {
            tick: 0,
            max_ticks: description.max_ticks,
            status: SimulationStatus::Running,
            grid: layout.grid,
            registry: layout.registry,
            triage: layout.triage,
            hazards: HazardEngine::new(description.hazards),
            changes: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(description.seed),
        })
    }
}

/// Validates a single command record and applies it atomically.
///
/// Exactly one of [`Event::CommandAccepted`] or [`Event::CommandRejected`] is
/// emitted, followed by the events describing the command's effects.
pub fn apply(world: &mut World, record: &CommandRecord, out_events: &mut Vec<Event>) {
    let agent = record.agent();
    let action = record.action;
    let mut effects = Vec::new();
    let outcome = if world.status.is_terminated() {
        Err(RejectionReason::SimulationTerminated)
    } else {
        record
            .parse()
            .and_then(|command| executor::perform(world, command, &mut effects))
    };

    match outcome {
        Ok(()) => out_events.push(Event::CommandAccepted { agent, action }),
        Err(reason) => {
            tracing::debug!(agent = %agent, action = %action, %reason, "command rejected");
            out_events.push(Event::CommandRejected {
                agent,
                action,
                reason,
            });
        }
    }
    out_events.append(&mut effects);
}

/// Applies a batch in ascending agent order; records naming the same agent
/// keep their submission order.
pub fn execute(world: &mut World, batch: &[CommandRecord], out_events: &mut Vec<Event>) {
    let mut ordered: Vec<&CommandRecord> = batch.iter().collect();
    ordered.sort_by_key(|record| record.agent_id);
    for record in ordered {
        apply(world, record, out_events);
    }
}

/// Grants every mover its movement token for the tick.
pub fn begin_tick(world: &mut World) {
    if world.status.is_terminated() {
        return;
    }
    for (_, entity) in world.registry.iter_mut() {
        let cap = movement::step_cost(entity);
        if let Some(tokens) = entity.tokens_mut() {
            tokens.earn(cap);
        }
    }
}

/// Advances fire and aftershocks by one generation.
pub fn advance_hazards(world: &mut World, out_events: &mut Vec<Event>) {
    if world.status.is_terminated() {
        return;
    }

    let occupied = world.registry.occupied_cells();
    world.changes.clear();
    world.hazards.advance(
        world.grid.view(),
        |cell| occupied.contains(&cell),
        &mut world.rng,
        &mut world.changes,
    );

    let mut collapsed = Vec::new();
    for change in &world.changes {
        match *change {
            HazardChange::Ignite(cell) => {
                world.grid.set_hazard(cell, Hazard::Fire { intensity: 1 });
                tracing::debug!(%cell, "fire spread");
                out_events.push(Event::FireIgnited { cell });
            }
            HazardChange::Intensify { cell, intensity } => {
                world.grid.set_hazard(cell, Hazard::Fire { intensity });
                out_events.push(Event::FireIntensified { cell, intensity });
            }
            HazardChange::Collapse(cell) => {
                world.grid.set_hazard(cell, Hazard::Rubble);
                collapsed.push(cell);
            }
        }
    }

    if !collapsed.is_empty() {
        tracing::info!(tick = world.tick, cells = collapsed.len(), "aftershock struck");
        out_events.push(Event::AftershockStruck { cells: collapsed });
    }
}

/// Serves the front of every hospital queue.
pub fn drain_triage(world: &mut World, out_events: &mut Vec<Event>) {
    if world.status.is_terminated() {
        return;
    }

    let mut served = Vec::new();
    world.triage.drain_all(&mut served);
    for (survivor, hospital) in served {
        if let Some(found) = world.registry.survivor_mut(survivor) {
            found.state = SurvivorState::Delivered { hospital };
        }
        tracing::info!(survivor = %survivor, hospital = hospital.get(), "survivor delivered");
        out_events.push(Event::SurvivorDelivered { survivor, hospital });
    }
}

/// Kills every waiting or carried survivor whose deadline lies before the
/// current tick. Carriers drop the body where they stand.
pub fn resolve_deadlines(world: &mut World, out_events: &mut Vec<Event>) {
    if world.status.is_terminated() {
        return;
    }

    let tick = world.tick;
    let expired: Vec<(EntityId, SurvivorState)> = world
        .registry
        .survivors()
        .filter(|(_, survivor)| survivor.state.is_at_risk() && survivor.deadline < tick)
        .map(|(id, survivor)| (id, survivor.state))
        .collect();

    for (survivor, state) in expired {
        let cell = match state {
            SurvivorState::Waiting { cell } => cell,
            SurvivorState::Carried { by } => {
                let Some(carrier) = world.registry.get_mut(by) else {
                    continue;
                };
                executor::end_carry(carrier);
                match carrier.agent_cell() {
                    Some(cell) => cell,
                    None => continue,
                }
            }
            SurvivorState::Queued { .. }
            | SurvivorState::Delivered { .. }
            | SurvivorState::Dead { .. } => continue,
        };

        if let Some(found) = world.registry.survivor_mut(survivor) {
            found.state = SurvivorState::Dead { cell };
        }
        tracing::info!(survivor = %survivor, %cell, tick, "survivor died");
        out_events.push(Event::SurvivorDied { survivor, cell });
    }
}

/// Advances the tick counter and stops the simulation when a termination
/// condition holds.
pub fn conclude_tick(world: &mut World, out_events: &mut Vec<Event>) {
    if world.status.is_terminated() {
        return;
    }

    world.tick = world.tick.saturating_add(1);
    out_events.push(Event::TickCompleted { tick: world.tick });

    if let Some(reason) = termination(world) {
        world.status = SimulationStatus::Terminated(reason);
        tracing::info!(tick = world.tick, ?reason, "simulation terminated");
        out_events.push(Event::SimulationTerminated {
            tick: world.tick,
            reason,
        });
    }
}

fn termination(world: &World) -> Option<TerminationReason> {
    let mut survivors = world.registry.survivors().peekable();
    let has_survivors = survivors.peek().is_some();
    if has_survivors && survivors.all(|(_, survivor)| survivor.state.is_terminal()) {
        return Some(TerminationReason::AllSurvivorsResolved);
    }

    let mut agents = world
        .registry
        .iter()
        .filter(|(_, entity)| entity.agent_kind().is_some())
        .peekable();
    let has_agents = agents.peek().is_some();
    if has_agents && agents.all(|(_, entity)| is_stranded(&world.grid, entity)) {
        return Some(TerminationReason::AgentsStranded);
    }

    if world.tick >= world.max_ticks {
        return Some(TerminationReason::TickLimit);
    }
    None
}

fn is_stranded(grid: &Grid, entity: &Entity) -> bool {
    let depleted = entity
        .battery()
        .map_or(false, |battery| battery.is_depleted());
    let on_depot = entity
        .agent_cell()
        .and_then(|cell| grid.terrain(cell))
        .map_or(false, |terrain| terrain == Terrain::Depot);
    depleted && !on_depot
}

fn survivor_cell(world: &World, state: SurvivorState) -> Option<CellCoord> {
    match state {
        SurvivorState::Waiting { cell } | SurvivorState::Dead { cell } => Some(cell),
        SurvivorState::Carried { by } => world.registry.get(by)?.agent_cell(),
        SurvivorState::Queued { hospital } | SurvivorState::Delivered { hospital } => {
            world.triage.get(hospital).map(|found| found.cell())
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use crisis_response_core::{GridView, SimulationStatus, SurvivorSnapshot, WorldSnapshot};
    use super::{survivor_cell, HazardTuning, World};

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Tick budget of the run.
    #[must_use]
    pub fn max_ticks(world: &World) -> u64 {
        world.max_ticks
    }

    /// Lifecycle of the simulation.
    #[must_use]
    pub fn status(world: &World) -> SimulationStatus {
        world.status
    }

    /// Read-only view of the terrain and hazard layers.
    #[must_use]
    pub fn grid(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Hazard tuning the world was created with.
    #[must_use]
    pub fn hazard_tuning(world: &World) -> &HazardTuning {
        world.hazards.tuning()
    }

    /// Number of agents and survivors. Entities are never removed.
    #[must_use]
    pub fn entity_count(world: &World) -> usize {
        world.registry.len()
    }

    /// Number of survivors in any state.
    #[must_use]
    pub fn survivor_count(world: &World) -> usize {
        world.registry.survivors().count()
    }

    /// Captures an owned snapshot of the whole world.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        let (width, height) = world.grid.dimensions();
        let agents = world
            .registry
            .iter()
            .filter_map(|(id, entity)| entity.snapshot(id))
            .collect();
        let survivors = world
            .registry
            .survivors()
            .filter_map(|(id, survivor)| {
                Some(SurvivorSnapshot {
                    id,
                    state: survivor.state,
                    cell: survivor_cell(world, survivor.state)?,
                    deadline: survivor.deadline,
                })
            })
            .collect();

        WorldSnapshot {
            tick: world.tick,
            status: world.status,
            width,
            height,
            cells: world.grid.cells().to_vec(),
            agents,
            survivors,
            hospitals: world.triage.iter().map(|hospital| hospital.snapshot()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisis_response_core::{ActionKind, AgentKind, AgentStatus, HospitalId};

    fn cell(column: u32, row: u32) -> CellCoord {
        CellCoord::new(column, row)
    }

    fn world(description: MapDescription) -> World {
        World::from_description(&description.hazards(HazardTuning::calm()))
            .expect("valid description")
    }

    fn tick(world: &mut World, batch: &[CommandRecord]) -> Vec<Event> {
        let mut events = Vec::new();
        begin_tick(world);
        execute(world, batch, &mut events);
        advance_hazards(world, &mut events);
        drain_triage(world, &mut events);
        resolve_deadlines(world, &mut events);
        conclude_tick(world, &mut events);
        events
    }

    fn rejections(events: &[Event]) -> Vec<RejectionReason> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::CommandRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rejected_commands_leave_the_world_untouched() {
        let mut world = world(
            MapDescription::new(3, 3)
                .agent(AgentSpec::new(1, AgentKind::Drone, cell(0, 0)))
                .survivor(5, cell(2, 2), 100),
        );
        begin_tick(&mut world);
        let before = query::snapshot(&world);

        let mut events = Vec::new();
        execute(
            &mut world,
            &[
                CommandRecord::at_cell(1, ActionKind::Move, cell(1, 1)),
                CommandRecord::at_id(1, ActionKind::Rescue, 5),
                CommandRecord::at_cell(5, ActionKind::Move, cell(2, 1)),
                CommandRecord::at_cell(9, ActionKind::Move, cell(0, 1)),
                CommandRecord::untargeted(1, ActionKind::Move),
            ],
            &mut events,
        );

        assert_eq!(query::snapshot(&world), before);
        assert_eq!(
            rejections(&events),
            vec![
                RejectionReason::Blocked(crisis_response_core::MoveBlocked::NotAdjacent),
                RejectionReason::Incapable,
                RejectionReason::MalformedTarget,
                RejectionReason::NotAnAgent,
                RejectionReason::UnknownAgent,
            ]
        );
    }

    #[test]
    fn carrying_medics_move_every_other_tick() {
        let mut world = world(
            MapDescription::new(5, 1)
                .agent(AgentSpec::new(1, AgentKind::Medic, cell(0, 0)))
                .survivor(2, cell(0, 0), 100),
        );
        let rescue = [CommandRecord::at_id(1, ActionKind::Rescue, 2)];
        assert!(rejections(&tick(&mut world, &rescue)).is_empty());

        let step = |to| [CommandRecord::at_cell(1, ActionKind::Move, to)];
        assert!(rejections(&tick(&mut world, &step(cell(1, 0)))).is_empty());
        assert_eq!(
            rejections(&tick(&mut world, &step(cell(2, 0)))),
            vec![RejectionReason::MovementSpent]
        );
        assert!(rejections(&tick(&mut world, &step(cell(2, 0)))).is_empty());

        let snapshot = query::snapshot(&world);
        let survivor = snapshot.survivor(EntityId::new(2)).expect("survivor");
        assert_eq!(survivor.cell, cell(2, 0));
        assert_eq!(
            snapshot.agent(EntityId::new(1)).map(|agent| agent.status),
            Some(AgentStatus::Carrying(EntityId::new(2)))
        );
    }

    #[test]
    fn expired_carried_survivor_is_dropped_where_the_medic_stands() {
        let mut world = world(
            MapDescription::new(3, 1)
                .agent(AgentSpec::new(1, AgentKind::Medic, cell(1, 0)))
                .survivor(2, cell(1, 0), 0),
        );
        let events = tick(&mut world, &[CommandRecord::at_id(1, ActionKind::Rescue, 2)]);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::SurvivorDied { .. })));

        let events = tick(&mut world, &[]);
        assert!(events.contains(&Event::SurvivorDied {
            survivor: EntityId::new(2),
            cell: cell(1, 0),
        }));
        assert!(events.contains(&Event::SimulationTerminated {
            tick: 2,
            reason: TerminationReason::AllSurvivorsResolved,
        }));

        let snapshot = query::snapshot(&world);
        assert_eq!(
            snapshot.agent(EntityId::new(1)).map(|agent| agent.status),
            Some(AgentStatus::Available)
        );
    }

    #[test]
    fn overflowing_delivery_keeps_the_survivor_carried() {
        let mut world = world(
            MapDescription::new(2, 2)
                .hospital(1, cell(0, 0), 1, 1)
                .agent(AgentSpec::new(1, AgentKind::Medic, cell(1, 0)))
                .agent(AgentSpec::new(2, AgentKind::Medic, cell(0, 1)))
                .survivor(3, cell(1, 0), 100)
                .survivor(4, cell(0, 1), 100),
        );
        let _ = tick(
            &mut world,
            &[
                CommandRecord::at_id(1, ActionKind::Rescue, 3),
                CommandRecord::at_id(2, ActionKind::Rescue, 4),
            ],
        );

        let events = tick(
            &mut world,
            &[
                CommandRecord::at_id(2, ActionKind::Deliver, 1),
                CommandRecord::at_id(1, ActionKind::Deliver, 1),
            ],
        );
        assert_eq!(rejections(&events), vec![RejectionReason::HospitalFull]);
        assert!(events.contains(&Event::AdmissionOverflowed {
            survivor: EntityId::new(4),
            hospital: HospitalId::new(1),
        }));

        let snapshot = query::snapshot(&world);
        let hospital = snapshot.hospital(HospitalId::new(1)).expect("hospital");
        assert_eq!(hospital.overflow_count, 1);
        assert!(hospital.queue.is_empty());
        assert_eq!(
            snapshot.survivor(EntityId::new(3)).map(|survivor| survivor.state),
            Some(SurvivorState::Delivered {
                hospital: HospitalId::new(1)
            })
        );
        assert_eq!(
            snapshot.survivor(EntityId::new(4)).map(|survivor| survivor.state),
            Some(SurvivorState::Carried {
                by: EntityId::new(2)
            })
        );
    }

    #[test]
    fn stranded_vehicles_end_the_run() {
        let mut world = world(
            MapDescription::new(3, 1)
                .agent(AgentSpec::new(1, AgentKind::Drone, cell(0, 0)).with_battery(4))
                .survivor(2, cell(2, 0), 100),
        );
        let events = tick(&mut world, &[CommandRecord::at_cell(1, ActionKind::Move, cell(1, 0))]);
        assert!(rejections(&events).is_empty());
        assert_eq!(query::status(&world), SimulationStatus::Running);

        let events = tick(&mut world, &[CommandRecord::at_cell(1, ActionKind::Move, cell(0, 0))]);
        assert!(rejections(&events).is_empty());
        assert_eq!(
            query::status(&world),
            SimulationStatus::Terminated(TerminationReason::AgentsStranded)
        );
    }

    #[test]
    fn terminated_world_rejects_everything() {
        let mut world = world(
            MapDescription::new(2, 1)
                .max_ticks(1)
                .agent(AgentSpec::new(1, AgentKind::Truck, cell(0, 0))),
        );
        let _ = tick(&mut world, &[]);
        assert_eq!(
            query::status(&world),
            SimulationStatus::Terminated(TerminationReason::TickLimit)
        );

        let before = query::snapshot(&world);
        let events = tick(&mut world, &[CommandRecord::at_cell(1, ActionKind::Move, cell(1, 0))]);
        assert_eq!(
            events,
            vec![Event::CommandRejected {
                agent: EntityId::new(1),
                action: ActionKind::Move,
                reason: RejectionReason::SimulationTerminated,
            }]
        );
        assert_eq!(query::snapshot(&world), before);
    }
}
