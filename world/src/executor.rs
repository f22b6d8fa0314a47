//! Validation and atomic application of typed agent commands.
//!
//! Every handler checks all of its preconditions before touching state, so a
//! rejected command leaves the world exactly as it found it. The only
//! exception is an overflowing delivery, which records the overflow on the
//! hospital while the command itself is rejected.

use crisis_response_core::{
    Action, CellCoord, Command, EntityId, Event, Hazard, HospitalId, RejectionReason,
    SurvivorState,
};

use crate::{
    movement::{can_move, step_cost},
    registry::Entity,
    resources::{affordable, consume, recharge, Activity, Consumption},
    World,
};

/// Applies a parsed command, pushing the events of its effects into `effects`.
pub(crate) fn perform(
    world: &mut World,
    command: Command,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let agent = command.agent;
    match world.registry.get(agent) {
        None => return Err(RejectionReason::UnknownAgent),
        Some(Entity::Survivor(_)) => return Err(RejectionReason::NotAnAgent),
        Some(_) => {}
    }

    match command.action {
        Action::Move { to } => move_agent(world, agent, to, effects),
        Action::Rescue { survivor } => rescue(world, agent, survivor, effects),
        Action::Deliver { hospital } => deliver(world, agent, hospital, effects),
        Action::Extinguish { cell } => extinguish(world, agent, cell, effects),
        Action::Clear { cell } => clear(world, agent, cell, effects),
        Action::Recharge => recharge_agent(world, agent, effects),
    }
}

fn move_agent(
    world: &mut World,
    agent: EntityId,
    to: CellCoord,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let entity = world
        .registry
        .get(agent)
        .ok_or(RejectionReason::UnknownAgent)?;
    let from = entity.agent_cell().ok_or(RejectionReason::NotAnAgent)?;
    let cost = can_move(&world.grid, &world.registry, agent, entity, from, to)?;
    let available = entity.tokens().map_or(0, |tokens| tokens.get());
    if available < cost {
        return Err(RejectionReason::MovementSpent);
    }
    let _ = affordable(entity, Activity::Move)?;

    let entity = world
        .registry
        .get_mut(agent)
        .ok_or(RejectionReason::UnknownAgent)?;
    let consumption = consume(entity, Activity::Move)?;
    if let Some(tokens) = entity.tokens_mut() {
        let spent = tokens.spend(cost);
        debug_assert!(spent, "tokens were checked before spending");
    }
    entity.set_agent_cell(to);

    effects.push(Event::AgentMoved { agent, from, to });
    report_consumption(agent, consumption, effects);
    Ok(())
}

fn rescue(
    world: &mut World,
    agent: EntityId,
    survivor: EntityId,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let medic_cell = match world.registry.get(agent) {
        Some(Entity::Medic(medic)) if medic.carrying.is_some() => {
            return Err(RejectionReason::AlreadyCarrying)
        }
        Some(Entity::Medic(medic)) => medic.cell,
        Some(_) => return Err(RejectionReason::Incapable),
        None => return Err(RejectionReason::UnknownAgent),
    };

    let waiting_at = match world.registry.survivor(survivor) {
        None => return Err(RejectionReason::UnknownSurvivor),
        Some(found) => match found.state {
            SurvivorState::Waiting { cell } => cell,
            _ => return Err(RejectionReason::SurvivorUnavailable),
        },
    };
    if waiting_at != medic_cell {
        return Err(RejectionReason::OutOfReach);
    }

    if let Some(found) = world.registry.survivor_mut(survivor) {
        found.state = SurvivorState::Carried { by: agent };
    }
    if let Some(medic) = world.registry.medic_mut(agent) {
        medic.carrying = Some(survivor);
    }

    effects.push(Event::SurvivorPickedUp {
        survivor,
        medic: agent,
        cell: medic_cell,
    });
    Ok(())
}

fn deliver(
    world: &mut World,
    agent: EntityId,
    hospital: HospitalId,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let (medic_cell, survivor) = match world.registry.get(agent) {
        Some(Entity::Medic(medic)) => (
            medic.cell,
            medic.carrying.ok_or(RejectionReason::NotCarrying)?,
        ),
        Some(_) => return Err(RejectionReason::Incapable),
        None => return Err(RejectionReason::UnknownAgent),
    };
    debug_assert!(
        matches!(
            world.registry.survivor(survivor).map(|found| found.state),
            Some(SurvivorState::Carried { by }) if by == agent
        ),
        "carried survivor must reference its carrier"
    );

    let target = world
        .triage
        .get_mut(hospital)
        .ok_or(RejectionReason::UnknownHospital)?;
    if !medic_cell.is_within_reach(target.cell()) {
        return Err(RejectionReason::OutOfReach);
    }

    if let Err(overflow) = target.admit(survivor) {
        tracing::info!(
            hospital = hospital.get(),
            survivor = %survivor,
            overflow_count = overflow.overflow_count,
            "hospital queue full"
        );
        effects.push(Event::AdmissionOverflowed { survivor, hospital });
        return Err(RejectionReason::HospitalFull);
    }

    if let Some(found) = world.registry.survivor_mut(survivor) {
        found.state = SurvivorState::Queued { hospital };
    }
    if let Some(entity) = world.registry.get_mut(agent) {
        end_carry(entity);
    }

    effects.push(Event::SurvivorAdmitted {
        survivor,
        hospital,
        medic: agent,
    });
    Ok(())
}

fn extinguish(
    world: &mut World,
    agent: EntityId,
    cell: CellCoord,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let entity = world
        .registry
        .get_mut(agent)
        .ok_or(RejectionReason::UnknownAgent)?;
    check_target(entity, cell, |kind| kind.is_extinguisher())?;
    if !world.grid.contains(cell) {
        return Err(RejectionReason::OutOfBounds);
    }
    if !world
        .grid
        .hazard(cell)
        .map_or(false, |hazard| hazard.is_fire())
    {
        return Err(RejectionReason::NoFire);
    }

    let consumption = consume(entity, Activity::Extinguish)?;
    let extinguished = world.grid.extinguish(cell);
    debug_assert!(extinguished, "fire was checked before extinguishing");

    report_consumption(agent, consumption, effects);
    effects.push(Event::FireExtinguished { cell, by: agent });
    Ok(())
}

fn clear(
    world: &mut World,
    agent: EntityId,
    cell: CellCoord,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let entity = world
        .registry
        .get_mut(agent)
        .ok_or(RejectionReason::UnknownAgent)?;
    check_target(entity, cell, |kind| kind.is_clearer())?;
    if !world.grid.contains(cell) {
        return Err(RejectionReason::OutOfBounds);
    }
    if world.grid.hazard(cell) != Some(Hazard::Rubble) {
        return Err(RejectionReason::NoRubble);
    }

    let consumption = consume(entity, Activity::Clear)?;
    let cleared = world.grid.clear_rubble(cell);
    debug_assert!(cleared, "rubble was checked before clearing");

    report_consumption(agent, consumption, effects);
    effects.push(Event::RubbleCleared { cell, by: agent });
    Ok(())
}

fn recharge_agent(
    world: &mut World,
    agent: EntityId,
    effects: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let entity = world
        .registry
        .get_mut(agent)
        .ok_or(RejectionReason::UnknownAgent)?;
    let cell = entity.agent_cell().ok_or(RejectionReason::NotAnAgent)?;
    let terrain = world
        .grid
        .terrain(cell)
        .ok_or(RejectionReason::OutOfBounds)?;
    recharge(entity, terrain)?;

    effects.push(Event::AgentRecharged { agent, cell });
    Ok(())
}

/// Drops the medic's survivor reference and trims banked tokens to the cost
/// of an unburdened step.
pub(crate) fn end_carry(entity: &mut Entity) {
    if let Entity::Medic(medic) = entity {
        medic.carrying = None;
    }
    let cap = step_cost(entity);
    if let Some(tokens) = entity.tokens_mut() {
        tokens.clamp(cap);
    }
}

fn check_target(
    entity: &Entity,
    cell: CellCoord,
    capable: impl Fn(crisis_response_core::AgentKind) -> bool,
) -> Result<(), RejectionReason> {
    let kind = entity.agent_kind().ok_or(RejectionReason::NotAnAgent)?;
    if !capable(kind) {
        return Err(RejectionReason::Incapable);
    }
    let position = entity.agent_cell().ok_or(RejectionReason::NotAnAgent)?;
    if !position.is_within_reach(cell) {
        return Err(RejectionReason::OutOfReach);
    }
    Ok(())
}

fn report_consumption(agent: EntityId, consumption: Consumption, effects: &mut Vec<Event>) {
    if consumption.is_empty() {
        return;
    }
    effects.push(Event::ResourcesConsumed {
        agent,
        battery: consumption.battery,
        water: consumption.water,
        tools: consumption.tools,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{query, AgentSpec, MapDescription};
    use crisis_response_core::{
        ActionKind, AgentKind, AgentStatus, CommandRecord, ResourceLevel,
    };
    use crisis_response_system_hazards::HazardTuning;

    fn truck_world() -> World {
        let description = MapDescription::new(4, 1)
            .hazards(HazardTuning::calm())
            .depot(CellCoord::new(0, 0))
            .rubble(CellCoord::new(2, 0))
            .fire(CellCoord::new(3, 0))
            .agent(AgentSpec::new(1, AgentKind::Truck, CellCoord::new(1, 0)).with_tools(1))
            .agent(AgentSpec::new(2, AgentKind::Medic, CellCoord::new(0, 0)));
        World::from_description(&description).expect("valid description")
    }

    /// Two medics and two survivors share a depot two cells from a hospital.
    fn carry_world() -> World {
        let depot = CellCoord::new(1, 0);
        let description = MapDescription::new(4, 1)
            .hazards(HazardTuning::calm())
            .depot(depot)
            .hospital(1, CellCoord::new(3, 0), 2, 1)
            .agent(AgentSpec::new(1, AgentKind::Medic, depot))
            .agent(AgentSpec::new(2, AgentKind::Medic, depot))
            .survivor(5, depot, 50)
            .survivor(6, depot, 50);
        World::from_description(&description).expect("valid description")
    }

    fn run(world: &mut World, record: CommandRecord) -> Vec<Event> {
        let mut events = Vec::new();
        crate::apply(world, &record, &mut events);
        events
    }

    fn rejection(events: &[Event]) -> Option<RejectionReason> {
        match events {
            [Event::CommandRejected { reason, .. }] => Some(*reason),
            _ => None,
        }
    }

    #[test]
    fn trucks_reach_only_adjacent_fires() {
        let mut world = truck_world();
        let events = run(
            &mut world,
            CommandRecord::at_cell(1, ActionKind::Extinguish, CellCoord::new(3, 0)),
        );
        assert_eq!(
            events,
            vec![Event::CommandRejected {
                agent: EntityId::new(1),
                action: ActionKind::Extinguish,
                reason: RejectionReason::OutOfReach,
            }]
        );
    }

    #[test]
    fn clearing_spends_a_tool_and_opens_the_cell() {
        let mut world = truck_world();
        let target = CellCoord::new(2, 0);
        let events = run(&mut world, CommandRecord::at_cell(1, ActionKind::Clear, target));
        assert_eq!(
            events,
            vec![
                Event::CommandAccepted {
                    agent: EntityId::new(1),
                    action: ActionKind::Clear,
                },
                Event::ResourcesConsumed {
                    agent: EntityId::new(1),
                    battery: 0,
                    water: 0,
                    tools: 1,
                },
                Event::RubbleCleared {
                    cell: target,
                    by: EntityId::new(1),
                },
            ]
        );

        let snapshot = query::snapshot(&world);
        assert_eq!(snapshot.cell(target).map(|cell| cell.hazard), Some(Hazard::None));
        assert_eq!(
            snapshot.agent(EntityId::new(1)).and_then(|agent| agent.tools),
            Some(ResourceLevel { current: 0, max: 1 })
        );

        let events = run(&mut world, CommandRecord::at_cell(1, ActionKind::Clear, target));
        assert!(matches!(
            events.as_slice(),
            [Event::CommandRejected {
                reason: RejectionReason::NoRubble,
                ..
            }]
        ));
    }

    #[test]
    fn a_survivor_has_at_most_one_carrier() {
        let mut world = carry_world();
        let pickup = run(&mut world, CommandRecord::at_id(1, ActionKind::Rescue, 5));
        assert_eq!(rejection(&pickup), None);
        let before = query::snapshot(&world);

        let second_medic = run(&mut world, CommandRecord::at_id(2, ActionKind::Rescue, 5));
        let full_hands = run(&mut world, CommandRecord::at_id(1, ActionKind::Rescue, 6));

        assert_eq!(
            rejection(&second_medic),
            Some(RejectionReason::SurvivorUnavailable)
        );
        assert_eq!(rejection(&full_hands), Some(RejectionReason::AlreadyCarrying));
        let after = query::snapshot(&world);
        assert_eq!(after, before);
        assert_eq!(
            after.survivor(EntityId::new(5)).map(|survivor| survivor.state),
            Some(SurvivorState::Carried {
                by: EntityId::new(1)
            })
        );
        assert_eq!(
            after.agent(EntityId::new(2)).map(|medic| medic.status),
            Some(AgentStatus::Available)
        );
    }

    #[test]
    fn deliveries_need_a_carrier_a_known_hospital_and_reach() {
        let mut world = carry_world();
        let _ = run(&mut world, CommandRecord::at_id(1, ActionKind::Rescue, 5));
        let before = query::snapshot(&world);

        let empty_handed = run(&mut world, CommandRecord::at_id(2, ActionKind::Deliver, 1));
        let unknown = run(&mut world, CommandRecord::at_id(1, ActionKind::Deliver, 9));
        let too_far = run(&mut world, CommandRecord::at_id(1, ActionKind::Deliver, 1));

        assert_eq!(rejection(&empty_handed), Some(RejectionReason::NotCarrying));
        assert_eq!(rejection(&unknown), Some(RejectionReason::UnknownHospital));
        assert_eq!(rejection(&too_far), Some(RejectionReason::OutOfReach));
        let after = query::snapshot(&world);
        assert_eq!(after, before);
        assert!(after
            .hospital(HospitalId::new(1))
            .map_or(false, |hospital| hospital.queue.is_empty()
                && hospital.overflow_count == 0));
    }

    #[test]
    fn recharge_rules_follow_agent_kind_and_terrain() {
        let mut world = truck_world();
        let truck = run(&mut world, CommandRecord::untargeted(1, ActionKind::Recharge));
        let medic = run(&mut world, CommandRecord::untargeted(2, ActionKind::Recharge));

        assert!(matches!(
            truck.as_slice(),
            [Event::CommandRejected {
                reason: RejectionReason::NotOnDepot,
                ..
            }]
        ));
        assert!(matches!(
            medic.as_slice(),
            [Event::CommandRejected {
                reason: RejectionReason::Incapable,
                ..
            }]
        ));
    }
}
