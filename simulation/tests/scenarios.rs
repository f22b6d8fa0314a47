use std::collections::BTreeSet;

use crisis_response_core::{
    ActionKind, AgentKind, CellCoord, CommandRecord, EntityId, Event, Hazard, HospitalId,
    RejectionReason, ResourceLevel, SimulationStatus, SurvivorState, Terrain, TerminationReason,
};
use crisis_response_simulation::{AgentSpec, HazardTuning, MapDescription, Simulation};

const MEDIC: u32 = 1;
const SURVIVOR: u32 = 2;

fn cell(column: u32, row: u32) -> CellCoord {
    CellCoord::new(column, row)
}

fn step_to(to: CellCoord) -> Vec<CommandRecord> {
    vec![CommandRecord::at_cell(MEDIC, ActionKind::Move, to)]
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
fn medic_round_trip_delivers_the_survivor() {
    let description = MapDescription::new(5, 5)
        .hazards(HazardTuning::calm())
        .hospital(1, cell(0, 0), 4, 1)
        .agent(AgentSpec::new(MEDIC, AgentKind::Medic, cell(0, 0)))
        .survivor(SURVIVOR, cell(2, 2), 50);
    let mut simulation = Simulation::new(&description).expect("valid map");

    for to in [cell(1, 0), cell(2, 0), cell(2, 1), cell(2, 2)] {
        let report = simulation.step(&step_to(to));
        assert!(rejections(&report.events).is_empty(), "outbound step to {to}");
    }
    let report = simulation.step(&[CommandRecord::at_id(
        MEDIC,
        ActionKind::Rescue,
        SURVIVOR,
    )]);
    assert_eq!(report.delta.pickups, 1);
    assert_eq!(
        report
            .snapshot
            .survivor(EntityId::new(SURVIVOR))
            .map(|survivor| survivor.state),
        Some(SurvivorState::Carried {
            by: EntityId::new(MEDIC)
        })
    );

    // Carrying halves the pace: every second step request is refused.
    let homeward = [
        (cell(2, 1), None),
        (cell(2, 0), Some(RejectionReason::MovementSpent)),
        (cell(2, 0), None),
        (cell(1, 0), Some(RejectionReason::MovementSpent)),
    ];
    for (to, expected) in homeward {
        let report = simulation.step(&step_to(to));
        assert_eq!(rejections(&report.events), expected.into_iter().collect::<Vec<_>>());
    }

    let mut last = step_to(cell(1, 0));
    last.push(CommandRecord::at_id(MEDIC, ActionKind::Deliver, 1));
    let report = simulation.step(&last);

    assert!(rejections(&report.events).is_empty());
    assert_eq!(report.snapshot.tick, 10);
    assert_eq!(
        report
            .snapshot
            .survivor(EntityId::new(SURVIVOR))
            .map(|survivor| survivor.state),
        Some(SurvivorState::Delivered {
            hospital: HospitalId::new(1)
        })
    );
    assert_eq!(
        report.snapshot.status,
        SimulationStatus::Terminated(TerminationReason::AllSurvivorsResolved)
    );
    assert_eq!(simulation.totals().counters.rescued, 1);
    assert_eq!(simulation.totals().counters.deaths, 0);
    assert_eq!(simulation.summary().success_rate, 100.0);
    assert_eq!(simulation.summary().avg_rescue_time, 10.0);
}

#[test]
fn truck_without_enough_water_cannot_extinguish() {
    let description = MapDescription::new(3, 1)
        .hazards(HazardTuning::calm())
        .fire(cell(1, 0))
        .agent(AgentSpec::new(1, AgentKind::Truck, cell(0, 0)).with_water(20))
        .survivor(2, cell(2, 0), 100);
    let mut simulation = Simulation::new(&description).expect("valid map");

    let report = simulation.step(&[CommandRecord::at_cell(
        1,
        ActionKind::Extinguish,
        cell(1, 0),
    )]);

    assert_eq!(
        rejections(&report.events),
        vec![RejectionReason::InsufficientWater {
            available: 20,
            required: 25,
        }]
    );
    assert_eq!(
        report
            .snapshot
            .agent(EntityId::new(1))
            .and_then(|truck| truck.water),
        Some(ResourceLevel {
            current: 20,
            max: 20,
        })
    );
    assert_eq!(report.delta.fires_extinguished, 0);
    assert_eq!(report.delta.water_used, 0);
    assert!(report.snapshot.cell(cell(1, 0)).map_or(false, |c| c.hazard.is_fire()));
}

#[test]
fn forced_aftershock_drops_rubble_on_open_unoccupied_cells() {
    let mut tuning = HazardTuning::calm();
    tuning.aftershock_probability = 1.0;

    for seed in 0..16 {
        let description = MapDescription::new(5, 5)
            .seed(seed)
            .hazards(tuning)
            .depot(cell(0, 0))
            .building(cell(4, 0), 0.5)
            .fire(cell(4, 4))
            .rubble(cell(2, 2))
            .agent(AgentSpec::new(1, AgentKind::Truck, cell(1, 1)))
            .agent(AgentSpec::new(2, AgentKind::Medic, cell(3, 3)))
            .survivor(3, cell(0, 4), 100);
        let mut simulation = Simulation::new(&description).expect("valid map");
        let before = simulation.snapshot();

        let report = simulation.step(&[]);
        let created: BTreeSet<CellCoord> = report
            .snapshot
            .grid()
            .iter()
            .filter(|(coord, cell)| {
                cell.hazard == Hazard::Rubble
                    && before.cell(*coord).map(|old| old.hazard) != Some(Hazard::Rubble)
            })
            .map(|(coord, _)| coord)
            .collect();

        assert!(
            (1..=3).contains(&created.len()),
            "seed {seed} created {} rubble cells",
            created.len()
        );
        assert_eq!(report.delta.aftershocks, 1);
        assert_eq!(report.delta.rubble_created as usize, created.len());
        let occupied = [cell(1, 1), cell(3, 3), cell(0, 4)];
        for coord in created {
            let old = before.cell(coord).expect("in bounds");
            assert_eq!(old.terrain, Terrain::Empty);
            assert_eq!(old.hazard, Hazard::None);
            assert!(!occupied.contains(&coord));
        }
    }
}
