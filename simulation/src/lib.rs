#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick orchestration for the crisis response engine.
//!
//! A [`Simulation`] owns one [`World`] and the metrics system. Every call to
//! [`Simulation::step`] runs the fixed phase order: movement tokens are
//! granted, the command batch executes, hazards advance, hospitals serve
//! their queues, deadlines expire and the tick counter advances. The caller
//! receives an owned snapshot, the tick's metrics delta and the raw events.

use crisis_response_core::{
    CommandRecord, Event, MetricsDelta, MetricsTotals, SimulationStatus, WorldSnapshot,
};
use crisis_response_system_metrics::{delta_from_events, Metrics};
use crisis_response_world::{self as world, query, World};
use serde::{Deserialize, Serialize};

pub use crisis_response_world::{
    AgentSpec, BuildingSpec, ConfigError, FireSpec, HazardTuning, HospitalSpec, MapDescription,
    SurvivorSpec, MAX_AFTERSHOCK_CELLS, MAX_GRID_CELLS,
};

/// Outcome of a single tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// World state after the tick.
    pub snapshot: WorldSnapshot,
    /// Counters derived from the tick's events.
    pub delta: MetricsDelta,
    /// Every event emitted during the tick, in phase order.
    pub events: Vec<Event>,
}

/// Final summary of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of completed ticks.
    pub ticks: u64,
    /// Lifecycle of the simulation when the summary was taken.
    pub status: SimulationStatus,
    /// Survivors present in the map.
    pub total_survivors: usize,
    /// Percentage of survivors delivered.
    pub success_rate: f64,
    /// Mean ticks elapsed until a delivered survivor was served.
    pub avg_rescue_time: f64,
    /// Counters summed over every tick.
    pub totals: MetricsDelta,
}

/// Owns a world and advances it tick by tick.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    metrics: Metrics,
}

impl Simulation {
    /// Validates the description and builds a simulation at tick zero.
    pub fn new(description: &MapDescription) -> Result<Self, ConfigError> {
        let world = World::from_description(description)?;
        let tuning = query::hazard_tuning(&world);
        tracing::debug!(
            width = description.width,
            height = description.height,
            seed = description.seed,
            max_ticks = query::max_ticks(&world),
            spread_probability = tuning.spread_probability,
            aftershock_probability = tuning.aftershock_probability,
            entities = query::entity_count(&world),
            "simulation created"
        );
        Ok(Self {
            world,
            metrics: Metrics::new(),
        })
    }

    /// Runs one tick with the provided command batch.
    ///
    /// Once the simulation terminated every command is rejected and the world
    /// is left unchanged; the returned delta then only counts the rejections
    /// and is not added to the totals.
    pub fn step(&mut self, batch: &[CommandRecord]) -> TickReport {
        let mut events = Vec::new();

        if self.status().is_terminated() {
            tracing::warn!(
                tick = query::tick(&self.world),
                commands = batch.len(),
                "step requested after termination"
            );
            world::execute(&mut self.world, batch, &mut events);
            return TickReport {
                snapshot: query::snapshot(&self.world),
                delta: delta_from_events(&events),
                events,
            };
        }

        world::begin_tick(&mut self.world);
        world::execute(&mut self.world, batch, &mut events);
        world::advance_hazards(&mut self.world, &mut events);
        world::drain_triage(&mut self.world, &mut events);
        world::resolve_deadlines(&mut self.world, &mut events);
        world::conclude_tick(&mut self.world, &mut events);

        let delta = self.metrics.handle(&events);
        tracing::trace!(
            tick = query::tick(&self.world),
            accepted = delta.commands_accepted,
            rejected = delta.commands_rejected,
            "tick completed"
        );

        TickReport {
            snapshot: query::snapshot(&self.world),
            delta,
            events,
        }
    }

    /// Feeds the scripted batches one per tick, then empty batches, until the
    /// simulation terminates.
    ///
    /// Batches left over once the simulation terminated are ignored.
    pub fn run_script<I>(&mut self, batches: I) -> RunSummary
    where
        I: IntoIterator<Item = Vec<CommandRecord>>,
    {
        let mut batches = batches.into_iter();
        while !self.status().is_terminated() {
            let batch = batches.next().unwrap_or_default();
            let _ = self.step(&batch);
        }

        let summary = self.summary();
        tracing::info!(
            ticks = summary.ticks,
            status = ?summary.status,
            rescued = summary.totals.rescued,
            deaths = summary.totals.deaths,
            "run finished"
        );
        summary
    }

    /// Owned snapshot of the current world.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        query::snapshot(&self.world)
    }

    /// Lifecycle of the simulation.
    #[must_use]
    pub fn status(&self) -> SimulationStatus {
        query::status(&self.world)
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(&self) -> u64 {
        query::tick(&self.world)
    }

    /// Counters accumulated over every completed tick.
    #[must_use]
    pub fn totals(&self) -> &MetricsTotals {
        self.metrics.totals()
    }

    /// Summarises the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let totals = self.metrics.totals();
        let total_survivors = query::survivor_count(&self.world);
        RunSummary {
            ticks: self.tick(),
            status: self.status(),
            total_survivors,
            success_rate: totals.success_rate(total_survivors),
            avg_rescue_time: totals.average_rescue_time(),
            totals: totals.counters,
        }
    }
}
