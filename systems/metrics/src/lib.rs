#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic metrics system that folds tick events into counters.
//!
//! The system observes nothing but the events the world emitted for a tick, so
//! the same event stream always produces the same [`MetricsDelta`].

use crisis_response_core::{Event, MetricsDelta, MetricsTotals};

/// Pure metrics system that derives per-tick deltas and keeps running totals.
#[derive(Debug, Default)]
pub struct Metrics {
    totals: MetricsTotals,
}

impl Metrics {
    /// Creates a new metrics system with zeroed totals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals accumulated over every handled tick.
    #[must_use]
    pub fn totals(&self) -> &MetricsTotals {
        &self.totals
    }

    /// Consumes the events of one tick and publishes its delta.
    pub fn handle(&mut self, events: &[Event]) -> MetricsDelta {
        let delta = delta_from_events(events);
        self.totals.absorb(&delta);
        delta
    }
}

/// Counts the effects reported by a slice of events.
#[must_use]
pub fn delta_from_events(events: &[Event]) -> MetricsDelta {
    let mut delta = MetricsDelta::default();
    for event in events {
        match event {
            Event::CommandAccepted { .. } => delta.commands_accepted += 1,
            Event::CommandRejected { .. } => delta.commands_rejected += 1,
            Event::ResourcesConsumed {
                battery,
                water,
                tools,
                ..
            } => {
                delta.battery_used += battery;
                delta.water_used += water;
                delta.tools_used += tools;
            }
            Event::SurvivorPickedUp { .. } => delta.pickups += 1,
            Event::AdmissionOverflowed { .. } => delta.overflow_events += 1,
            Event::SurvivorDelivered { .. } => delta.rescued += 1,
            Event::SurvivorDied { .. } => delta.deaths += 1,
            Event::FireExtinguished { .. } => delta.fires_extinguished += 1,
            Event::RubbleCleared { .. } => delta.rubble_cleared += 1,
            Event::FireIgnited { .. } => delta.fires_ignited += 1,
            Event::AftershockStruck { cells } => {
                delta.aftershocks += 1;
                delta.rubble_created += u32::try_from(cells.len()).unwrap_or(u32::MAX);
            }
            Event::AgentMoved { .. }
            | Event::AgentRecharged { .. }
            | Event::SurvivorAdmitted { .. }
            | Event::FireIntensified { .. }
            | Event::TickCompleted { .. }
            | Event::SimulationTerminated { .. } => {}
        }
    }
    delta
}
