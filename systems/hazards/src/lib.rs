#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic hazard system that plans fire spread and aftershocks.
//!
//! The system never mutates the grid. It reads an immutable [`GridView`],
//! draws from the caller's seeded generator in a fixed order, and answers with
//! [`HazardChange`] values the world applies afterwards. Because every draw is
//! taken against the pre-spread snapshot, a cell ignited during a tick can
//! never ignite a neighbour in the same tick.

use std::collections::BTreeSet;

use crisis_response_core::{CellCoord, GridView, Hazard, Terrain, MAX_FIRE_INTENSITY};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

const DEFAULT_SPREAD_PROBABILITY: f64 = 0.15;
const DEFAULT_AFTERSHOCK_PROBABILITY: f64 = 0.02;

/// Largest number of cells a single aftershock may collapse.
pub const MAX_AFTERSHOCK_CELLS: u32 = 3;

/// Tuning knobs controlling hazard dynamics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    /// Chance that a burning cell ignites an open neighbour each tick, before
    /// building resistance is applied.
    pub spread_probability: f64,
    /// Chance that an aftershock strikes during a tick.
    pub aftershock_probability: f64,
    /// Upper bound of cells collapsed by a single aftershock, within
    /// `1..=MAX_AFTERSHOCK_CELLS`.
    pub max_aftershock_cells: u32,
}

impl HazardTuning {
    /// Tuning with every stochastic hazard disabled.
    #[must_use]
    pub const fn calm() -> Self {
        Self {
            spread_probability: 0.0,
            aftershock_probability: 0.0,
            max_aftershock_cells: MAX_AFTERSHOCK_CELLS,
        }
    }
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            spread_probability: DEFAULT_SPREAD_PROBABILITY,
            aftershock_probability: DEFAULT_AFTERSHOCK_PROBABILITY,
            max_aftershock_cells: MAX_AFTERSHOCK_CELLS,
        }
    }
}

/// Grid mutation requested by the hazard system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HazardChange {
    /// Start a fire of intensity one on the cell.
    Ignite(CellCoord),
    /// Raise the intensity of a fire that was already burning.
    Intensify {
        /// Burning cell.
        cell: CellCoord,
        /// Intensity after the change.
        intensity: u8,
    },
    /// Turn the cell into rubble.
    Collapse(CellCoord),
}

/// Pure system that plans one hazard generation per tick.
#[derive(Debug)]
pub struct HazardEngine {
    tuning: HazardTuning,
    burning: Vec<CellCoord>,
    ignited: BTreeSet<CellCoord>,
    candidates: Vec<CellCoord>,
}

impl HazardEngine {
    /// Creates a new hazard system using the supplied tuning.
    #[must_use]
    pub fn new(tuning: HazardTuning) -> Self {
        Self {
            tuning,
            burning: Vec::new(),
            ignited: BTreeSet::new(),
            candidates: Vec::new(),
        }
    }

    /// Tuning the system was created with.
    #[must_use]
    pub const fn tuning(&self) -> &HazardTuning {
        &self.tuning
    }

    /// Plans the hazard changes for one tick.
    ///
    /// Fire spread draws are taken first, in row-major order of the burning
    /// cells and north, east, south, west order of their neighbours; the
    /// aftershock draws follow. `is_occupied` reports cells holding an agent
    /// or a survivor, which aftershocks never collapse.
    pub fn advance<R, F>(
        &mut self,
        grid: GridView<'_>,
        is_occupied: F,
        rng: &mut R,
        out: &mut Vec<HazardChange>,
    ) where
        R: Rng + ?Sized,
        F: Fn(CellCoord) -> bool,
    {
        self.plan_fire(grid, rng, out);
        self.plan_aftershock(grid, is_occupied, rng, out);
    }

    fn plan_fire<R>(&mut self, grid: GridView<'_>, rng: &mut R, out: &mut Vec<HazardChange>)
    where
        R: Rng + ?Sized,
    {
        self.burning.clear();
        self.ignited.clear();
        self.burning.extend(
            grid.iter()
                .filter(|(_, cell)| cell.hazard.is_fire())
                .map(|(coord, _)| coord),
        );

        let spread_probability = self.tuning.spread_probability;
        for &source in &self.burning {
            for target in grid.neighbors(source) {
                let Some(cell) = grid.cell(target) else {
                    continue;
                };
                if cell.hazard != Hazard::None || !cell.terrain.is_flammable() {
                    continue;
                }

                let chance = spread_probability * (1.0 - f64::from(cell.terrain.resistance()));
                let roll: f64 = rng.gen();
                if roll < chance && self.ignited.insert(target) {
                    out.push(HazardChange::Ignite(target));
                }
            }
        }

        for &source in &self.burning {
            if let Some(Hazard::Fire { intensity }) = grid.cell(source).map(|cell| cell.hazard) {
                if intensity < MAX_FIRE_INTENSITY {
                    out.push(HazardChange::Intensify {
                        cell: source,
                        intensity: intensity + 1,
                    });
                }
            }
        }

        tracing::trace!(
            burning = self.burning.len(),
            ignited = self.ignited.len(),
            "fire generation planned"
        );
    }

    fn plan_aftershock<R, F>(
        &mut self,
        grid: GridView<'_>,
        is_occupied: F,
        rng: &mut R,
        out: &mut Vec<HazardChange>,
    ) where
        R: Rng + ?Sized,
        F: Fn(CellCoord) -> bool,
    {
        let roll: f64 = rng.gen();
        if roll >= self.tuning.aftershock_probability {
            return;
        }

        let upper = self
            .tuning
            .max_aftershock_cells
            .clamp(1, MAX_AFTERSHOCK_CELLS);
        let count = rng.gen_range(1..=upper) as usize;

        let ignited = &self.ignited;
        let candidates = &mut self.candidates;
        candidates.clear();
        candidates.extend(
            grid.iter()
                .filter(|(coord, cell)| {
                    matches!(cell.terrain, Terrain::Empty)
                        && cell.hazard == Hazard::None
                        && !ignited.contains(coord)
                        && !is_occupied(*coord)
                })
                .map(|(coord, _)| coord),
        );

        out.extend(
            candidates
                .choose_multiple(rng, count)
                .map(|cell| HazardChange::Collapse(*cell)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisis_response_core::Cell;

    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn fully_resistant_buildings_never_ignite() {
        let mut cells = vec![
            Cell {
                terrain: Terrain::Building {
                    resistance: 1.0,
                    damaged: false,
                },
                hazard: Hazard::None,
            };
            3
        ];
        cells[1].hazard = Hazard::Fire { intensity: 1 };
        let grid = GridView::new(&cells, 3, 1);

        let mut engine = HazardEngine::new(HazardTuning {
            spread_probability: 1.0,
            aftershock_probability: 0.0,
            max_aftershock_cells: 3,
        });
        let mut out = Vec::new();
        engine.advance(grid, |_| false, &mut ZeroRng, &mut out);

        assert_eq!(
            out,
            vec![HazardChange::Intensify {
                cell: CellCoord::new(1, 0),
                intensity: 2,
            }]
        );
    }

    #[test]
    fn intensity_is_capped() {
        let mut cells = vec![Cell::EMPTY; 1];
        cells[0].hazard = Hazard::Fire {
            intensity: MAX_FIRE_INTENSITY,
        };
        let grid = GridView::new(&cells, 1, 1);

        let mut engine = HazardEngine::new(HazardTuning::calm());
        let mut out = Vec::new();
        engine.advance(grid, |_| false, &mut ZeroRng, &mut out);

        assert!(out.is_empty());
    }
}
