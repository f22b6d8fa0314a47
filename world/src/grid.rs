//! Dense terrain and hazard layers owned by the world.

use crisis_response_core::{Cell, CellCoord, GridView, Hazard, Terrain};

#[derive(Clone, Debug)]
pub(crate) struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Allocates `cells` empty cells; callers pass the validated `columns * rows`.
    pub(crate) fn new(columns: u32, rows: u32, cells: usize) -> Self {
        debug_assert_eq!(u64::from(columns) * u64::from(rows), cells as u64);
        Self {
            columns,
            rows,
            cells: vec![Cell::EMPTY; cells],
        }
    }

    pub(crate) fn view(&self) -> GridView<'_> {
        GridView::new(&self.cells, self.columns, self.rows)
    }

    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub(crate) fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    pub(crate) fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    pub(crate) fn terrain(&self, coord: CellCoord) -> Option<Terrain> {
        self.cell(coord).map(|cell| cell.terrain)
    }

    pub(crate) fn hazard(&self, coord: CellCoord) -> Option<Hazard> {
        self.cell(coord).map(|cell| cell.hazard)
    }

    pub(crate) fn set_terrain(&mut self, coord: CellCoord, terrain: Terrain) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.terrain = terrain;
        }
    }

    pub(crate) fn set_hazard(&mut self, coord: CellCoord, hazard: Hazard) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.hazard = hazard;
        }
    }

    /// Puts out the fire on a cell. Buildings are left damaged.
    pub(crate) fn extinguish(&mut self, coord: CellCoord) -> bool {
        let Some(cell) = self.cell_mut(coord) else {
            return false;
        };
        if !cell.hazard.is_fire() {
            return false;
        }

        cell.hazard = Hazard::None;
        if let Terrain::Building { damaged, .. } = &mut cell.terrain {
            *damaged = true;
        }
        true
    }

    pub(crate) fn clear_rubble(&mut self, coord: CellCoord) -> bool {
        match self.cell_mut(coord) {
            Some(cell) if cell.hazard.is_rubble() => {
                cell.hazard = Hazard::None;
                true
            }
            _ => false,
        }
    }

    fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.index(coord).and_then(|index| self.cells.get_mut(index))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
