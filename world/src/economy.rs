//! Base grid storage and the one-second economic tick.

use std::time::Duration;

use lane_defence_core::{BuildingKind, Event, GridCoord, Production, UnitKind};

use crate::{Rejection, World};

const ECONOMY_TICK: Duration = Duration::from_secs(1);

/// Square grid of building cells with the townhall fixed at its centre.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseGrid {
    width: u32,
    cells: Vec<BuildingKind>,
}

impl BaseGrid {
    /// Creates a grid of empty cells with a townhall in the centre cell.
    #[must_use]
    pub fn new(width: u32) -> Self {
        let width = width.max(1);
        let side = usize::try_from(width).unwrap_or(1);
        let mut grid = Self {
            width,
            cells: vec![BuildingKind::Empty; side * side],
        };
        let centre = grid.centre();
        if let Some(index) = grid.index(centre) {
            grid.cells[index] = BuildingKind::Townhall;
        }
        grid
    }

    /// Side length of the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Coordinate of the townhall cell.
    #[must_use]
    pub const fn centre(&self) -> GridCoord {
        GridCoord::new(self.width / 2, self.width / 2)
    }

    /// Building occupying the cell, or `None` when the cell is out of bounds.
    #[must_use]
    pub fn get(&self, cell: GridCoord) -> Option<BuildingKind> {
        self.index(cell).map(|index| self.cells[index])
    }

    /// Iterates every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, BuildingKind)> + '_ {
        self.cells.iter().enumerate().map(move |(index, kind)| {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            (GridCoord::new(index % self.width, index / self.width), *kind)
        })
    }

    /// Number of cells holding the provided kind.
    #[must_use]
    pub fn count(&self, kind: BuildingKind) -> usize {
        self.cells.iter().filter(|cell| **cell == kind).count()
    }

    fn index(&self, cell: GridCoord) -> Option<usize> {
        if cell.x() >= self.width || cell.y() >= self.width {
            return None;
        }
        usize::try_from(cell.y() * self.width + cell.x()).ok()
    }

    fn set(&mut self, cell: GridCoord, kind: BuildingKind) {
        if let Some(index) = self.index(cell) {
            self.cells[index] = kind;
        }
    }
}

/// Tracks when the last economic tick ran in elapsed active time.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EconomyClock {
    last_tick: Option<Duration>,
}

impl EconomyClock {
    /// Reports whether a tick is due at `now`, recording it if so.
    pub(crate) fn poll(&mut self, now: Duration) -> bool {
        let due = match self.last_tick {
            None => true,
            Some(last) => now.saturating_sub(last) >= ECONOMY_TICK,
        };
        if due {
            self.last_tick = Some(now);
        }
        due
    }
}

impl World {
    pub(crate) fn run_economy_tick(&mut self, out_events: &mut Vec<Event>) {
        self.resources.add(&self.growth.resources);
        tracing::trace!(resources = ?self.resources, "economy tick");
        out_events.push(Event::ResourcesUpdated {
            resources: self.resources,
        });
    }

    /// Recomputes aggregate production from every cell of the grid.
    pub(crate) fn recompute_growth(&mut self) {
        let mut total = Production::default();
        for (_, kind) in self.base.iter() {
            total.add(&self.config.building(kind).produce);
        }
        self.growth = total;
    }

    pub(crate) fn build_at(
        &mut self,
        cell: GridCoord,
        kind: BuildingKind,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.ensure_active()?;
        if !kind.is_constructible() {
            return Err(Rejection::NotConstructible(kind));
        }
        match self.base.get(cell) {
            None => return Err(Rejection::OutOfBounds(cell)),
            Some(BuildingKind::Empty) => {}
            Some(_) => return Err(Rejection::Occupied(cell)),
        }
        let cost = self.config.building(kind).cost;
        self.charge(&cost)?;

        self.base.set(cell, kind);
        self.recompute_growth();
        tracing::debug!(?cell, ?kind, "building placed");

        out_events.push(Event::ResourcesUpdated {
            resources: self.resources,
        });
        out_events.push(Event::BuildingBuilt { kind });

        for unit in UnitKind::ALL {
            if self.unlocked[unit.index()] {
                continue;
            }
            if self.config.unit(unit).unlocked_by == Some(kind) {
                self.unlocked[unit.index()] = true;
                tracing::info!(?unit, "unit unlocked");
                out_events.push(Event::UnitUnlocked { kind: unit });
            }
        }
        Ok(())
    }

    pub(crate) fn destroy_building(
        &mut self,
        cell: GridCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.ensure_active()?;
        let kind = match self.base.get(cell) {
            None => return Err(Rejection::OutOfBounds(cell)),
            Some(kind) if !kind.is_constructible() => {
                return Err(Rejection::NothingToDestroy(cell))
            }
            Some(kind) => kind,
        };
        let cost = self.config.destroy_building_cost();
        self.charge(&cost)?;

        self.base.set(cell, BuildingKind::Empty);
        self.recompute_growth();
        tracing::debug!(?cell, ?kind, "building destroyed");

        out_events.push(Event::ResourcesUpdated {
            resources: self.resources,
        });
        out_events.push(Event::BuildingDestroyed { kind });
        Ok(())
    }
}
