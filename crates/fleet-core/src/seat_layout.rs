//! # Seat Layout Grid
//!
//! A seat diagram is a stack of floors; each floor is a rectangular grid of
//! [`Space`]s. One column per floor is the **main hallway**: the first column
//! whose every cell is [`Space::Hallway`]. Column edits are constrained
//! relative to it:
//!
//! | Operation     | Constraint                                                 |
//! |---------------|------------------------------------------------------------|
//! | add column    | total < [`MAX_COLUMNS`], target side < [`MAX_SIDE_COLUMNS`] |
//! | remove column | not the hallway, side keeps [`MIN_SIDE_COLUMNS`], total ≥ [`MIN_COLUMNS`] |
//! | add row       | rows < [`MAX_ROWS`]                                        |
//! | remove row    | rows > [`MIN_ROWS`]                                        |
//! | set space     | hallway cells stay hallway                                 |
//!
//! Removing a row or setting a space must also leave the main hallway where
//! it was: an edit that completes an all-hallway column left of it fails.
//!
//! Seats are renumbered after every edit: left to right, top to bottom,
//! continuing from one floor to the next.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Narrowest floor: one seat column each side of the hallway.
pub const MIN_COLUMNS: usize = 3;
/// Widest floor: three seat columns each side of the hallway.
pub const MAX_COLUMNS: usize = 7;
/// Fewest columns on either side of the hallway.
pub const MIN_SIDE_COLUMNS: usize = 1;
/// Most columns on either side of the hallway.
pub const MAX_SIDE_COLUMNS: usize = 3;
/// Fewest rows per floor.
pub const MIN_ROWS: usize = 1;
/// Most rows per floor.
pub const MAX_ROWS: usize = 20;
/// Most floors per diagram.
pub const MAX_FLOORS: usize = 2;

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Space {
    /// A passenger seat. `number` is assigned by renumbering.
    Seat {
        /// 1-based seat number, unique across the diagram.
        #[serde(default)]
        number: u32,
    },
    /// Walkway.
    Hallway,
    /// Restroom.
    Bathroom,
    /// Stairs between floors.
    Stairs,
    /// Unused space.
    Empty,
}

impl Space {
    fn seat() -> Self {
        Self::Seat { number: 0 }
    }

    /// Whether the cell is a seat.
    pub fn is_seat(&self) -> bool {
        matches!(self, Self::Seat { .. })
    }
}

/// Side of the main hallway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSide {
    /// Columns before the hallway.
    Left,
    /// Columns after the hallway.
    Right,
}

/// Grid rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Floor number outside the diagram.
    #[error("floor {0} does not exist")]
    FloorOutOfRange(usize),
    /// Row index outside the floor.
    #[error("row {0} does not exist")]
    RowOutOfRange(usize),
    /// Column index outside the floor.
    #[error("column {0} does not exist")]
    ColumnOutOfRange(usize),
    /// No column consists entirely of hallway cells.
    #[error("floor {0} has no main hallway column")]
    NoHallway(usize),
    /// The edit would remove or break the main hallway.
    #[error("the main hallway column cannot be modified")]
    HallwayColumn,
    /// The edit would make an earlier column the main hallway.
    #[error("column {0} would become the main hallway")]
    HallwayShift(usize),
    /// Column count would exceed the maximum.
    #[error("a floor may have at most {} columns", MAX_COLUMNS)]
    TooManyColumns,
    /// Column count would drop below the minimum.
    #[error("a floor needs at least {} columns", MIN_COLUMNS)]
    TooFewColumns,
    /// The side of the hallway is already full.
    #[error("the {0:?} side of the hallway already has {} columns", MAX_SIDE_COLUMNS)]
    SideFull(ColumnSide),
    /// The side of the hallway would be left without columns.
    #[error("the {0:?} side of the hallway needs at least {} column", MIN_SIDE_COLUMNS)]
    SideMinimum(ColumnSide),
    /// Row count would exceed the maximum.
    #[error("a floor may have at most {} rows", MAX_ROWS)]
    TooManyRows,
    /// Row count would drop below the minimum.
    #[error("a floor needs at least {} row", MIN_ROWS)]
    TooFewRows,
    /// Floor count outside 1..=MAX_FLOORS.
    #[error("a diagram needs between 1 and {} floors", MAX_FLOORS)]
    FloorCount,
    /// Rows of one floor have different lengths.
    #[error("rows of floor {0} have different lengths")]
    Ragged(usize),
    /// Seats per row outside what the column rules allow.
    #[error("seats per row must be between 2 and {}", 2 * MAX_SIDE_COLUMNS)]
    SeatsPerRow,
}

/// One floor: `rows[row][column]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    /// Grid cells, row-major.
    pub rows: Vec<Vec<Space>>,
}

impl Floor {
    fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Index of the main hallway column.
    pub fn main_hallway(&self) -> Option<usize> {
        if self.rows.is_empty() {
            return None;
        }
        (0..self.width()).find(|&col| {
            self.rows
                .iter()
                .all(|row| matches!(row.get(col), Some(Space::Hallway)))
        })
    }
}

/// Address of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// 1-based floor number.
    pub floor: usize,
    /// 0-based row.
    pub row: usize,
    /// 0-based column.
    pub column: usize,
}

/// The full diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    /// Floors, lower deck first.
    pub floors: Vec<Floor>,
}

impl SeatLayout {
    /// Generate a regular layout: `seats_per_row` split around a central
    /// hallway (the extra seat of an odd split goes left).
    pub fn generate(
        num_floors: usize,
        rows_per_floor: usize,
        seats_per_row: usize,
    ) -> Result<Self, LayoutError> {
        if num_floors == 0 || num_floors > MAX_FLOORS {
            return Err(LayoutError::FloorCount);
        }
        if rows_per_floor < MIN_ROWS {
            return Err(LayoutError::TooFewRows);
        }
        if rows_per_floor > MAX_ROWS {
            return Err(LayoutError::TooManyRows);
        }
        if !(2..=2 * MAX_SIDE_COLUMNS).contains(&seats_per_row) {
            return Err(LayoutError::SeatsPerRow);
        }
        let left = seats_per_row.div_ceil(2);
        let right = seats_per_row / 2;
        if left > MAX_SIDE_COLUMNS {
            return Err(LayoutError::SeatsPerRow);
        }
        let row: Vec<Space> = std::iter::repeat(Space::seat())
            .take(left)
            .chain(std::iter::once(Space::Hallway))
            .chain(std::iter::repeat(Space::seat()).take(right))
            .collect();
        let floors = (0..num_floors)
            .map(|_| Floor {
                rows: vec![row.clone(); rows_per_floor],
            })
            .collect();
        let mut layout = Self { floors };
        layout.renumber();
        Ok(layout)
    }

    fn floor_mut(&mut self, floor: usize) -> Result<&mut Floor, LayoutError> {
        floor
            .checked_sub(1)
            .and_then(|i| self.floors.get_mut(i))
            .ok_or(LayoutError::FloorOutOfRange(floor))
    }

    /// The floor with the given 1-based number.
    pub fn floor(&self, floor: usize) -> Result<&Floor, LayoutError> {
        floor
            .checked_sub(1)
            .and_then(|i| self.floors.get(i))
            .ok_or(LayoutError::FloorOutOfRange(floor))
    }

    /// Main hallway column of a floor.
    pub fn main_hallway(&self, floor: usize) -> Result<usize, LayoutError> {
        self.floor(floor)?
            .main_hallway()
            .ok_or(LayoutError::NoHallway(floor))
    }

    /// Add a seat column at the outer edge of `side`.
    pub fn add_column(&mut self, floor: usize, side: ColumnSide) -> Result<(), LayoutError> {
        let hallway = self.main_hallway(floor)?;
        let f = self.floor_mut(floor)?;
        let width = f.width();
        if width >= MAX_COLUMNS {
            return Err(LayoutError::TooManyColumns);
        }
        let side_count = match side {
            ColumnSide::Left => hallway,
            ColumnSide::Right => width - hallway - 1,
        };
        if side_count >= MAX_SIDE_COLUMNS {
            return Err(LayoutError::SideFull(side));
        }
        for row in &mut f.rows {
            match side {
                ColumnSide::Left => row.insert(0, Space::seat()),
                ColumnSide::Right => row.push(Space::seat()),
            }
        }
        self.renumber();
        Ok(())
    }

    /// Remove a column that is not the main hallway.
    pub fn remove_column(&mut self, floor: usize, column: usize) -> Result<(), LayoutError> {
        let hallway = self.main_hallway(floor)?;
        let f = self.floor_mut(floor)?;
        let width = f.width();
        if column >= width {
            return Err(LayoutError::ColumnOutOfRange(column));
        }
        if column == hallway {
            return Err(LayoutError::HallwayColumn);
        }
        let (side, side_count) = if column < hallway {
            (ColumnSide::Left, hallway)
        } else {
            (ColumnSide::Right, width - hallway - 1)
        };
        if side_count <= MIN_SIDE_COLUMNS {
            return Err(LayoutError::SideMinimum(side));
        }
        if width <= MIN_COLUMNS {
            return Err(LayoutError::TooFewColumns);
        }
        for row in &mut f.rows {
            row.remove(column);
        }
        self.renumber();
        Ok(())
    }

    /// Append a row: seats everywhere except the hallway column.
    pub fn add_row(&mut self, floor: usize) -> Result<(), LayoutError> {
        let hallway = self.main_hallway(floor)?;
        let f = self.floor_mut(floor)?;
        if f.rows.len() >= MAX_ROWS {
            return Err(LayoutError::TooManyRows);
        }
        let row = (0..f.width())
            .map(|col| {
                if col == hallway {
                    Space::Hallway
                } else {
                    Space::seat()
                }
            })
            .collect();
        f.rows.push(row);
        self.renumber();
        Ok(())
    }

    /// Remove a row.
    pub fn remove_row(&mut self, floor: usize, row: usize) -> Result<(), LayoutError> {
        let hallway = self.main_hallway(floor)?;
        let mut edited = self.floor(floor)?.clone();
        if row >= edited.rows.len() {
            return Err(LayoutError::RowOutOfRange(row));
        }
        if edited.rows.len() <= MIN_ROWS {
            return Err(LayoutError::TooFewRows);
        }
        edited.rows.remove(row);
        self.replace_floor(floor, edited, hallway)
    }

    /// Replace one cell. Cells of the main hallway must remain hallway.
    pub fn set_space(&mut self, at: Position, space: Space) -> Result<(), LayoutError> {
        let hallway = self.main_hallway(at.floor)?;
        if at.column == hallway && space != Space::Hallway {
            return Err(LayoutError::HallwayColumn);
        }
        let mut edited = self.floor(at.floor)?.clone();
        let cell = edited
            .rows
            .get_mut(at.row)
            .ok_or(LayoutError::RowOutOfRange(at.row))?
            .get_mut(at.column)
            .ok_or(LayoutError::ColumnOutOfRange(at.column))?;
        *cell = match space {
            Space::Seat { .. } => Space::seat(),
            other => other,
        };
        self.replace_floor(at.floor, edited, hallway)
    }

    /// Store an edited floor if its main hallway is still column `hallway`.
    ///
    /// An edit that completes an all-hallway column left of the main one
    /// would silently move the main hallway, so it is rejected.
    fn replace_floor(
        &mut self,
        floor: usize,
        edited: Floor,
        hallway: usize,
    ) -> Result<(), LayoutError> {
        if let Some(column) = edited.main_hallway().filter(|&c| c != hallway) {
            return Err(LayoutError::HallwayShift(column));
        }
        *self.floor_mut(floor)? = edited;
        self.renumber();
        Ok(())
    }

    /// Number seats sequentially across the whole diagram.
    pub fn renumber(&mut self) {
        let mut next = 1;
        for floor in &mut self.floors {
            for row in &mut floor.rows {
                for cell in row.iter_mut() {
                    if let Space::Seat { number } = cell {
                        *number = next;
                        next += 1;
                    }
                }
            }
        }
    }

    /// Number of seats in the diagram.
    pub fn total_seats(&self) -> usize {
        self.floors
            .iter()
            .flat_map(|f| f.rows.iter())
            .flat_map(|r| r.iter())
            .filter(|s| s.is_seat())
            .count()
    }

    /// Every cell keyed by its position.
    pub fn position_map(&self) -> BTreeMap<Position, Space> {
        let mut map = BTreeMap::new();
        for (fi, floor) in self.floors.iter().enumerate() {
            for (ri, row) in floor.rows.iter().enumerate() {
                for (ci, cell) in row.iter().enumerate() {
                    map.insert(
                        Position {
                            floor: fi + 1,
                            row: ri,
                            column: ci,
                        },
                        *cell,
                    );
                }
            }
        }
        map
    }

    /// Position of a seat by number.
    pub fn find_seat(&self, number: u32) -> Option<Position> {
        self.position_map()
            .into_iter()
            .find(|(_, space)| *space == Space::Seat { number })
            .map(|(pos, _)| pos)
    }

    /// Check the structural rules of a client-supplied layout.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.floors.is_empty() || self.floors.len() > MAX_FLOORS {
            return Err(LayoutError::FloorCount);
        }
        for (i, floor) in self.floors.iter().enumerate() {
            let number = i + 1;
            if floor.rows.len() < MIN_ROWS {
                return Err(LayoutError::TooFewRows);
            }
            if floor.rows.len() > MAX_ROWS {
                return Err(LayoutError::TooManyRows);
            }
            let width = floor.width();
            if floor.rows.iter().any(|r| r.len() != width) {
                return Err(LayoutError::Ragged(number));
            }
            if width < MIN_COLUMNS {
                return Err(LayoutError::TooFewColumns);
            }
            if width > MAX_COLUMNS {
                return Err(LayoutError::TooManyColumns);
            }
            let hallway = floor.main_hallway().ok_or(LayoutError::NoHallway(number))?;
            let right = width - hallway - 1;
            for (side, count) in [(ColumnSide::Left, hallway), (ColumnSide::Right, right)] {
                if count < MIN_SIDE_COLUMNS {
                    return Err(LayoutError::SideMinimum(side));
                }
                if count > MAX_SIDE_COLUMNS {
                    return Err(LayoutError::SideFull(side));
                }
            }
        }
        Ok(())
    }
}
