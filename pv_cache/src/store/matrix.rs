//! Dense day × slot view handed to renderers.

use chrono::NaiveDate;

use crate::grid::DailyGrid;

/// One matrix cell. `NoData` is distinct from `Power(0.0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// Nothing measured for this slot.
    NoData,
    /// Measured power in watts.
    Power(f64),
}

impl Cell {
    /// The measured value, if any.
    pub fn power(&self) -> Option<f64> {
        match self {
            Cell::NoData => None,
            Cell::Power(w) => Some(*w),
        }
    }

    /// True for the no-data marker.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Cell::NoData)
    }
}

/// `rows[day_of_year - 1][interval]` for every day of the year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearMatrix {
    pub(crate) year: i32,
    pub(crate) grid: DailyGrid,
    pub(crate) rows: Vec<Vec<Cell>>,
}

impl YearMatrix {
    /// Calendar year of the matrix.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Grid that defines the columns.
    pub fn grid(&self) -> &DailyGrid {
        &self.grid
    }

    /// All rows, January 1 first.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Row for a 1-based day of year.
    pub fn row(&self, day_of_year: u32) -> Option<&[Cell]> {
        let idx = usize::try_from(day_of_year.checked_sub(1)?).ok()?;
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Rows paired with their dates.
    pub fn iter_days(&self) -> impl Iterator<Item = (NaiveDate, &[Cell])> + '_ {
        self.rows.iter().enumerate().filter_map(move |(i, row)| {
            let ordinal = u32::try_from(i + 1).ok()?;
            NaiveDate::from_yo_opt(self.year, ordinal).map(|d| (d, row.as_slice()))
        })
    }
}
