//! CSV export of the rendering matrix.
//!
//! One row per day of the year, one column per grid slot:
//!
//! ```text
//! date,05:00,05:05,...,21:55
//! 2020-01-01,NA,NA,...,NA
//! 2020-06-21,0,12.5,...,NA
//! ```
//!
//! `NA` marks a slot without data; `0` is measured zero output.

use std::io;

use tracing::debug;

use crate::store::YearMatrix;

/// Marker written for [`crate::store::Cell::NoData`].
pub const NO_DATA: &str = "NA";

/// Write `matrix` as CSV to `out`.
pub fn write_matrix_csv<W: io::Write>(matrix: &YearMatrix, out: W) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(out);

    let grid = matrix.grid();
    let mut header = Vec::with_capacity(usize::from(grid.slots()) + 1);
    header.push("date".to_string());
    header.extend(
        (0..grid.slots())
            .filter_map(|i| grid.slot_start(i))
            .map(|t| t.format("%H:%M").to_string()),
    );
    w.write_record(&header)?;

    let mut rows = 0usize;
    for (day, row) in matrix.iter_days() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(day.format("%Y-%m-%d").to_string());
        record.extend(
            row.iter()
                .map(|c| c.power().map_or_else(|| NO_DATA.to_string(), |v| v.to_string())),
        );
        w.write_record(&record)?;
        rows += 1;
    }
    w.flush()?;
    debug!(year = matrix.year(), rows, columns = grid.slots(), "wrote matrix csv");
    Ok(())
}
