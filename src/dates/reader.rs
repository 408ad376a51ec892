// src/dates/reader.rs

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{cell_to_date, CellDate, DateToken};

/// Read the first column of the first worksheet as dates. Row 0 is the
/// column header and is skipped; duplicates are kept in sheet order.
pub fn read_dates(path: &Path) -> Result<Vec<DateToken>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("{} has no worksheets", path.display()))?
        .with_context(|| format!("reading first worksheet of {}", path.display()))?;
    Ok(collect_dates(&range))
}

pub fn collect_dates(range: &Range<Data>) -> Vec<DateToken> {
    let mut dates = Vec::new();
    for (idx, row) in range.rows().enumerate().skip(1) {
        let Some(cell) = row.first() else {
            continue;
        };
        match cell_to_date(cell) {
            CellDate::Date(token) => {
                debug!(row = idx, date = %token, "read date");
                dates.push(token);
            }
            CellDate::Empty => {}
            CellDate::Invalid(raw) => warn!(row = idx, value = %raw, "unparseable date; skipping"),
        }
    }
    info!("found {} dates (including duplicates)", dates.len());
    dates
}
