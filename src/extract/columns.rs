// src/extract/columns.rs

use tracing::{debug, warn};

use super::Extraction;

/// Map each desired header to its position in `actual`. Headers absent from
/// `actual` are skipped; the result keeps the caller's order.
pub fn match_headers<S: AsRef<str>>(desired: &[S], actual: &[String]) -> Vec<(String, usize)> {
    let mut matched = Vec::with_capacity(desired.len());
    for header in desired {
        let header = header.as_ref().trim();
        match actual.iter().position(|a| a == header) {
            Some(idx) => matched.push((header.to_string(), idx)),
            None => warn!(header, "header not found in table"),
        }
    }
    matched
}

/// Project `rows` onto the columns of `desired` found in `actual`.
/// Cells past the end of a short row come back as `""`.
pub fn project_columns<S: AsRef<str>>(
    desired: &[S],
    actual: &[String],
    rows: &[Vec<String>],
) -> Extraction {
    let matched = match_headers(desired, actual);
    if matched.is_empty() {
        warn!("no matching headers found; nothing to extract");
        return Extraction::default();
    }
    let names: Vec<&str> = matched.iter().map(|(h, _)| h.as_str()).collect();
    debug!("matched headers: {:?}", names);

    let rows = rows.iter().map(|cells| project_row(cells, &matched)).collect();
    Extraction {
        headers: matched.into_iter().map(|(h, _)| h).collect(),
        rows,
    }
}

fn project_row(cells: &[String], matched: &[(String, usize)]) -> Vec<String> {
    matched
        .iter()
        .map(|&(_, idx)| match cells.get(idx) {
            Some(cell) => cell.trim().to_string(),
            None => String::new(),
        })
        .collect()
}
