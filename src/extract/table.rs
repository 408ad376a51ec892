// src/extract/table.rs

use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{project_columns, Extraction};

/// Header texts and body cell texts of one HTML table, in page order.
#[derive(Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| anyhow!("invalid CSS selector {css:?}: {e:?}"))
}

/// Rendered text of an element: trimmed, whitespace runs collapsed.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read the first table matching `table_selector`. The table must have a
/// `<thead>` with a header row of `<th>` cells and a `<tbody>` of `<td>` rows.
pub fn read_table(html: &str, table_selector: &str) -> Result<RawTable> {
    let table_sel = selector(table_selector)?;
    let doc = Html::parse_document(html);

    let table = doc
        .select(&table_sel)
        .next()
        .with_context(|| format!("no element matches {table_selector:?}"))?;
    let thead = table
        .select(&selector("thead")?)
        .next()
        .context("table has no <thead>")?;
    let tbody = table
        .select(&selector("tbody")?)
        .next()
        .context("table has no <tbody>")?;

    let tr = selector("tr")?;
    let header_row = thead
        .select(&tr)
        .next()
        .context("<thead> has no header row")?;

    let th = selector("th")?;
    let td = selector("td")?;
    let headers = header_row.select(&th).map(cell_text).collect();
    let rows = tbody
        .select(&tr)
        .map(|row| row.select(&td).map(cell_text).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

/// Extract the `desired` columns from the first table matching `css`.
/// Any failure to find or read the table is logged and yields an empty result.
pub fn extract_table<S: AsRef<str>>(html: &str, css: &str, desired: &[S]) -> Extraction {
    match read_table(html, css) {
        Ok(table) => {
            debug!("available headers in table: {:?}", table.headers);
            project_columns(desired, &table.headers, &table.rows)
        }
        Err(e) => {
            warn!(error = %e, "could not read table");
            Extraction::default()
        }
    }
}
