// src/extract/mod.rs

pub mod columns;
pub mod table;

pub use columns::{match_headers, project_columns};
pub use table::{extract_table, read_table, RawTable};

/// Headers found on the page (in requested order) and the rows projected onto them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Extraction {
    /// True when there is nothing to record: no matched headers or no rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }
}
