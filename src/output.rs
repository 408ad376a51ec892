// src/output.rs

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use std::{collections::HashSet, fs, path::Path};
use tracing::info;

use crate::extract::Extraction;
use crate::session::DateBlock;

pub const DATE_COLUMN: &str = "Date";
const SHEET_NAME: &str = "lake_levels";

/// Final tabular output: extracted headers plus the trailing `Date` column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(mut headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        headers.push(DATE_COLUMN.to_string());
        Self { headers, rows }
    }

    pub fn from_block(block: DateBlock) -> Option<Self> {
        if block.is_empty() {
            return None;
        }
        let Extraction { headers, rows } = block.extraction;
        Some(Self::new(headers, rows))
    }

    pub fn unique_dates(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|r| r.last())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Write `sheet` as a single-worksheet xlsx file with a bold, frozen header row.
pub fn write_xlsx(path: &Path, sheet: &Sheet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let header_fmt = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (c, header) in sheet.headers.iter().enumerate() {
        let col = u16::try_from(c).context("too many columns")?;
        worksheet.write_string_with_format(0, col, header, &header_fmt)?;
    }
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_num = u32::try_from(r + 1).context("too many rows")?;
        for (c, value) in row.iter().enumerate() {
            let col = u16::try_from(c).context("too many columns")?;
            worksheet.write_string(row_num, col, value)?;
        }
    }
    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    workbook
        .save(path)
        .with_context(|| format!("saving workbook {}", path.display()))?;
    info!(path = %path.display(), rows = sheet.rows.len(), "wrote workbook");
    Ok(())
}

/// Right-aligned plain-text table, one line per row.
pub fn render_preview(sheet: &Sheet) -> String {
    let mut widths: Vec<usize> = sheet.headers.iter().map(|h| h.chars().count()).collect();
    for row in &sheet.rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if i < widths.len() {
                widths[i] = widths[i].max(len);
            } else {
                widths.push(len);
            }
        }
    }

    let mut out = preview_line(&sheet.headers, &widths);
    for row in &sheet.rows {
        out.push('\n');
        out.push_str(&preview_line(row, &widths));
    }
    out
}

fn preview_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:>w$}"))
        .collect::<Vec<_>>()
        .join("  ")
}
