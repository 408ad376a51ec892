// src/dates/mod.rs

pub mod reader;

pub use reader::{collect_dates, read_dates};

use calamine::Data;
use chrono::{Datelike, Days, NaiveDate};
use std::{fmt, str::FromStr};

/// Layouts tried in order; day-first wins for ambiguous `NN-NN-YYYY` input.
const TEXT_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%b-%Y", "%Y-%m-%d"];

const TOKEN_FORMAT: &str = "%d-%m-%Y";

/// A date in the `DD-MM-YYYY` form the lake-level page expects in its query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateToken(String);

impl DateToken {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(TOKEN_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DateToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_date_text(s)
            .map(Self::from_date)
            .ok_or_else(|| format!("not a day-first date: {s:?}"))
    }
}

/// Result of reading one spreadsheet cell as a date.
#[derive(Debug, PartialEq)]
pub enum CellDate {
    Empty,
    Date(DateToken),
    Invalid(String),
}

/// Parse free text as a day-first date. Anything after the first space or
/// ISO `T` separator (a time of day, usually) is ignored.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split(' ').next()?;
    parse_layouts(date_part).or_else(|| {
        let (day, _) = date_part.split_once('T')?;
        parse_layouts(day)
    })
}

fn parse_layouts(text: &str) -> Option<NaiveDate> {
    TEXT_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .filter(|d| (1900..=9999).contains(&d.year()))
}

/// Excel 1900-system serial day number to a calendar date.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as u64;
    // serial 60 is the phantom 1900-02-29
    let epoch = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(days))
}

pub fn cell_to_date(cell: &Data) -> CellDate {
    let parsed = match cell {
        Data::Empty => return CellDate::Empty,
        Data::String(s) if s.trim().is_empty() => return CellDate::Empty,
        Data::String(s) | Data::DateTimeIso(s) => parse_date_text(s),
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| ndt.date()),
        Data::Float(f) => from_excel_serial(*f),
        Data::Int(i) => from_excel_serial(*i as f64),
        _ => None,
    };
    match parsed {
        Some(date) => CellDate::Date(DateToken::from_date(date)),
        None => CellDate::Invalid(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    fn token(s: &str) -> CellDate {
        CellDate::Date(DateToken(s.to_string()))
    }

    fn text(s: &str) -> CellDate {
        cell_to_date(&Data::String(s.into()))
    }

    #[test]
    fn time_of_day_suffix_is_dropped() {
        assert_eq!(text("04-08-2023 10:30:00"), token("04-08-2023"));
        assert_eq!(text("2023-08-04 10:30:00"), token("04-08-2023"));
    }

    #[test]
    fn iso_datetime_text_keeps_the_date() {
        assert_eq!(text("2023-08-04T10:30:00"), token("04-08-2023"));
        assert_eq!(text("2023-08-04T00:00:00.000"), token("04-08-2023"));
    }

    #[test]
    fn ambiguous_dates_are_day_first() {
        assert_eq!(text("03-04-2023"), token("03-04-2023"));
        assert_eq!(
            parse_date_text("03/04/2023"),
            NaiveDate::from_ymd_opt(2023, 4, 3)
        );
    }

    #[test]
    fn accepted_text_layouts() {
        let layouts = [
            "4-8-2023",
            "04/08/2023",
            "04.08.2023",
            "04-Aug-2023",
            "2023-08-04",
        ];
        for raw in layouts {
            assert_eq!(text(raw), token("04-08-2023"), "{raw}");
        }
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        for raw in ["hello", "31-02-2023", "04-08-23", "13-13-2023"] {
            assert!(matches!(text(raw), CellDate::Invalid(_)), "{raw}");
        }
        let flag = cell_to_date(&Data::Bool(true));
        assert!(matches!(flag, CellDate::Invalid(_)));
    }

    #[test]
    fn native_datetime_cells() {
        let dt = ExcelDateTime::new(45142.4375, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_to_date(&Data::DateTime(dt)), token("04-08-2023"));

        let iso = Data::DateTimeIso("2023-08-04T10:30:00".into());
        assert_eq!(cell_to_date(&iso), token("04-08-2023"));
    }

    #[test]
    fn numeric_cells_are_excel_serials() {
        assert_eq!(cell_to_date(&Data::Float(45142.0)), token("04-08-2023"));
        assert_eq!(cell_to_date(&Data::Int(45142)), token("04-08-2023"));
        assert_eq!(from_excel_serial(1.0), NaiveDate::from_ymd_opt(1900, 1, 1));
        assert_eq!(from_excel_serial(61.0), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_eq!(from_excel_serial(0.0), None);
        assert_eq!(from_excel_serial(f64::NAN), None);
    }

    #[test]
    fn blank_cells_are_empty_not_invalid() {
        assert_eq!(cell_to_date(&Data::Empty), CellDate::Empty);
        assert_eq!(text("   "), CellDate::Empty);
    }

    #[test]
    fn token_from_str() {
        let t: DateToken = "04-08-2023".parse().unwrap();
        assert_eq!(t.as_str(), "04-08-2023");
        assert_eq!(t.to_string(), "04-08-2023");
        assert!("yesterday".parse::<DateToken>().is_err());
    }
}
