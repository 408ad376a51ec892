// src/batch.rs

use anyhow::Result;
use std::{
    future::{pending, Future},
    io,
    path::Path,
};
use tokio::time::sleep;
use tracing::{info, warn};

pub use crate::config::SchemaPolicy;
use crate::dates::DateToken;
use crate::fetch::PageSource;
use crate::output::{write_xlsx, Sheet};
use crate::session::{DateBlock, Session};

/// Collects rows across dates against the header set of the first date that
/// produced data.
#[derive(Debug)]
pub struct Accumulator {
    policy: SchemaPolicy,
    headers: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl Accumulator {
    pub fn new(policy: SchemaPolicy) -> Self {
        Self {
            policy,
            headers: None,
            rows: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Add one date's rows; returns how many were kept.
    pub fn push(&mut self, block: DateBlock) -> usize {
        if block.is_empty() {
            return 0;
        }
        let DateBlock { date, extraction } = block;
        let recorded = self
            .headers
            .get_or_insert_with(|| extraction.headers.clone());
        if *recorded == extraction.headers {
            let n = extraction.rows.len();
            self.rows.extend(extraction.rows);
            return n;
        }

        match self.policy {
            SchemaPolicy::Strict => {
                warn!(
                    date = %date,
                    "headers {:?} differ from recorded {:?}; skipping date",
                    extraction.headers, recorded
                );
                0
            }
            SchemaPolicy::Align => {
                warn!(
                    date = %date,
                    "headers {:?} differ from recorded {:?}; realigning",
                    extraction.headers, recorded
                );
                let positions: Vec<Option<usize>> = recorded
                    .iter()
                    .map(|h| extraction.headers.iter().position(|b| b == h))
                    .collect();
                let token = date.to_string();
                for row in &extraction.rows {
                    self.rows.push(realign(row, &positions, &token));
                }
                extraction.rows.len()
            }
        }
    }

    pub fn finish(self) -> Option<Sheet> {
        match self.headers {
            Some(headers) if !self.rows.is_empty() => Some(Sheet::new(headers, self.rows)),
            _ => None,
        }
    }
}

/// Reorder `row` to the recorded schema and append the date again.
fn realign(row: &[String], positions: &[Option<usize>], date: &str) -> Vec<String> {
    let mut out: Vec<String> = positions
        .iter()
        .map(|p| p.and_then(|i| row.get(i).cloned()).unwrap_or_default())
        .collect();
    out.push(date.to_string());
    out
}

#[derive(Debug, PartialEq)]
pub enum BatchOutcome {
    /// Rows were written to the output file.
    Written {
        records: usize,
        unique_dates: usize,
        columns: Vec<String>,
    },
    /// Every date came back empty; no file was written.
    NothingExtracted,
    /// The interrupt fired before the loop finished; no file was written.
    Interrupted,
}

/// Scrape every date in order and write the accumulated rows to `output`.
/// If `interrupt` resolves with `Ok` first the loop stops and nothing is
/// written. An `Err` means no interrupt can arrive and the loop runs on.
pub async fn run_batch<S, F>(
    session: &Session<S>,
    dates: &[DateToken],
    output: &Path,
    policy: SchemaPolicy,
    interrupt: F,
) -> Result<BatchOutcome>
where
    S: PageSource,
    F: Future<Output = io::Result<()>>,
{
    let total = dates.len();
    info!("{} dates to process (with duplicates)", total);

    let interrupt = async {
        if let Err(e) = interrupt.await {
            warn!(error = %e, "cannot listen for interrupts; running to completion");
            pending::<()>().await;
        }
    };

    let mut acc = Accumulator::new(policy);
    let finished = {
        let work = async {
            for (i, date) in dates.iter().enumerate() {
                info!("processing {}/{}: {}", i + 1, total, date);
                let block = session.scrape_date(date).await;
                match acc.push(block) {
                    0 => info!(date = %date, "no records kept"),
                    n => info!(date = %date, "found {} reservoir records", n),
                }
                sleep(session.politeness_delay()).await;
            }
        };
        tokio::select! {
            biased;
            _ = interrupt => false,
            _ = work => true,
        }
    };

    if !finished {
        warn!("scraping interrupted by user; nothing saved");
        return Ok(BatchOutcome::Interrupted);
    }

    let Some(sheet) = acc.finish() else {
        warn!("no data was successfully extracted");
        return Ok(BatchOutcome::NothingExtracted);
    };

    write_xlsx(output, &sheet)?;
    let outcome = BatchOutcome::Written {
        records: sheet.rows.len(),
        unique_dates: sheet.unique_dates(),
        columns: sheet.headers.clone(),
    };
    info!(
        path = %output.display(),
        records = sheet.rows.len(),
        unique_dates = sheet.unique_dates(),
        "data saved; columns extracted: {:?}",
        sheet.headers
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::Extraction;
    use crate::session::fake::{lake_page, test_config, FakeSource};
    use calamine::{open_workbook, Reader, Xlsx};
    use std::future::{ready, Pending, Ready};
    use std::time::Duration;
    use tempfile::tempdir;
    use tracing_subscriber::{fmt, EnvFilter};

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(false)
            .try_init();
    }

    fn token(s: &str) -> DateToken {
        s.parse().unwrap()
    }

    fn never() -> Pending<io::Result<()>> {
        pending()
    }

    fn now() -> Ready<io::Result<()>> {
        ready(Ok(()))
    }

    async fn after(ms: u64) -> io::Result<()> {
        sleep(Duration::from_millis(ms)).await;
        Ok(())
    }

    fn block(date: &str, headers: &[&str], rows: &[&[&str]]) -> DateBlock {
        let rows = rows
            .iter()
            .map(|r| {
                let mut row: Vec<String> = r.iter().map(|c| c.to_string()).collect();
                row.push(date.to_string());
                row
            })
            .collect();
        DateBlock {
            date: token(date),
            extraction: Extraction {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows,
            },
        }
    }

    fn full_page() -> String {
        lake_page(
            &["RESERVOIR", "Level (ft)", "Storage (mcft)"],
            &[
                &["POONDI", "30.15", "2147"],
                &["PUZHAL", "18.20", "2650"],
            ],
        )
    }

    fn read_back(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow::anyhow!("no sheets"))??;
        let cells = range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        Ok(cells)
    }

    #[test]
    fn first_nonempty_date_fixes_headers() {
        let mut acc = Accumulator::new(SchemaPolicy::Align);
        assert_eq!(acc.push(DateBlock::empty(token("03-08-2023"))), 0);
        assert_eq!(acc.headers(), None);

        let kept = acc.push(block("04-08-2023", &["RESERVOIR"], &[&["POONDI"]]));
        assert_eq!(kept, 1);
        assert_eq!(acc.headers(), Some(&["RESERVOIR".to_string()][..]));

        let sheet = acc.finish().unwrap();
        assert_eq!(sheet.headers, vec!["RESERVOIR", "Date"]);
        assert_eq!(sheet.rows, vec![vec!["POONDI", "04-08-2023"]]);
    }

    #[test]
    fn align_policy_realigns_drifted_rows() {
        let mut acc = Accumulator::new(SchemaPolicy::Align);
        let recorded = ["RESERVOIR", "Level (ft)", "Storage (mcft)"];
        acc.push(block("04-08-2023", &recorded, &[&["POONDI", "30.15", "2147"]]));

        let drifted = ["Storage (mcft)", "RESERVOIR"];
        let kept = acc.push(block("05-08-2023", &drifted, &[&["2140", "POONDI"]]));
        assert_eq!(kept, 1);
        assert_eq!(acc.rows()[1], vec!["POONDI", "", "2140", "05-08-2023"]);
    }

    #[test]
    fn strict_policy_skips_drifted_dates() {
        let mut acc = Accumulator::new(SchemaPolicy::Strict);
        let recorded = ["RESERVOIR", "Level (ft)"];
        acc.push(block("04-08-2023", &recorded, &[&["POONDI", "30.15"]]));

        let kept = acc.push(block("05-08-2023", &["RESERVOIR"], &[&["POONDI"]]));
        assert_eq!(kept, 0);
        assert_eq!(acc.rows().len(), 1);
    }

    #[test]
    fn nothing_pushed_finishes_empty() {
        assert_eq!(Accumulator::new(SchemaPolicy::Align).finish(), None);
    }

    #[tokio::test]
    async fn duplicate_dates_are_scraped_twice() -> Result<()> {
        init_logging();
        let tmp = tempdir()?;
        let out = tmp.path().join("lake_level_extract.xlsx");
        let source = FakeSource::default().with_page("04-08-2023", full_page());
        let session = Session::new(source, &test_config(&["RESERVOIR", "Level (ft)"]))?;
        let dates = ["04-08-2023", "04-08-2023"].map(token);

        let outcome = run_batch(&session, &dates, &out, SchemaPolicy::Align, never()).await?;
        assert_eq!(
            outcome,
            BatchOutcome::Written {
                records: 4,
                unique_dates: 1,
                columns: vec!["RESERVOIR".into(), "Level (ft)".into(), "Date".into()],
            }
        );
        assert_eq!(session.source().load_count(), 2);

        let cells = read_back(&out)?;
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0], vec!["RESERVOIR", "Level (ft)", "Date"]);
        assert_eq!(cells[3], vec!["POONDI", "30.15", "04-08-2023"]);
        Ok(())
    }

    #[tokio::test]
    async fn failing_dates_do_not_abort_the_batch() -> Result<()> {
        init_logging();
        let tmp = tempdir()?;
        let out = tmp.path().join("out.xlsx");
        let source = FakeSource::default()
            .with_page("05-08-2023", full_page())
            .with_page("06-08-2023", "<html><body>maintenance</body></html>");
        let session = Session::new(source, &test_config(&["RESERVOIR", "NotARealHeader"]))?;
        let dates = ["04-08-2023", "05-08-2023", "06-08-2023"].map(token);

        let outcome = run_batch(&session, &dates, &out, SchemaPolicy::Align, never()).await?;
        assert_eq!(
            outcome,
            BatchOutcome::Written {
                records: 2,
                unique_dates: 1,
                columns: vec!["RESERVOIR".into(), "Date".into()],
            }
        );
        assert_eq!(session.source().load_count(), 3);
        let cells = read_back(&out)?;
        assert_eq!(cells[1], vec!["POONDI", "05-08-2023"]);
        Ok(())
    }

    #[tokio::test]
    async fn no_matches_anywhere_writes_nothing() -> Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join("out.xlsx");
        let source = FakeSource::default().with_page("04-08-2023", full_page());
        let session = Session::new(source, &test_config(&["Foo"]))?;
        let dates = [token("04-08-2023")];

        let outcome = run_batch(&session, &dates, &out, SchemaPolicy::Align, never()).await?;
        assert_eq!(outcome, BatchOutcome::NothingExtracted);
        assert!(!out.exists());
        Ok(())
    }

    #[tokio::test]
    async fn ready_interrupt_stops_before_any_load() -> Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join("out.xlsx");
        let source = FakeSource::default().with_page("04-08-2023", full_page());
        let session = Session::new(source, &test_config(&["RESERVOIR"]))?;
        let dates = [token("04-08-2023")];

        let outcome = run_batch(&session, &dates, &out, SchemaPolicy::Align, now()).await?;
        assert_eq!(outcome, BatchOutcome::Interrupted);
        assert_eq!(session.source().load_count(), 0);
        assert!(!out.exists());
        Ok(())
    }

    #[tokio::test]
    async fn interrupt_mid_run_discards_accumulated_rows() -> Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join("out.xlsx");
        let source = FakeSource::default().with_page("04-08-2023", full_page());
        let cfg = Config {
            politeness_delay_ms: 10_000,
            ..test_config(&["RESERVOIR"])
        };
        let session = Session::new(source, &cfg)?;
        let dates = ["04-08-2023", "04-08-2023"].map(token);

        let outcome = run_batch(&session, &dates, &out, SchemaPolicy::Align, after(50)).await?;
        assert_eq!(outcome, BatchOutcome::Interrupted);
        assert_eq!(session.source().load_count(), 1);
        assert!(!out.exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_interrupt_listener_lets_the_batch_finish() -> Result<()> {
        init_logging();
        let tmp = tempdir()?;
        let out = tmp.path().join("out.xlsx");
        let source = FakeSource::default().with_page("04-08-2023", full_page());
        let session = Session::new(source, &test_config(&["RESERVOIR"]))?;
        let dates = [token("04-08-2023")];

        let broken = ready(Err(io::Error::new(io::ErrorKind::Other, "no signal driver")));
        let outcome = run_batch(&session, &dates, &out, SchemaPolicy::Align, broken).await?;
        assert!(matches!(outcome, BatchOutcome::Written { records: 2, .. }));
        assert_eq!(session.source().load_count(), 1);
        assert!(out.exists());
        Ok(())
    }
}
