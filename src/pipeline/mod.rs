//! generator -> extract -> accumulate -> render -> one write per report page.

mod accumulator;
mod publish;
mod render;

pub use accumulator::{Accumulator, Admission, Buckets, Ordering, Rank, Truncation};
pub use publish::{Publisher, Target};
pub use render::{document, fill};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::error::Result;
use crate::wiki::Page;

pub const DEFAULT_MAXLINES: usize = 1000;

/// Anything the pipeline can key results by.
pub trait Record {
    fn key(&self) -> String;
}

impl Record for Page {
    fn key(&self) -> String {
        self.title.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Iterating,
    Rendering,
    Writing,
    Done,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub seen: usize,
    pub skipped: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub evicted: usize,
    pub rows: usize,
    pub pages_written: usize,
}

impl RunStats {
    fn admit(&mut self, admission: Admission) {
        match admission {
            Admission::Accepted => self.accepted += 1,
            Admission::Duplicate => self.duplicates += 1,
            Admission::Rejected => self.rejected += 1,
            Admission::Evicted(key) => {
                self.accepted += 1;
                self.evicted += 1;
                debug!("evicted {}", key);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    header: String,
    footer: String,
    maxlines: usize,
    truncation: Truncation,
    ordering: Ordering,
}

pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.report.header = header.into();
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.report.footer = footer.into();
        self
    }

    pub fn maxlines(mut self, maxlines: usize) -> Self {
        self.report.maxlines = maxlines;
        self
    }

    pub fn truncation(mut self, truncation: Truncation) -> Self {
        self.report.truncation = truncation;
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.report.ordering = ordering;
        self
    }

    pub fn build(self) -> Report {
        self.report
    }
}

impl Report {
    pub fn builder(name: &str) -> ReportBuilder {
        ReportBuilder {
            report: Report {
                name: name.to_string(),
                header: String::new(),
                footer: String::new(),
                maxlines: DEFAULT_MAXLINES,
                truncation: Truncation::FirstN,
                ordering: Ordering::Insertion,
            },
        }
    }

    /// Runs `extract` over every record. Soft errors skip the record, any
    /// other error ends the run before anything is rendered.
    pub fn collect<R, V, I, F>(&self, records: I, extract: F) -> Result<(Accumulator<V>, RunStats)>
    where
        R: Record,
        V: Rank,
        I: IntoIterator<Item = Result<R>>,
        F: FnMut(&R) -> Result<Option<V>>,
    {
        let mut acc = Accumulator::new(self.maxlines, self.truncation);
        let stats = self.drive(records, extract, |key, value| acc.insert(key, value))?;
        Ok((acc, stats))
    }

    pub fn collect_buckets<R, B, V, I, F>(&self, records: I, extract: F) -> Result<(Buckets<B, V>, RunStats)>
    where
        R: Record,
        B: Ord,
        V: Rank,
        I: IntoIterator<Item = Result<R>>,
        F: FnMut(&R) -> Result<Option<(B, V)>>,
    {
        let mut buckets = Buckets::new(self.maxlines, self.truncation);
        let stats = self.drive(records, extract, |key, (bucket, value)| {
            buckets.insert(bucket, key, value)
        })?;
        Ok((buckets, stats))
    }

    fn drive<R, T, I, F, S>(&self, records: I, mut extract: F, mut sink: S) -> Result<RunStats>
    where
        R: Record,
        I: IntoIterator<Item = Result<R>>,
        F: FnMut(&R) -> Result<Option<T>>,
        S: FnMut(String, T) -> Admission,
    {
        debug!(report = %self.name, stage = ?Stage::Iterating);
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} pages ({per_sec}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let mut stats = RunStats::default();
        let outcome = (|| {
            for record in records {
                stats.seen += 1;
                pb.inc(1);
                let record = match record {
                    Ok(r) => r,
                    Err(e) if e.is_soft() => {
                        debug!("skipped: {}", e);
                        stats.skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                match extract(&record) {
                    Ok(Some(value)) => {
                        let key = record.key();
                        pb.set_message(key.clone());
                        stats.admit(sink(key, value));
                    }
                    Ok(None) => stats.skipped += 1,
                    Err(e) if e.is_soft() => {
                        debug!("skipped {}: {}", record.key(), e);
                        stats.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })();
        pb.finish_and_clear();
        outcome?;
        Ok(stats)
    }

    /// Header, rows in this report's order, footer. `bucket` fills the
    /// `{bucket}` placeholder.
    pub fn render<V, W>(&self, acc: &Accumulator<V>, bucket: &str, row: W) -> String
    where
        W: Fn(&str, &V) -> String,
    {
        debug!(report = %self.name, stage = ?Stage::Rendering, rows = acc.len());
        let rows: Vec<String> = acc
            .sorted(self.ordering)
            .into_iter()
            .map(|e| row(&e.key, &e.value))
            .collect();
        let vars = [
            ("count", rows.len().to_string()),
            ("bucket", bucket.to_string()),
            ("name", self.name.clone()),
        ];
        document(&fill(&self.header, &vars), &rows, &fill(&self.footer, &vars))
    }

    /// Collect, render and write a single-page report.
    pub fn run<R, V, I, F, W>(
        &self,
        records: I,
        extract: F,
        row: W,
        target: &Target,
        publisher: &Publisher,
    ) -> Result<RunStats>
    where
        R: Record,
        V: Rank,
        I: IntoIterator<Item = Result<R>>,
        F: FnMut(&R) -> Result<Option<V>>,
        W: Fn(&str, &V) -> String,
    {
        let (acc, mut stats) = self.collect(records, extract)?;
        let doc = self.render(&acc, "", row);
        debug!(report = %self.name, stage = ?Stage::Writing);
        publisher.publish(target, &doc, acc.len())?;
        stats.rows = acc.len();
        stats.pages_written = 1;
        self.done(&stats);
        Ok(stats)
    }

    /// One independent page per bucket, written to `target.sub(label)`.
    /// Every bucket in `domain` is written, empty ones included, so a page
    /// left over from an earlier run never goes stale.
    pub fn run_buckets<R, B, V, I, F, W, L>(
        &self,
        records: I,
        extract: F,
        row: W,
        label: L,
        domain: &[B],
        target: &Target,
        publisher: &Publisher,
    ) -> Result<RunStats>
    where
        R: Record,
        B: Ord + Clone,
        V: Rank,
        I: IntoIterator<Item = Result<R>>,
        F: FnMut(&R) -> Result<Option<(B, V)>>,
        W: Fn(&str, &V) -> String,
        L: Fn(&B) -> String,
    {
        let (mut buckets, mut stats) = self.collect_buckets(records, extract)?;
        for bucket in domain {
            buckets.ensure(bucket.clone());
        }
        for (bucket, acc) in buckets.iter() {
            let name = label(bucket);
            if acc.is_empty() {
                debug!(report = %self.name, bucket = %name, "empty bucket");
            }
            let doc = self.render(acc, &name, &row);
            debug!(report = %self.name, stage = ?Stage::Writing, bucket = %name);
            publisher.publish(&target.sub(&name), &doc, acc.len())?;
            stats.pages_written += 1;
        }
        stats.rows = buckets.total();
        self.done(&stats);
        Ok(stats)
    }

    fn done(&self, stats: &RunStats) {
        debug!(report = %self.name, stage = ?Stage::Done);
        info!(
            "{}: {} seen, {} skipped, {} rows on {} page(s)",
            self.name, stats.seen, stats.skipped, stats.rows, stats.pages_written
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::wiki::memory::MemoryWiki;

    fn pages(counts: &[(&str, u64)]) -> Vec<Result<Page>> {
        counts
            .iter()
            .map(|(t, n)| Ok(Page::article(t, &"x".repeat(*n as usize))))
            .collect()
    }

    fn text_len(p: &Page) -> Result<Option<u64>> {
        Ok(match p.text.len() {
            0 => None,
            n => Some(n as u64),
        })
    }

    fn row(key: &str, n: &u64) -> String {
        format!("# [[{}]] ({})", key, n)
    }

    #[test]
    fn none_is_never_accumulated() {
        let report = Report::builder("t").build();
        let (acc, stats) = report
            .collect(pages(&[("A", 3), ("B", 0), ("C", 1)]), text_len)
            .unwrap();
        let keys: Vec<&str> = acc.sorted(Ordering::Insertion).iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "C"]);
        assert_eq!(stats.seen, 3);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn rows_never_exceed_maxlines() {
        let input: Vec<(String, u64)> = (1..=50).map(|i| (format!("P{}", i), i)).collect();
        let refs: Vec<(&str, u64)> = input.iter().map(|(t, n)| (t.as_str(), *n)).collect();
        for truncation in [Truncation::FirstN, Truncation::TopK] {
            let report = Report::builder("t")
                .header("{count}")
                .maxlines(7)
                .truncation(truncation)
                .build();
            let (acc, _) = report.collect(pages(&refs), text_len).unwrap();
            let doc = report.render(&acc, "", row);
            assert_eq!(doc.lines().filter(|l| l.starts_with('#')).count(), 7);
            assert!(doc.starts_with("7\n"));
        }
    }

    #[test]
    fn top_k_scenario() {
        let report = Report::builder("rev")
            .maxlines(2)
            .truncation(Truncation::TopK)
            .ordering(Ordering::CountDesc)
            .build();
        let (acc, stats) = report
            .collect(pages(&[("A", 10), ("B", 20), ("C", 15), ("D", 5)]), text_len)
            .unwrap();
        assert_eq!(report.render(&acc, "", row), "# [[B]] (20)\n# [[C]] (15)\n");
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn render_is_idempotent() {
        let report = Report::builder("t")
            .header("== {name} ==")
            .footer("~~~~~")
            .ordering(Ordering::KeyAsc)
            .build();
        let input = [("Zebra", 2), ("Ąbc", 1), ("Mysz", 4)];
        let first = report.collect(pages(&input), text_len).unwrap().0;
        let second = report.collect(pages(&input), text_len).unwrap().0;
        assert_eq!(report.render(&first, "", row), report.render(&second, "", row));
        assert_eq!(
            report.render(&first, "", row),
            "== t ==\n# [[Ąbc]] (1)\n# [[Mysz]] (4)\n# [[Zebra]] (2)\n~~~~~"
        );
    }

    #[test]
    fn soft_errors_skip_hard_errors_abort() {
        let report = Report::builder("t").build();
        let input = vec![
            Ok(Page::article("A", "xx")),
            Err(BotError::MissingPage("B".into())),
            Ok(Page::article("C", "#PATRZ [[A]]")),
        ];
        let (acc, stats) = report
            .collect(input, |p: &Page| {
                p.require(&crate::wiki::Requires::ARTICLE)?;
                text_len(p)
            })
            .unwrap();
        assert_eq!(acc.len(), 1);
        assert_eq!(stats.skipped, 2);

        let input = vec![
            Ok(Page::article("A", "xx")),
            Err(BotError::Api {
                code: "internal".into(),
                info: "boom".into(),
            }),
        ];
        assert!(report.collect(input, text_len).is_err());
    }

    #[test]
    fn run_writes_once() {
        let wiki = MemoryWiki::default();
        let publisher = Publisher::new(&wiki, false, "aktualizacja", None);
        let report = Report::builder("t").header("Lista").build();
        let stats = report
            .run(pages(&[("A", 1)]), text_len, row, &Target::Page("Raport".into()), &publisher)
            .unwrap();
        assert_eq!(stats.pages_written, 1);
        assert_eq!(wiki.saves.borrow().len(), 1);
        assert_eq!(wiki.text_of("Raport").as_deref(), Some("Lista\n# [[A]] (1)\n"));
    }

    #[test]
    fn failed_write_aborts_run() {
        let wiki = MemoryWiki {
            fail_saves: true,
            ..Default::default()
        };
        let publisher = Publisher::new(&wiki, false, "aktualizacja", None);
        let report = Report::builder("t").build();
        let result = report.run(pages(&[("A", 1)]), text_len, row, &Target::Page("Raport".into()), &publisher);
        assert!(result.is_err());
    }

    #[test]
    fn buckets_become_separate_pages() {
        let wiki = MemoryWiki::default();
        let publisher = Publisher::new(&wiki, false, "aktualizacja", None);
        let report = Report::builder("t").header("{bucket}: {count}").build();
        let stats = report
            .run_buckets(
                pages(&[("A", 1), ("B", 2), ("C", 3)]),
                |p: &Page| Ok(Some((p.text.len() % 2, p.text.len() as u64))),
                row,
                |b: &usize| if *b == 0 { "parzyste".to_string() } else { "nieparzyste".to_string() },
                &[0, 1],
                &Target::Page("Raport".into()),
                &publisher,
            )
            .unwrap();
        assert_eq!(stats.pages_written, 2);
        assert_eq!(stats.rows, 3);
        assert_eq!(wiki.text_of("Raport/parzyste").as_deref(), Some("parzyste: 1\n# [[B]] (2)\n"));
        assert!(wiki.text_of("Raport/nieparzyste").unwrap().starts_with("nieparzyste: 2\n"));
    }

    #[test]
    fn empty_buckets_are_still_written() {
        let wiki = MemoryWiki::with_pages(vec![Page::article("Raport/pusty", "# [[Stary wpis]]")]);
        let publisher = Publisher::new(&wiki, false, "aktualizacja", None);
        let report = Report::builder("t").header("{bucket}: {count}").build();
        let stats = report
            .run_buckets(
                pages(&[("A", 1)]),
                |p: &Page| Ok(Some((1u8, p.text.len() as u64))),
                row,
                |b: &u8| if *b == 0 { "pusty".to_string() } else { "pełny".to_string() },
                &[0, 1],
                &Target::Page("Raport".into()),
                &publisher,
            )
            .unwrap();
        assert_eq!(stats.pages_written, 2);
        assert_eq!(stats.rows, 1);
        assert_eq!(wiki.text_of("Raport/pusty").as_deref(), Some("pusty: 0\n"));
    }
}
