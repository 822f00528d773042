//! Most edited pages.

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source};

pub fn row(title: &str, count: &u64) -> String {
    format!("# [[{}]] – {}", title, count)
}

pub fn run(ctx: &Context, source: &Source) -> Result<RunStats> {
    let report = Report::builder("revisions")
        .header("Strony o największej liczbie edycji (stan na ~~~~~):")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::TopK)
        .ordering(Ordering::CountDesc)
        .build();
    let wiki = ctx.wiki();

    report.run(
        wiki.pages(source)?,
        |page: &Page| -> Result<Option<u64>> {
            page.require(&Requires::EXISTING)?;
            let count = wiki.revision_count(&page.title)?;
            Ok((count > 0).then_some(count))
        },
        row,
        &ctx.target("Wikipedysta:Bot/Najwięcej edycji"),
        &ctx.publisher,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::testing::context;
    use crate::settings::Settings;
    use crate::wiki::memory::MemoryWiki;

    #[test]
    fn keeps_most_edited() {
        let settings = Settings::default();
        let mut wiki = MemoryWiki::with_pages(
            ["A", "B", "C", "D"].iter().map(|t| Page::article(t, "x")).collect(),
        );
        wiki.revisions = [("A", 10), ("B", 20), ("C", 15), ("D", 5)]
            .iter()
            .map(|(t, n)| (t.to_string(), *n))
            .collect();
        let mut ctx = context(&wiki, &settings, Some("Raport"));
        ctx.maxlines = 2;

        let stats = run(&ctx, &Source::Namespace(0)).unwrap();
        assert_eq!(stats.evicted, 1);
        let out = wiki.text_of("Raport").unwrap();
        assert_eq!(out.lines().skip(1).collect::<Vec<_>>(), vec!["# [[B]] – 20", "# [[C]] – 15"]);
    }

    #[test]
    fn missing_history_skips_page() {
        let settings = Settings::default();
        let mut wiki = MemoryWiki::with_pages(vec![Page::article("A", "x"), Page::article("B", "x")]);
        wiki.revisions.insert("A".into(), 3);
        let ctx = context(&wiki, &settings, Some("Raport"));
        let stats = run(&ctx, &Source::Namespace(0)).unwrap();
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.skipped, 1);
    }
}
