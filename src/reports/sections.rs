//! Articles whose closing sections are out of the usual order.

use itertools::Itertools;

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source};
use crate::wikitext::{headings, names_match};

/// Known end sections in the order they appear, when that order differs
/// from `expected`.
pub fn misordered(text: &str, expected: &[String]) -> Option<Vec<String>> {
    let found: Vec<(usize, String)> = headings(text)
        .into_iter()
        .filter(|h| h.level == 2)
        .filter_map(|h| {
            expected
                .iter()
                .position(|e| names_match(e, &h.title))
                .map(|i| (i, h.title))
        })
        .collect();
    if found.iter().tuple_windows().all(|((a, _), (b, _))| a <= b) {
        return None;
    }
    Some(found.into_iter().map(|(_, title)| title).collect())
}

pub fn run(ctx: &Context, source: &Source) -> Result<RunStats> {
    let report = Report::builder("sections")
        .header("Artykuły z sekcjami końcowymi w złej kolejności (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::Insertion)
        .build();
    let expected = &ctx.settings.templates.end_sections;

    report.run(
        ctx.wiki().pages(source)?,
        |page: &Page| -> Result<Option<Vec<String>>> {
            page.require(&Requires::ARTICLE)?;
            Ok(misordered(&page.text, expected))
        },
        |title, found| format!("# [[{}]]: {}", title, found.join(" → ")),
        &ctx.target("Wikipedysta:Bot/Kolejność sekcji"),
        &ctx.publisher,
    )
}
