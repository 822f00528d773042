//! Articles linking to disambiguation pages.

use itertools::Itertools;

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source, Wiki};
use crate::wikitext::{article_links, templates};

/// Article links outside other-meanings hatnotes, sorted and de-duplicated.
pub fn candidate_links(text: &str, other_meanings: &[String]) -> Vec<String> {
    let hatnotes: Vec<_> = templates(text)
        .into_iter()
        .filter(|t| t.depth == 0 && t.is_one_of(other_meanings))
        .map(|t| t.span)
        .collect();

    let mut body = String::with_capacity(text.len());
    let mut pos = 0;
    for span in &hatnotes {
        body.push_str(&text[pos..span.start]);
        pos = span.end;
    }
    body.push_str(&text[pos..]);

    article_links(&body).into_iter().sorted().dedup().collect()
}

/// Linked titles that are disambiguation pages, or `None` when there are
/// none.
pub fn disambig_links(wiki: &dyn Wiki, page: &Page, other_meanings: &[String]) -> Result<Option<Vec<String>>> {
    let candidates = candidate_links(&page.text, other_meanings);
    if candidates.is_empty() {
        return Ok(None);
    }
    let disambigs = wiki.disambiguations(&candidates)?;
    let found: Vec<String> = candidates.into_iter().filter(|t| disambigs.contains(t)).collect();
    Ok((!found.is_empty()).then_some(found))
}

pub fn row(title: &str, targets: &Vec<String>) -> String {
    let links = targets.iter().map(|t| format!("[[{}]]", t)).join(", ");
    format!("# [[{}]] ({}): {}", title, targets.len(), links)
}

pub fn run(ctx: &Context, source: &Source) -> Result<RunStats> {
    let report = Report::builder("disambig")
        .header("Artykuły z linkami do stron ujednoznaczniających (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::CountDesc)
        .build();
    let wiki = ctx.wiki();
    let other_meanings = &ctx.settings.templates.other_meanings;

    report.run(
        wiki.pages(source)?,
        |page: &Page| -> Result<Option<Vec<String>>> {
            page.require(&Requires::ARTICLE)?;
            if page.is_disambig {
                return Ok(None);
            }
            disambig_links(wiki, page, other_meanings)
        },
        row,
        &ctx.target("Wikipedysta:Bot/Linki do ujednoznacznień"),
        &ctx.publisher,
    )
}
