//! Poorly linked articles, one page per tier of outgoing article links.

use itertools::Itertools;

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source};
use crate::wikitext::article_links;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    None,
    One,
    Few,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::None, Tier::One, Tier::Few];

    /// Articles with more than five distinct links are fine and get no tier.
    pub fn of(count: usize) -> Option<Tier> {
        match count {
            0 => Some(Tier::None),
            1 => Some(Tier::One),
            2..=5 => Some(Tier::Few),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::None => "0",
            Tier::One => "1",
            Tier::Few => "2-5",
        }
    }
}

pub fn link_count(text: &str) -> usize {
    article_links(text).into_iter().unique().count()
}

pub fn run(ctx: &Context, source: &Source) -> Result<RunStats> {
    let report = Report::builder("links")
        .header("Artykuły z liczbą linków wewnętrznych: {bucket} (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::KeyAsc)
        .build();

    report.run_buckets(
        ctx.wiki().pages(source)?,
        |page: &Page| -> Result<Option<(Tier, usize)>> {
            page.require(&Requires::ARTICLE)?;
            if page.is_disambig {
                return Ok(None);
            }
            let count = link_count(&page.text);
            Ok(Tier::of(count).map(|tier| (tier, count)))
        },
        |title, count| format!("# [[{}]] ({})", title, count),
        |t: &Tier| t.label().to_string(),
        &Tier::ALL,
        &ctx.target("Wikipedysta:Bot/Linki"),
        &ctx.publisher,
    )
}
