//! One module per bot: a pure extraction function, a row format and the
//! wiring into [`Report`].

pub mod cleanup;
pub mod deadlinks;
pub mod disambig;
pub mod gender;
pub mod insert;
pub mod links;
pub mod newpages;
pub mod presence;
pub mod revisions;
pub mod sections;

use crate::error::Result;
use crate::pipeline::{Publisher, Rank, Record, Report, RunStats, Target};
use crate::settings::Settings;
use crate::wiki::Wiki;

/// Shared per-run state handed to every report.
pub struct Context<'a> {
    pub publisher: Publisher<'a>,
    pub settings: &'a Settings,
    pub maxlines: usize,
    pub outpage: Option<String>,
}

impl<'a> Context<'a> {
    pub fn wiki(&self) -> &'a dyn Wiki {
        self.publisher.wiki()
    }

    pub fn target(&self, default: &str) -> Target {
        Target::Page(self.outpage.clone().unwrap_or_else(|| default.to_string()))
    }
}

/// For bots that edit pages: the list of touched pages is only written when
/// an output page was asked for.
pub(crate) fn run_edits<R, V, I, F, W>(
    ctx: &Context,
    report: &Report,
    records: I,
    extract: F,
    row: W,
) -> Result<RunStats>
where
    R: Record,
    V: Rank,
    I: IntoIterator<Item = Result<R>>,
    F: FnMut(&R) -> Result<Option<V>>,
    W: Fn(&str, &V) -> String,
{
    match &ctx.outpage {
        Some(title) => report.run(records, extract, row, &Target::Page(title.clone()), &ctx.publisher),
        None => {
            let (acc, mut stats) = report.collect(records, extract)?;
            stats.rows = acc.len();
            Ok(stats)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Context;
    use crate::pipeline::Publisher;
    use crate::settings::Settings;
    use crate::wiki::memory::MemoryWiki;

    pub fn context<'a>(wiki: &'a MemoryWiki, settings: &'a Settings, outpage: Option<&str>) -> Context<'a> {
        Context {
            publisher: Publisher::new(wiki, false, "test", None),
            settings,
            maxlines: 1000,
            outpage: outpage.map(str::to_string),
        }
    }

    pub fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }
}
