//! Dead links that already have an archived copy.

use std::ops::Range;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::settings::TemplateNames;
use crate::wiki::{Page, Requires, Source};
use crate::wikitext::{find_templates, templates, Template};

static ARCHIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://web\.archive\.org/web/(\d{4,14})[a-z_]*/([^\s\]|}<]+)").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedLink {
    pub url: String,
    pub archive: String,
}

fn archived_citation(t: &Template, names: &TemplateNames) -> Option<ArchivedLink> {
    if !t.is_one_of(&names.citations) {
        return None;
    }
    let url = t.get_any(&names.url_params)?.trim();
    let archive = t.get_any(&names.archive_params)?.trim();
    Some(ArchivedLink {
        url: url.to_string(),
        archive: archive.to_string(),
    })
}

/// (weblink, archived link) pairs: citations with both parameters first,
/// then bare Wayback Machine links. Each archive URL appears once.
pub fn archived_links(text: &str, names: &TemplateNames) -> Vec<ArchivedLink> {
    let cited = templates(text)
        .into_iter()
        .filter_map(|t| archived_citation(&t, names))
        .collect::<Vec<_>>();
    let bare = ARCHIVE_RE.captures_iter(text).map(|caps| ArchivedLink {
        url: caps[2].to_string(),
        archive: caps[0].to_string(),
    });
    cited
        .into_iter()
        .chain(bare)
        .unique_by(|l| l.archive.clone())
        .collect()
}

/// Removes dead-link markers that directly follow a citation which already
/// carries an archived copy.
pub fn strip_dead_link_markers(text: &str, names: &TemplateNames) -> Option<String> {
    let all = templates(text);
    let citations: Vec<&Template> = all
        .iter()
        .filter(|t| archived_citation(t, names).is_some())
        .collect();

    let cuts: Vec<Range<usize>> = find_templates(&all, &names.dead_link)
        .filter_map(|marker| {
            citations
                .iter()
                .find(|c| c.span.end <= marker.span.start && text[c.span.end..marker.span.start].trim().is_empty())
                .map(|c| c.span.end..marker.span.end)
        })
        .collect();
    if cuts.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for cut in cuts {
        out.push_str(&text[pos..cut.start]);
        pos = cut.end;
    }
    out.push_str(&text[pos..]);
    Some(out)
}

pub fn row(title: &str, links: &Vec<ArchivedLink>) -> String {
    let pairs = links
        .iter()
        .map(|l| format!("{} → [{} archiwum]", l.url, l.archive))
        .join("; ");
    format!("# [[{}]]: {}", title, pairs)
}

pub fn run(ctx: &Context, source: &Source, fix: bool) -> Result<RunStats> {
    let report = Report::builder("deadlinks")
        .header("Zarchiwizowane martwe linki (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::KeyAsc)
        .build();
    let names = &ctx.settings.templates;

    let extract = |page: &Page| -> Result<Option<Vec<ArchivedLink>>> {
        page.require(&Requires::ARTICLE)?;
        if fix {
            if let Some(text) = strip_dead_link_markers(&page.text, names) {
                ctx.publisher.edit(&page.title, &page.text, &text, ctx.publisher.summary())?;
            }
        }
        let links = archived_links(&page.text, names);
        Ok((!links.is_empty()).then_some(links))
    };

    report.run(
        ctx.wiki().pages(source)?,
        extract,
        row,
        &ctx.target("Wikipedysta:Bot/Martwe linki"),
        &ctx.publisher,
    )
}
