//! Tags under-linked and uncategorised articles with the cleanup template.

use chrono::{DateTime, TimeZone};

use super::{run_edits, Context};
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::settings::TemplateNames;
use crate::wiki::{Page, Requires, Source};
use crate::wikitext::{article_links, categories, find_templates, templates};

pub const LINKS: &str = "linki";
pub const CATEGORY: &str = "kategoria";

/// `YYYY-MM` as used in cleanup template parameters.
pub fn month<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m").to_string()
}

/// Parameters the page deserves: `linki` without article links,
/// `kategoria` without categories.
pub fn wanted_params(text: &str) -> Vec<&'static str> {
    let mut wanted = Vec::new();
    if article_links(text).is_empty() {
        wanted.push(LINKS);
    }
    if categories(text).is_empty() {
        wanted.push(CATEGORY);
    }
    wanted
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEdit {
    pub text: String,
    pub added: Vec<&'static str>,
}

/// New text with the cleanup template inserted or completed, or `None`
/// when nothing is missing.
pub fn tag(text: &str, names: &TemplateNames, month: &str) -> Option<CleanupEdit> {
    let wanted = wanted_params(text);
    if wanted.is_empty() {
        return None;
    }
    let all = templates(text);
    let existing = find_templates(&all, &names.cleanup).find(|t| t.depth == 0);

    match existing {
        None => {
            let name = names.cleanup.first()?;
            let params: String = wanted.iter().map(|p| format!("|{}={}", p, month)).collect();
            Some(CleanupEdit {
                text: format!("{{{{{}{}}}}}\n{}", name, params, text),
                added: wanted,
            })
        }
        Some(t) => {
            let added: Vec<&'static str> = wanted.into_iter().filter(|p| !t.has_param(p)).collect();
            if added.is_empty() {
                return None;
            }
            let params: String = added.iter().map(|p| format!("|{}={}", p, month)).collect();
            let close = t.span.end - 2;
            let mut out = String::with_capacity(text.len() + params.len());
            out.push_str(&text[..close]);
            out.push_str(&params);
            out.push_str(&text[close..]);
            Some(CleanupEdit { text: out, added })
        }
    }
}

pub fn run(ctx: &Context, source: &Source, month: &str) -> Result<RunStats> {
    let report = Report::builder("cleanup")
        .header("Strony oznaczone szablonem {{s|Dopracować}} (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::Insertion)
        .build();
    let names = &ctx.settings.templates;

    let extract = |page: &Page| -> Result<Option<Vec<&'static str>>> {
        page.require(&Requires::ARTICLE)?;
        if page.is_disambig {
            return Ok(None);
        }
        let Some(edit) = tag(&page.text, names, month) else {
            return Ok(None);
        };
        let summary = format!("{}: {}", ctx.publisher.summary(), edit.added.join(", "));
        ctx.publisher.edit(&page.title, &page.text, &edit.text, &summary)?;
        Ok(Some(edit.added))
    };

    run_edits(ctx, &report, ctx.wiki().pages(source)?, extract, |title, added| {
        format!("# [[{}]] ({})", title, added.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::testing::{context, fixture};
    use crate::settings::Settings;
    use crate::wiki::memory::MemoryWiki;
    use chrono::Utc;

    #[test]
    fn bare_page_gets_both_params() {
        let names = TemplateNames::default();
        let edit = tag("Jakiś tekst bez linków.", &names, "2024-03").unwrap();
        assert_eq!(edit.added, vec![LINKS, CATEGORY]);
        assert_eq!(
            edit.text,
            "{{Dopracować|linki=2024-03|kategoria=2024-03}}\nJakiś tekst bez linków."
        );
    }

    #[test]
    fn current_month_is_used() {
        let now = Utc.with_ymd_and_hms(2021, 7, 4, 12, 0, 0).unwrap();
        assert_eq!(month(&now), "2021-07");
    }

    #[test]
    fn existing_template_gets_missing_params() {
        let names = TemplateNames::default();
        let text = "{{Dopracować|linki=2020-01}}\nTekst.";
        let edit = tag(text, &names, "2024-03").unwrap();
        assert_eq!(edit.added, vec![CATEGORY]);
        assert_eq!(edit.text, "{{Dopracować|linki=2020-01|kategoria=2024-03}}\nTekst.");

        let full = "{{dopracować|linki=2020-01|kategoria=2020-01}}\nTekst.";
        assert_eq!(tag(full, &names, "2024-03"), None);
    }

    #[test]
    fn linked_and_categorised_page_is_left_alone() {
        let names = TemplateNames::default();
        let text = fixture("categorised.txt");
        assert!(wanted_params(&text).is_empty());
        assert_eq!(tag(&text, &names, "2024-03"), None);
    }

    #[test]
    fn only_links_missing() {
        let text = "Tekst.\n[[Kategoria:Miasta]]";
        assert_eq!(wanted_params(text), vec![LINKS]);
    }

    #[test]
    fn run_edits_articles_only() {
        let settings = Settings::default();
        let disambig = Page {
            is_disambig: true,
            ..Page::article("Zamek", "'''Zamek''' może oznaczać:")
        };
        let wiki = MemoryWiki::with_pages(vec![
            Page::article("Goły", "Nic tu nie ma."),
            Page::article("Pełny", "[[Kraków]]\n[[Kategoria:Miasta]]"),
            Page::article("Przekierowanie", "#PATRZ [[Goły]]"),
            disambig,
        ]);
        let ctx = context(&wiki, &settings, Some("Wikipedysta:Bot/Dopracować"));
        let source = Source::Namespace(0);

        let stats = run(&ctx, &source, "2024-03").unwrap();
        assert_eq!(stats.rows, 1);
        assert!(wiki
            .text_of("Goły")
            .unwrap()
            .starts_with("{{Dopracować|linki=2024-03|kategoria=2024-03}}"));
        assert_eq!(wiki.text_of("Zamek").as_deref(), Some("'''Zamek''' może oznaczać:"));
        assert_eq!(
            wiki.text_of("Wikipedysta:Bot/Dopracować").unwrap().lines().nth(1),
            Some("# [[Goły]] (linki, kategoria)")
        );
    }
}
