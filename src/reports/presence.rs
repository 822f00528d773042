//! Pages with (or, negated, without) a template, category or pattern.

use regex::Regex;

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source};
use crate::wikitext::{categories, has_template, names_match};

#[derive(Debug, Clone)]
pub enum Predicate {
    Template(Vec<String>),
    Category(String),
    Pattern(Regex),
}

impl Predicate {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Predicate::Template(names) => has_template(text, names),
            Predicate::Category(name) => categories(text).iter().any(|c| names_match(c, name)),
            Predicate::Pattern(re) => re.is_match(text),
        }
    }

    fn describe(&self) -> String {
        match self {
            Predicate::Template(names) => format!("{{{{{}}}}}", names.join("}}/{{")),
            Predicate::Category(name) => format!("[[:Kategoria:{}]]", name),
            Predicate::Pattern(re) => format!("<nowiki>{}</nowiki>", re.as_str()),
        }
    }
}

pub fn check(page: &Page, predicate: &Predicate, negative: bool) -> Option<()> {
    (predicate.matches(&page.text) != negative).then_some(())
}

pub fn run(ctx: &Context, source: &Source, predicate: &Predicate, negative: bool) -> Result<RunStats> {
    let header = format!(
        "Strony {} {} (stan na ~~~~~), razem {{count}}:",
        if negative { "bez" } else { "z" },
        predicate.describe()
    );
    let report = Report::builder("presence")
        .header(header)
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::KeyAsc)
        .build();

    report.run(
        ctx.wiki().pages(source)?,
        |page: &Page| -> Result<Option<()>> {
            page.require(&Requires::EXISTING)?;
            Ok(check(page, predicate, negative))
        },
        |title, _| format!("# [[{}]]", title),
        &ctx.target("Wikipedysta:Bot/Wyniki"),
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
    fn predicates() {
        let page = Page::article("A", "{{Infobox miasto}}\nTekst 1999.\n[[Kategoria:Miasta w Polsce]]");
        let template = Predicate::Template(vec!["Infobox_miasto".into()]);
        let category = Predicate::Category("miasta w Polsce".into());
        let pattern = Predicate::Pattern(Regex::new(r"\b\d{4}\b").unwrap());

        for p in [&template, &category, &pattern] {
            assert_eq!(check(&page, p, false), Some(()));
            assert_eq!(check(&page, p, true), None);
        }
        assert_eq!(check(&page, &Predicate::Category("Wsie".into()), true), Some(()));
    }

    #[test]
    fn negative_report() {
        let settings = Settings::default();
        let wiki = MemoryWiki::with_pages(vec![
            Page::article("Ma", "{{Przypisy}}"),
            Page::article("Nie ma", "tekst"),
        ]);
        let ctx = context(&wiki, &settings, Some("Raport"));
        let predicate = Predicate::Template(vec!["Przypisy".into()]);
        run(&ctx, &Source::Namespace(0), &predicate, true).unwrap();
        let out = wiki.text_of("Raport").unwrap();
        assert!(out.starts_with("Strony bez {{Przypisy}}"));
        assert!(out.contains("# [[Nie ma]]"));
        assert!(!out.contains("# [[Ma]]"));
    }
}
