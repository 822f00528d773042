//! Adds a fixed piece of wikitext to every page.

use super::{run_edits, Context};
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source};
use crate::wikitext::templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Top,
    #[default]
    Bottom,
    /// Swap an existing template of the same name for the new text.
    Replace,
}

/// New page text, or `None` when the text is already there or there is
/// nothing to replace.
pub fn insert(text: &str, addition: &str, mode: Mode) -> Option<String> {
    let addition = addition.trim();
    if addition.is_empty() || text.contains(addition) {
        return None;
    }
    match mode {
        Mode::Top => Some(format!("{}\n{}", addition, text)),
        Mode::Bottom => Some(format!("{}\n{}\n", text.trim_end(), addition)),
        Mode::Replace => {
            let new = templates(addition).into_iter().find(|t| t.depth == 0)?;
            let old = templates(text)
                .into_iter()
                .find(|t| t.depth == 0 && t.is_one_of(std::slice::from_ref(&new.name)))?;
            Some(format!("{}{}{}", &text[..old.span.start], addition, &text[old.span.end..]))
        }
    }
}

pub fn run(ctx: &Context, source: &Source, addition: &str, mode: Mode) -> Result<RunStats> {
    let report = Report::builder("insert")
        .header("Strony zmienione przez bota (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::Insertion)
        .build();

    let extract = |page: &Page| -> Result<Option<()>> {
        page.require(&Requires::EXISTING)?;
        let Some(text) = insert(&page.text, addition, mode) else {
            return Ok(None);
        };
        let changed = ctx.publisher.edit(&page.title, &page.text, &text, ctx.publisher.summary())?;
        Ok(changed.then_some(()))
    };

    run_edits(ctx, &report, ctx.wiki().pages(source)?, extract, |title, _| {
        format!("# [[{}]]", title)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::testing::context;
    use crate::settings::Settings;
    use crate::wiki::memory::MemoryWiki;

    #[test]
    fn top_and_bottom() {
        assert_eq!(insert("Tekst\n\n", "{{Stub}}", Mode::Top).as_deref(), Some("{{Stub}}\nTekst\n\n"));
        assert_eq!(insert("Tekst\n\n", "{{Stub}}", Mode::Bottom).as_deref(), Some("Tekst\n{{Stub}}\n"));
    }

    #[test]
    fn present_text_is_skipped() {
        assert_eq!(insert("{{Stub}}\nTekst", "{{Stub}}", Mode::Top), None);
        assert_eq!(insert("Tekst", "  ", Mode::Bottom), None);
    }

    #[test]
    fn replace_swaps_same_template() {
        let text = "Tekst\n{{Portal|Polska}}\n[[Kategoria:X]]";
        assert_eq!(
            insert(text, "{{portal|Polska|Historia}}", Mode::Replace).as_deref(),
            Some("Tekst\n{{portal|Polska|Historia}}\n[[Kategoria:X]]")
        );
        assert_eq!(insert("Tekst", "{{Portal|Polska}}", Mode::Replace), None);
    }

    #[test]
    fn run_without_outpage_only_edits() {
        let settings = Settings::default();
        let wiki = MemoryWiki::with_pages(vec![
            Page::article("A", "Tekst"),
            Page::article("B", "Tekst\n{{Stub}}"),
        ]);
        let ctx = context(&wiki, &settings, None);
        let stats = run(&ctx, &Source::Namespace(0), "{{Stub}}", Mode::Bottom).unwrap();
        assert_eq!(stats.rows, 1);
        assert_eq!(wiki.saves.borrow().len(), 1);
        assert_eq!(wiki.text_of("A").as_deref(), Some("Tekst\n{{Stub}}\n"));
    }
}
