use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{read_titles_file, Page, PageIter, Source, Wiki};
use crate::error::{BotError, Result};
use crate::wikitext::{self, normalize_title};

/// In-memory wiki for driving whole report runs in tests.
#[derive(Default)]
pub struct MemoryWiki {
    pub pages: RefCell<BTreeMap<String, Page>>,
    pub revisions: HashMap<String, u64>,
    pub claims: HashMap<(String, String), Vec<String>>,
    pub saves: RefCell<Vec<(String, String, String)>>,
    pub fail_saves: bool,
}

impl MemoryWiki {
    pub fn with_pages(pages: Vec<Page>) -> Self {
        let map = pages.into_iter().map(|p| (p.title.clone(), p)).collect();
        MemoryWiki {
            pages: RefCell::new(map),
            ..Default::default()
        }
    }

    pub fn text_of(&self, title: &str) -> Option<String> {
        self.pages.borrow().get(title).map(|p| p.text.clone())
    }
}

impl Wiki for MemoryWiki {
    fn pages(&self, source: &Source) -> Result<PageIter<'_>> {
        let all = self.pages.borrow();
        let selected: Vec<Page> = match source {
            Source::Category { name, .. } => all
                .values()
                .filter(|p| wikitext::categories(&p.text).iter().any(|c| c == &normalize_title(name)))
                .cloned()
                .collect(),
            Source::Transcludes { template, .. } => all
                .values()
                .filter(|p| wikitext::has_template(&p.text, std::slice::from_ref(template)))
                .cloned()
                .collect(),
            Source::LinksTo { title, .. } => all
                .values()
                .filter(|p| wikitext::article_links(&p.text).contains(&normalize_title(title)))
                .cloned()
                .collect(),
            Source::Namespace(ns) => all.values().filter(|p| p.namespace == *ns).cloned().collect(),
            Source::Titles(titles) => titles.iter().map(|t| self.lookup(&all, t)).collect(),
            Source::TitlesFile(path) => read_titles_file(path)?
                .iter()
                .map(|t| self.lookup(&all, t))
                .collect(),
        };
        Ok(Box::new(selected.into_iter().map(Ok)))
    }

    fn save(&self, title: &str, text: &str, summary: &str) -> Result<()> {
        if self.fail_saves {
            return Err(BotError::Api {
                code: "readonly".into(),
                info: "database is locked".into(),
            });
        }
        self.saves
            .borrow_mut()
            .push((title.to_string(), text.to_string(), summary.to_string()));
        self.pages
            .borrow_mut()
            .entry(title.to_string())
            .and_modify(|p| p.text = text.to_string())
            .or_insert_with(|| Page::article(title, text));
        Ok(())
    }

    fn append(&self, title: &str, text: &str, summary: &str) -> Result<()> {
        let current = self.text_of(title).unwrap_or_default();
        self.save(title, &format!("{}{}", current, text), summary)
    }

    fn disambiguations(&self, titles: &[String]) -> Result<HashSet<String>> {
        let all = self.pages.borrow();
        Ok(titles
            .iter()
            .filter(|t| all.get(*t).is_some_and(|p| p.is_disambig))
            .cloned()
            .collect())
    }

    fn revision_count(&self, title: &str) -> Result<u64> {
        self.revisions
            .get(title)
            .copied()
            .ok_or_else(|| BotError::MissingPage(title.to_string()))
    }

    fn claims(&self, item: &str, property: &str) -> Result<Vec<String>> {
        Ok(self
            .claims
            .get(&(item.to_string(), property.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

impl MemoryWiki {
    fn lookup(&self, all: &BTreeMap<String, Page>, title: &str) -> Page {
        all.get(title).cloned().unwrap_or_else(|| Page {
            title: title.to_string(),
            ..Default::default()
        })
    }
}
