pub mod api;
#[cfg(test)]
pub mod memory;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{BotError, Result};
use crate::wikitext::NS_MAIN;

/// One page as handed out by a generator. Read-only for the extractors.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub title: String,
    pub namespace: i32,
    pub text: String,
    pub exists: bool,
    pub redirect_target: Option<String>,
    pub is_disambig: bool,
    pub wikibase_item: Option<String>,
}

#[cfg(test)]
impl Page {
    pub fn article(title: &str, text: &str) -> Self {
        Page {
            title: title.to_string(),
            namespace: NS_MAIN,
            text: text.to_string(),
            exists: true,
            redirect_target: crate::wikitext::redirect_target(text),
            is_disambig: false,
            wikibase_item: None,
        }
    }
}

impl Page {
    pub fn is_redirect(&self) -> bool {
        self.redirect_target.is_some()
    }

    /// Soft error when the page lacks a capability the caller needs.
    pub fn require(&self, req: &Requires) -> Result<&Page> {
        if req.existing && !self.exists {
            return Err(BotError::MissingPage(self.title.clone()));
        }
        if req.non_redirect && self.is_redirect() {
            return Err(BotError::Redirect(self.title.clone()));
        }
        if let Some(ns) = req.namespace {
            if self.namespace != ns {
                return Err(BotError::WrongNamespace {
                    title: self.title.clone(),
                    actual: self.namespace,
                    expected: ns,
                });
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Requires {
    pub existing: bool,
    pub non_redirect: bool,
    pub namespace: Option<i32>,
}

impl Requires {
    pub const EXISTING: Requires = Requires {
        existing: true,
        non_redirect: false,
        namespace: None,
    };
    pub const ARTICLE: Requires = Requires {
        existing: true,
        non_redirect: true,
        namespace: Some(NS_MAIN),
    };
}

/// Where the pages of a run come from.
#[derive(Debug, Clone)]
pub enum Source {
    Category { name: String, namespace: Option<i32> },
    Transcludes { template: String, namespace: Option<i32> },
    LinksTo { title: String, namespace: Option<i32> },
    Namespace(i32),
    Titles(Vec<String>),
    TitlesFile(PathBuf),
}

pub type PageIter<'a> = Box<dyn Iterator<Item = Result<Page>> + 'a>;

/// The wiki as seen by the reports.
pub trait Wiki {
    fn pages(&self, source: &Source) -> Result<PageIter<'_>>;
    fn save(&self, title: &str, text: &str, summary: &str) -> Result<()>;
    fn append(&self, title: &str, text: &str, summary: &str) -> Result<()>;
    fn disambiguations(&self, titles: &[String]) -> Result<HashSet<String>>;
    fn revision_count(&self, title: &str) -> Result<u64>;
    fn claims(&self, item: &str, property: &str) -> Result<Vec<String>>;
}

pub fn read_titles_file(path: &PathBuf) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|source| BotError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(|l| l.trim().trim_start_matches("[[").trim_end_matches("]]"))
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(crate::wikitext::normalize_title)
        .collect())
}
