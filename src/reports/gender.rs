//! Biographies split by the sex or gender (P21) recorded on Wikidata.

use super::Context;
use crate::error::Result;
use crate::pipeline::{Ordering, Report, RunStats, Truncation};
use crate::wiki::{Page, Requires, Source, Wiki};

pub const SEX_OR_GENDER: &str = "P21";
const FEMALE: &str = "Q6581072";
const MALE: &str = "Q6581097";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gender {
    Female,
    Male,
    Other,
    Unknown,
}

impl Gender {
    pub const ALL: [Gender; 4] = [Gender::Female, Gender::Male, Gender::Other, Gender::Unknown];

    /// The first claim decides; no claims means unknown.
    pub fn from_claims(claims: &[String]) -> Gender {
        match claims.first().map(String::as_str) {
            Some(FEMALE) => Gender::Female,
            Some(MALE) => Gender::Male,
            Some(_) => Gender::Other,
            None => Gender::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Female => "Kobiety",
            Gender::Male => "Mężczyźni",
            Gender::Other => "Inne",
            Gender::Unknown => "Nieznana",
        }
    }
}

pub fn classify(wiki: &dyn Wiki, page: &Page) -> Result<Gender> {
    let Some(item) = &page.wikibase_item else {
        return Ok(Gender::Unknown);
    };
    Ok(Gender::from_claims(&wiki.claims(item, SEX_OR_GENDER)?))
}

pub fn run(ctx: &Context, source: &Source) -> Result<RunStats> {
    let report = Report::builder("gender")
        .header("{bucket} (stan na ~~~~~), razem {count}:")
        .maxlines(ctx.maxlines)
        .truncation(Truncation::FirstN)
        .ordering(Ordering::KeyAsc)
        .build();
    let wiki = ctx.wiki();

    report.run_buckets(
        wiki.pages(source)?,
        |page: &Page| -> Result<Option<(Gender, ())>> {
            page.require(&Requires::ARTICLE)?;
            Ok(Some((classify(wiki, page)?, ())))
        },
        |title, _| format!("# [[{}]]", title),
        |g: &Gender| g.label().to_string(),
        &Gender::ALL,
        &ctx.target("Wikipedysta:Bot/Płeć"),
        &ctx.publisher,
    )
}
