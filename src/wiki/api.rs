//! Blocking MediaWiki Action API adapter.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{read_titles_file, Page, PageIter, Source, Wiki};
use crate::error::{BotError, Result};
use crate::settings::Settings;
use crate::wikitext::{self, normalize_title};

const BATCH: usize = 50;

type Params = Vec<(&'static str, String)>;

pub struct ApiClient {
    client: Client,
    api_url: String,
    wikidata_url: String,
    csrf: RefCell<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default, rename = "continue")]
    cont: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<ApiPage>,
    #[serde(default)]
    tokens: Option<Tokens>,
    #[serde(default)]
    redirects: Vec<ApiRedirect>,
}

#[derive(Debug, Deserialize)]
struct ApiRedirect {
    from: String,
    to: String,
}

#[derive(Debug, Default, Deserialize)]
struct Tokens {
    logintoken: Option<String>,
    csrftoken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    title: String,
    #[serde(default)]
    ns: i32,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    redirect: bool,
    #[serde(default)]
    revisions: Vec<ApiRevision>,
    #[serde(default)]
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct ApiRevision {
    #[serde(default)]
    slots: Option<Slots>,
}

#[derive(Debug, Deserialize)]
struct Slots {
    main: Option<Slot>,
}

#[derive(Debug, Deserialize)]
struct Slot {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageProps {
    disambiguation: Option<Value>,
    wikibase_item: Option<String>,
}

impl QueryBody {
    /// Disambiguation titles as requested, with redirects followed back to
    /// the title that was asked for.
    fn disambiguations(&self) -> HashSet<String> {
        let targets: HashSet<String> = self
            .pages
            .iter()
            .filter(|p| p.pageprops.as_ref().is_some_and(|pp| pp.disambiguation.is_some()))
            .map(|p| normalize_title(&p.title))
            .collect();
        let via_redirect: Vec<String> = self
            .redirects
            .iter()
            .filter(|r| targets.contains(&normalize_title(&r.to)))
            .map(|r| normalize_title(&r.from))
            .collect();
        targets.into_iter().chain(via_redirect).collect()
    }
}

impl ApiPage {
    fn content(&self) -> Option<&str> {
        self.revisions
            .first()
            .and_then(|r| r.slots.as_ref())
            .and_then(|s| s.main.as_ref())
            .and_then(|m| m.content.as_deref())
    }

    fn into_page(self) -> Page {
        let text = self.content().unwrap_or_default().to_string();
        let redirect_target =
            wikitext::redirect_target(&text).or_else(|| self.redirect.then(String::new));
        let props = self.pageprops.unwrap_or_default();
        Page {
            title: self.title,
            namespace: self.ns,
            exists: !self.missing && !self.invalid,
            redirect_target,
            is_disambig: props.disambiguation.is_some(),
            wikibase_item: props.wikibase_item,
            text,
        }
    }
}

fn check_error(v: &Value) -> Result<()> {
    if let Some(err) = v.get("error") {
        return Err(BotError::Api {
            code: err["code"].as_str().unwrap_or("unknown").to_string(),
            info: err["info"].as_str().unwrap_or_default().to_string(),
        });
    }
    Ok(())
}

fn with_prefix(prefix: &str, name: &str) -> String {
    let name = normalize_title(name);
    if name.contains(':') {
        name
    } else {
        format!("{}:{}", prefix, name)
    }
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .cookie_store(true)
            .build()?;
        Ok(ApiClient {
            client,
            api_url: settings.api_url.clone(),
            wikidata_url: settings.wikidata_url.clone(),
            csrf: RefCell::new(None),
        })
    }

    fn get<K: Serialize + Debug>(&self, url: &str, params: &[(K, String)]) -> Result<Value> {
        debug!(url, ?params, "GET");
        let v: Value = self
            .client
            .get(url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()?
            .error_for_status()?
            .json()?;
        check_error(&v)?;
        Ok(v)
    }

    fn post(&self, params: &[(&str, String)]) -> Result<Value> {
        let mut form: Vec<(&str, String)> = vec![("format", "json".into()), ("formatversion", "2".into())];
        form.extend(params.iter().cloned());
        let v: Value = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()?
            .error_for_status()?
            .json()?;
        check_error(&v)?;
        Ok(v)
    }

    fn query<K: Serialize + Debug>(&self, params: &[(K, String)]) -> Result<QueryResponse> {
        let v = self.get(&self.api_url, params)?;
        Ok(serde_json::from_value(v)?)
    }

    fn token(&self, kind: &str) -> Result<String> {
        let resp = self.query(&[
            ("action", "query".into()),
            ("meta", "tokens".into()),
            ("type", kind.into()),
        ])?;
        let tokens = resp.query.and_then(|q| q.tokens).unwrap_or_default();
        let token = match kind {
            "login" => tokens.logintoken,
            _ => tokens.csrftoken,
        };
        token.ok_or_else(|| BotError::Api {
            code: "notoken".into(),
            info: format!("no {} token in response", kind),
        })
    }

    fn csrf_token(&self) -> Result<String> {
        if let Some(t) = self.csrf.borrow().as_ref() {
            return Ok(t.clone());
        }
        let t = self.token("csrf")?;
        *self.csrf.borrow_mut() = Some(t.clone());
        Ok(t)
    }

    /// Bot-password login; the session lives in the client's cookie store.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let token = self.token("login")?;
        let v = self.post(&[
            ("action", "login".into()),
            ("lgname", username.into()),
            ("lgpassword", password.into()),
            ("lgtoken", token),
        ])?;
        match v["login"]["result"].as_str() {
            Some("Success") => {
                info!(user = username, "logged in");
                *self.csrf.borrow_mut() = None;
                Ok(())
            }
            other => Err(BotError::Login(
                v["login"]["reason"]
                    .as_str()
                    .or(other)
                    .unwrap_or("no result")
                    .to_string(),
            )),
        }
    }

    fn edit(&self, title: &str, field: &'static str, text: &str, summary: &str) -> Result<()> {
        let token = self.csrf_token()?;
        let v = self.post(&[
            ("action", "edit".into()),
            ("title", title.into()),
            (field, text.into()),
            ("summary", summary.into()),
            ("bot", "1".into()),
            ("token", token),
        ])?;
        match v["edit"]["result"].as_str() {
            Some("Success") => Ok(()),
            other => Err(BotError::Api {
                code: "editfailed".into(),
                info: format!("{}: {}", title, other.unwrap_or("no result")),
            }),
        }
    }

    fn generator_params(&self, source: &Source) -> Result<Vec<Params>> {
        let content: Params = vec![
            ("action", "query".into()),
            ("prop", "revisions|info|pageprops".into()),
            ("rvprop", "content".into()),
            ("rvslots", "main".into()),
            ("ppprop", "disambiguation|wikibase_item".into()),
        ];
        let ns = |n: &Option<i32>| n.map(|n| n.to_string());
        let mut params = content.clone();
        match source {
            Source::Category { name, namespace } => {
                params.push(("generator", "categorymembers".into()));
                params.push(("gcmtitle", with_prefix("Kategoria", name)));
                params.push(("gcmlimit", BATCH.to_string()));
                if let Some(n) = ns(namespace) {
                    params.push(("gcmnamespace", n));
                }
            }
            Source::Transcludes { template, namespace } => {
                params.push(("generator", "embeddedin".into()));
                params.push(("geititle", with_prefix("Szablon", template)));
                params.push(("geilimit", BATCH.to_string()));
                if let Some(n) = ns(namespace) {
                    params.push(("geinamespace", n));
                }
            }
            Source::LinksTo { title, namespace } => {
                params.push(("generator", "backlinks".into()));
                params.push(("gbltitle", normalize_title(title)));
                params.push(("gbllimit", BATCH.to_string()));
                if let Some(n) = ns(namespace) {
                    params.push(("gblnamespace", n));
                }
            }
            Source::Namespace(n) => {
                params.push(("generator", "allpages".into()));
                params.push(("gapnamespace", n.to_string()));
                params.push(("gaplimit", BATCH.to_string()));
            }
            Source::Titles(titles) => return Ok(title_batches(&content, titles)),
            Source::TitlesFile(path) => {
                return Ok(title_batches(&content, &read_titles_file(path)?));
            }
        }
        Ok(vec![params])
    }
}

fn title_batches(base: &Params, titles: &[String]) -> Vec<Params> {
    titles
        .chunks(BATCH)
        .map(|chunk| {
            let mut p = base.clone();
            p.push(("titles", chunk.join("|")));
            p
        })
        .collect()
}

/// Lazily walks one or more queries, following API continuation.
struct PageStream<'a> {
    api: &'a ApiClient,
    queries: VecDeque<Params>,
    current: Option<Params>,
    cont: Option<Map<String, Value>>,
    batch: Vec<ApiPage>,
    buffer: VecDeque<Page>,
}

impl PageStream<'_> {
    fn fetch_next(&mut self) -> Result<()> {
        let Some(base) = self.current.take().or_else(|| self.queries.pop_front()) else {
            return Ok(());
        };
        let mut params: Vec<(String, String)> =
            base.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        match &self.cont {
            Some(cont) => params.extend(cont.iter().map(|(k, v)| {
                let val = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                (k.clone(), val)
            })),
            None => params.push(("continue".into(), String::new())),
        }

        let resp = self.api.query(&params[..])?;
        for page in resp.query.map(|q| q.pages).unwrap_or_default() {
            match self.batch.iter_mut().find(|p| p.title == page.title) {
                Some(existing) if existing.content().is_none() => *existing = page,
                Some(_) => {}
                None => self.batch.push(page),
            }
        }

        // A generator batch is complete once no revision continuation is pending.
        let batch_done = resp
            .cont
            .as_ref()
            .map_or(true, |c| !c.contains_key("rvcontinue"));
        if batch_done {
            self.buffer.extend(self.batch.drain(..).map(ApiPage::into_page));
        }

        if resp.cont.is_some() {
            self.current = Some(base);
        }
        self.cont = resp.cont;
        Ok(())
    }

    fn exhausted(&self) -> bool {
        self.current.is_none() && self.queries.is_empty()
    }
}

impl Iterator for PageStream<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(page) = self.buffer.pop_front() {
                return Some(Ok(page));
            }
            if self.exhausted() {
                return None;
            }
            if let Err(e) = self.fetch_next() {
                self.queries.clear();
                self.current = None;
                return Some(Err(e));
            }
        }
    }
}

impl Wiki for ApiClient {
    fn pages(&self, source: &Source) -> Result<PageIter<'_>> {
        let mut queries: VecDeque<Params> = self.generator_params(source)?.into();
        let current = queries.pop_front();
        Ok(Box::new(PageStream {
            api: self,
            queries,
            current,
            cont: None,
            batch: Vec::new(),
            buffer: VecDeque::new(),
        }))
    }

    fn save(&self, title: &str, text: &str, summary: &str) -> Result<()> {
        self.edit(title, "text", text, summary)
    }

    fn append(&self, title: &str, text: &str, summary: &str) -> Result<()> {
        self.edit(title, "appendtext", text, summary)
    }

    fn disambiguations(&self, titles: &[String]) -> Result<HashSet<String>> {
        let mut found = HashSet::new();
        for chunk in titles.chunks(BATCH) {
            let resp = self.query(&[
                ("action", "query".into()),
                ("prop", "pageprops".into()),
                ("ppprop", "disambiguation".into()),
                ("redirects", "1".into()),
                ("titles", chunk.join("|")),
            ])?;
            if let Some(body) = resp.query {
                found.extend(body.disambiguations());
            }
        }
        Ok(found)
    }

    fn revision_count(&self, title: &str) -> Result<u64> {
        let mut count = 0u64;
        let mut cont: Option<String> = None;
        loop {
            let mut params: Vec<(&str, String)> = vec![
                ("action", "query".into()),
                ("prop", "revisions".into()),
                ("rvprop", "ids".into()),
                ("rvlimit", "max".into()),
                ("titles", title.into()),
            ];
            if let Some(c) = &cont {
                params.push(("rvcontinue", c.clone()));
            }
            let resp = self.query(&params[..])?;
            for page in resp.query.map(|q| q.pages).unwrap_or_default() {
                if page.missing {
                    return Err(BotError::MissingPage(title.to_string()));
                }
                count += page.revisions.len() as u64;
            }
            cont = resp
                .cont
                .and_then(|c| c.get("rvcontinue").and_then(|v| v.as_str()).map(str::to_string));
            if cont.is_none() {
                break;
            }
        }
        Ok(count)
    }

    fn claims(&self, item: &str, property: &str) -> Result<Vec<String>> {
        let v = self.get(
            &self.wikidata_url,
            &[
                ("action", "wbgetclaims".into()),
                ("entity", item.into()),
                ("property", property.into()),
            ],
        )?;
        let ids = v["claims"][property]
            .as_array()
            .map(|claims| {
                claims
                    .iter()
                    .filter_map(|c| c["mainsnak"]["datavalue"]["value"]["id"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }
}
