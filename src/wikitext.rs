//! Regex and brace-matching helpers over raw wikitext.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

pub const NS_MAIN: i32 = 0;
pub const NS_TALK: i32 = 1;
pub const NS_USER: i32 = 2;
pub const NS_PROJECT: i32 = 4;
pub const NS_FILE: i32 = 6;
pub const NS_MEDIAWIKI: i32 = 8;
pub const NS_TEMPLATE: i32 = 10;
pub const NS_HELP: i32 = 12;
pub const NS_CATEGORY: i32 = 14;
pub const NS_PORTAL: i32 = 100;
pub const NS_WIKIPROJECT: i32 = 102;
pub const NS_MODULE: i32 = 828;
pub const NS_SPECIAL: i32 = -1;
pub const NS_MEDIA: i32 = -2;

const NAMESPACES: &[(&str, i32)] = &[
    ("plik", NS_FILE),
    ("file", NS_FILE),
    ("image", NS_FILE),
    ("grafika", NS_FILE),
    ("media", NS_MEDIA),
    ("kategoria", NS_CATEGORY),
    ("category", NS_CATEGORY),
    ("szablon", NS_TEMPLATE),
    ("template", NS_TEMPLATE),
    ("wikipedia", NS_PROJECT),
    ("wp", NS_PROJECT),
    ("pomoc", NS_HELP),
    ("help", NS_HELP),
    ("portal", NS_PORTAL),
    ("wikiprojekt", NS_WIKIPROJECT),
    ("moduł", NS_MODULE),
    ("module", NS_MODULE),
    ("wikipedysta", NS_USER),
    ("wikipedystka", NS_USER),
    ("user", NS_USER),
    ("mediawiki", NS_MEDIAWIKI),
    ("specjalna", NS_SPECIAL),
    ("special", NS_SPECIAL),
];

const INTERWIKI: &[&str] = &[
    "w", "wikt", "wikisłownik", "commons", "d", "wikidata", "s", "wikiźródła", "q",
    "wikicytaty", "n", "wikinews", "b", "wikibooks", "v", "m", "meta", "species", "mw",
    "phab", "toollabs", "wmf",
];

/// Wikipedia language editions, the prefixes of interlanguage links.
const LANGUAGES: &[&str] = &[
    "af", "als", "am", "an", "ang", "ar", "arz", "as", "ast", "az", "azb", "ba", "bar",
    "bat-smg", "be", "be-tarask", "be-x-old", "bg", "bn", "bo", "br", "bs", "ca", "ce",
    "ceb", "ckb", "co", "cs", "csb", "cv", "cy", "da", "de", "dsb", "el", "en", "eo", "es",
    "et", "eu", "fa", "fi", "fo", "fr", "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha",
    "he", "hi", "hr", "hsb", "ht", "hu", "hy", "ia", "id", "ie", "ig", "io", "is", "it",
    "ja", "jv", "ka", "kk", "km", "kn", "ko", "ku", "kw", "ky", "la", "lb", "li", "lmo",
    "ln", "lt", "ltg", "lv", "mg", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "mzn",
    "nah", "nap", "nds", "ne", "new", "nl", "nn", "no", "oc", "or", "os", "pa", "pms",
    "pnb", "ps", "pt", "qu", "rm", "ro", "roa-rup", "ru", "rue", "sa", "sah", "sc", "scn",
    "sco", "sd", "se", "sh", "si", "simple", "sk", "sl", "so", "sq", "sr", "su", "sv",
    "sw", "szl", "ta", "te", "tg", "th", "tk", "tl", "tr", "tt", "ug", "uk", "ur", "uz",
    "vec", "vi", "vls", "vo", "wa", "war", "wo", "wuu", "xh", "yi", "yo", "zea", "zh",
    "zh-classical", "zh-min-nan", "zh-yue", "zu",
];

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]*))?\]\]").unwrap());
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(={1,6})[ \t]*(.+?)[ \t]*(={1,6})[ \t]*$").unwrap());
static REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#(?:REDIRECT|PATRZ|PRZEKIERUJ|TAM)\s*:?\s*\[\[([^\]|#]+)").unwrap()
});

/// Underscores to spaces, whitespace collapsed, first letter upper-cased.
pub fn normalize_title(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn names_match(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}

pub fn name_in(name: &str, names: &[String]) -> bool {
    names.iter().any(|n| names_match(name, n))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    Article,
    Namespace(i32),
    Interwiki(String),
}

#[derive(Debug, Clone)]
pub struct WikiLink {
    pub target: String,
    pub kind: LinkKind,
    /// `[[:Kategoria:X]]` style, links to the page instead of categorising.
    pub colon: bool,
}

impl WikiLink {
    pub fn is_category(&self) -> bool {
        self.kind == LinkKind::Namespace(NS_CATEGORY) && !self.colon
    }
}

fn namespace_of(prefix: &str) -> Option<i32> {
    let lower = prefix.trim().to_lowercase();
    if lower.starts_with("dyskusja") || lower.ends_with("talk") {
        return Some(NS_TALK);
    }
    NAMESPACES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, ns)| *ns)
}

fn classify(target: &str) -> (LinkKind, String) {
    if let Some((prefix, rest)) = target.split_once(':') {
        if let Some(ns) = namespace_of(prefix) {
            return (LinkKind::Namespace(ns), rest.trim().to_string());
        }
        let lower = prefix.trim().to_lowercase();
        if INTERWIKI.contains(&lower.as_str()) || LANGUAGES.contains(&lower.as_str()) {
            return (LinkKind::Interwiki(lower), rest.trim().to_string());
        }
    }
    (LinkKind::Article, target.to_string())
}

/// All `[[...]]` links, including those nested in file captions.
pub fn links(text: &str) -> Vec<WikiLink> {
    LINK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str().trim();
            let colon = raw.starts_with(':');
            let raw = raw.trim_start_matches(':');
            let raw = raw.split('#').next().unwrap_or_default().trim();
            if raw.is_empty() {
                return None;
            }
            let (kind, rest) = classify(raw);
            let target = match kind {
                LinkKind::Article => normalize_title(raw),
                LinkKind::Namespace(_) => format!(
                    "{}:{}",
                    normalize_title(raw.split(':').next().unwrap_or_default()),
                    normalize_title(&rest)
                ),
                LinkKind::Interwiki(_) => raw.to_string(),
            };
            Some(WikiLink {
                target,
                kind,
                colon,
            })
        })
        .collect()
}

/// Main-namespace link targets in order of appearance.
pub fn article_links(text: &str) -> Vec<String> {
    links(text)
        .into_iter()
        .filter(|l| l.kind == LinkKind::Article)
        .map(|l| l.target)
        .collect()
}

/// Category names without the namespace prefix.
pub fn categories(text: &str) -> Vec<String> {
    links(text)
        .into_iter()
        .filter(|l| l.is_category())
        .filter_map(|l| l.target.split_once(':').map(|(_, name)| name.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub params: Vec<Param>,
    /// Byte range of the whole `{{...}}` in the source text.
    pub span: Range<usize>,
    pub depth: usize,
}

impl Template {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(key)))
            .map(|p| p.value.as_str())
    }

    /// First non-empty value among `keys`.
    pub fn get_any(&self, keys: &[String]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find(|v| !v.trim().is_empty())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_one_of(&self, names: &[String]) -> bool {
        name_in(&self.name, names)
    }
}

/// Every `{{...}}` in order of its opening braces, nested ones included.
pub fn templates(text: &str) -> Vec<Template> {
    let bytes = text.as_bytes();
    let mut stack: Vec<usize> = Vec::new();
    let mut found = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            stack.push(i);
            i += 2;
        } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            if let Some(start) = stack.pop() {
                let end = i + 2;
                if let Some(t) = parse_template(&text[start + 2..end - 2], start..end, stack.len()) {
                    found.push(t);
                }
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    found.sort_by_key(|t| t.span.start);
    found
}

pub fn find_templates<'a>(all: &'a [Template], names: &'a [String]) -> impl Iterator<Item = &'a Template> {
    all.iter().filter(move |t| t.is_one_of(names))
}

pub fn has_template(text: &str, names: &[String]) -> bool {
    templates(text).iter().any(|t| t.is_one_of(names))
}

fn parse_template(inner: &str, span: Range<usize>, depth: usize) -> Option<Template> {
    let parts = split_top_level(inner);
    let mut iter = parts.into_iter();
    let raw_name = iter.next()?;
    let raw_name = raw_name.trim();
    if raw_name.is_empty() || raw_name.starts_with('{') {
        return None;
    }
    let raw_name = raw_name
        .strip_prefix("subst:")
        .or_else(|| raw_name.strip_prefix("msg:"))
        .unwrap_or(raw_name);
    let name = match raw_name.split_once(':') {
        Some((prefix, rest)) if namespace_of(prefix) == Some(NS_TEMPLATE) => rest,
        _ => raw_name,
    };

    let params = iter
        .map(|part| match split_named(&part) {
            Some((k, v)) => Param {
                name: Some(k.trim().to_string()),
                value: v.trim().to_string(),
            },
            None => Param {
                name: None,
                value: part.trim().to_string(),
            },
        })
        .collect();

    Some(Template {
        name: normalize_title(name),
        params,
        span,
        depth,
    })
}

/// Splits on `|` outside nested templates and links.
fn split_top_level(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                braces += 1;
                current.push_str("{{");
            }
            '}' if chars.peek() == Some(&'}') && braces > 0 => {
                chars.next();
                braces -= 1;
                current.push_str("}}");
            }
            '[' if chars.peek() == Some(&'[') => {
                chars.next();
                brackets += 1;
                current.push_str("[[");
            }
            ']' if chars.peek() == Some(&']') && brackets > 0 => {
                chars.next();
                brackets -= 1;
                current.push_str("]]");
            }
            '|' if braces == 0 && brackets == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// `key=value` when the first `=` sits outside nested markup.
fn split_named(part: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let bytes = part.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth -= 1,
            b'=' if depth == 0 => return Some((&part[..i], &part[i + 1..])),
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub title: String,
}

pub fn headings(text: &str) -> Vec<Heading> {
    HEADING_RE
        .captures_iter(text)
        .map(|caps| Heading {
            level: caps[1].len().min(caps[3].len()),
            title: caps[2].trim_matches('=').trim().to_string(),
        })
        .collect()
}

pub fn redirect_target(text: &str) -> Option<String> {
    REDIRECT_RE
        .captures(text)
        .map(|caps| normalize_title(caps[1].trim()))
}
