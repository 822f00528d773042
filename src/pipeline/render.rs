use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Replaces every `{name}` in `template` with its value in a single pass;
/// unknown placeholders stay as they are.
pub fn fill(template: &str, vars: &[(&str, String)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            vars.iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Header, one line per row, footer.
pub fn document<S: AsRef<str>>(header: &str, rows: &[S], footer: &str) -> String {
    let mut out = String::with_capacity(header.len() + footer.len() + rows.len() * 64);
    out.push_str(header);
    if !header.is_empty() && !header.ends_with('\n') {
        out.push('\n');
    }
    for row in rows {
        out.push_str(row.as_ref());
        out.push('\n');
    }
    out.push_str(footer);
    out
}
