use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::text::truncate;
use crate::wiki::Wiki;

/// Where a rendered document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Page(String),
    File(PathBuf),
}

impl Target {
    /// Target for one bucket of a multi-page report: `Page/suffix` or
    /// `name-suffix.ext`.
    pub fn sub(&self, suffix: &str) -> Target {
        match self {
            Target::Page(title) => Target::Page(format!("{}/{}", title, suffix)),
            Target::File(path) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = match path.extension() {
                    Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
                    None => format!("{}-{}", stem, suffix),
                };
                Target::File(path.with_file_name(name))
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Page(title) => write!(f, "[[{}]]", title),
            Target::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Performs the final writes of a run. With `dry_run` nothing leaves the
/// process.
pub struct Publisher<'a> {
    wiki: &'a dyn Wiki,
    pub dry_run: bool,
    summary: String,
    progress_log: Option<String>,
}

impl<'a> Publisher<'a> {
    pub fn new(wiki: &'a dyn Wiki, dry_run: bool, summary: &str, progress_log: Option<String>) -> Self {
        Publisher {
            wiki,
            dry_run,
            summary: summary.to_string(),
            progress_log,
        }
    }

    pub fn wiki(&self) -> &'a dyn Wiki {
        self.wiki
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// One whole-document write. Errors are returned as is; nothing is retried.
    pub fn publish(&self, target: &Target, document: &str, rows: usize) -> Result<()> {
        if self.dry_run {
            info!("dry run: {} rows ({} bytes) not written to {}", rows, document.len(), target);
            debug!("{}", truncate(document, 2000));
            return Ok(());
        }
        match target {
            Target::Page(title) => self.wiki.save(title, document, &self.summary)?,
            Target::File(path) => std::fs::write(path, document).map_err(|source| BotError::Write {
                path: path.clone(),
                source,
            })?,
        }
        info!("wrote {} rows to {}", rows, target);
        self.log_progress(target, rows);
        Ok(())
    }

    /// Saves `new_text` over `title` when it differs from `old_text`.
    /// Returns whether there was a change.
    pub fn edit(&self, title: &str, old_text: &str, new_text: &str, summary: &str) -> Result<bool> {
        if old_text == new_text {
            return Ok(false);
        }
        if self.dry_run {
            info!("dry run: edit of [[{}]] skipped ({})", title, summary);
            return Ok(true);
        }
        self.wiki.save(title, new_text, summary)?;
        debug!("saved [[{}]]", title);
        Ok(true)
    }

    fn log_progress(&self, target: &Target, rows: usize) {
        let Some(log) = &self.progress_log else {
            return;
        };
        let line = format!("\n* ~~~~~: {} ({} wierszy)", target, rows);
        if let Err(e) = self.wiki.append(log, &line, &self.summary) {
            warn!("progress log [[{}]] not updated: {}", log, e);
        }
    }
}
