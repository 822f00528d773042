use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("page does not exist: {0}")]
    MissingPage(String),

    #[error("page is a redirect: {0}")]
    Redirect(String),

    #[error("page {title} is in namespace {actual}, expected {expected}")]
    WrongNamespace {
        title: String,
        actual: i32,
        expected: i32,
    },

    #[error("login failed: {0}")]
    Login(String),

    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BotError {
    /// Per-record misses: the page is skipped, the run goes on.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            BotError::MissingPage(_) | BotError::Redirect(_) | BotError::WrongNamespace { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_errors_are_per_record_misses() {
        assert!(BotError::MissingPage("Foo".into()).is_soft());
        assert!(BotError::Redirect("Foo".into()).is_soft());
        assert!(BotError::WrongNamespace {
            title: "Szablon:X".into(),
            actual: 10,
            expected: 0
        }
        .is_soft());
        assert!(!BotError::Login("bad password".into()).is_soft());
        assert!(!BotError::Api {
            code: "readonly".into(),
            info: "locked".into()
        }
        .is_soft());
    }
}
