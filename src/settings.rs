use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub wikidata_url: String,
    /// Prefix for article links in HTML output.
    pub article_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Page that receives one line per written report page.
    pub progress_log: Option<String>,
    pub templates: TemplateNames,
}

/// Site-specific wikitext vocabulary. Defaults match Polish Wikipedia.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateNames {
    pub cleanup: Vec<String>,
    pub other_meanings: Vec<String>,
    pub citations: Vec<String>,
    pub dead_link: Vec<String>,
    pub url_params: Vec<String>,
    pub archive_params: Vec<String>,
    pub end_sections: Vec<String>,
}

impl Default for TemplateNames {
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        TemplateNames {
            cleanup: owned(&["Dopracować", "Dopracowac", "Dopracuj"]),
            other_meanings: owned(&["Inne znaczenia", "Inneznaczenia"]),
            citations: owned(&[
                "Cytuj stronę",
                "Cytuj",
                "Cytuj pismo",
                "Cytuj książkę",
                "Cite web",
            ]),
            dead_link: owned(&["Martwy link", "Dead link"]),
            url_params: owned(&["url"]),
            archive_params: owned(&["archiwum", "archive-url", "archiveurl"]),
            end_sections: owned(&[
                "Zobacz też",
                "Uwagi",
                "Przypisy",
                "Bibliografia",
                "Linki zewnętrzne",
            ]),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_url: "https://pl.wikipedia.org/w/api.php".to_string(),
            wikidata_url: "https://www.wikidata.org/w/api.php".to_string(),
            article_url: "https://pl.wikipedia.org/wiki/".to_string(),
            user_agent: concat!("plbot/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 60,
            username: None,
            password: None,
            progress_log: None,
            templates: TemplateNames::default(),
        }
    }
}

impl Settings {
    /// Defaults, then `plbot.toml` (or `path`), then `PLBOT_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("wikidata_url", defaults.wikidata_url)?
            .set_default("article_url", defaults.article_url)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("templates.cleanup", defaults.templates.cleanup)?
            .set_default("templates.other_meanings", defaults.templates.other_meanings)?
            .set_default("templates.citations", defaults.templates.citations)?
            .set_default("templates.dead_link", defaults.templates.dead_link)?
            .set_default("templates.url_params", defaults.templates.url_params)?
            .set_default("templates.archive_params", defaults.templates.archive_params)?
            .set_default("templates.end_sections", defaults.templates.end_sections)?;

        builder = match path {
            Some(p) => builder.add_source(File::from(p).required(true)),
            None => builder.add_source(File::with_name("plbot").required(false)),
        };

        let settings = builder
            .add_source(
                Environment::with_prefix("PLBOT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "progress_log = \"Wikipedysta:Bot/log\"").unwrap();
        writeln!(f, "[templates]").unwrap();
        writeln!(f, "dead_link = [\"Martwy link\"]").unwrap();
        drop(f);

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.progress_log.as_deref(), Some("Wikipedysta:Bot/log"));
        assert_eq!(s.templates.dead_link, vec!["Martwy link".to_string()]);
        assert_eq!(s.templates.cleanup[0], "Dopracować");
        assert_eq!(s.api_url, "https://pl.wikipedia.org/w/api.php");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::File::create(&path).unwrap();

        std::env::set_var("PLBOT_USERNAME", "EnvBot");
        let s = Settings::load(Some(&path));
        std::env::remove_var("PLBOT_USERNAME");

        let s = s.unwrap();
        assert_eq!(s.username.as_deref(), Some("EnvBot"));
        assert_eq!(s.timeout_secs, 60);
    }

    #[test]
    fn credentials_need_both_parts() {
        let mut s = Settings::default();
        assert!(s.credentials().is_none());
        s.username = Some("Bot".into());
        assert!(s.credentials().is_none());
        s.password = Some("secret".into());
        assert_eq!(s.credentials(), Some(("Bot", "secret")));
    }
}
