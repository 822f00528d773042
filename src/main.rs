mod error;
mod pipeline;
mod reports;
mod settings;
mod text;
mod wiki;
mod wikitext;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context as _};
use clap::{Args, Parser, Subcommand};
use regex::Regex;

use pipeline::{Publisher, RunStats, DEFAULT_MAXLINES};
use reports::presence::Predicate;
use reports::Context;
use settings::Settings;
use wiki::api::ApiClient;
use wiki::Source;

#[derive(Parser)]
#[command(name = "plbot", about = "Report and maintenance bots for Polish Wikipedia")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Report page to write (each command has its own default)
    #[arg(long, global = true)]
    outpage: Option<String>,

    /// Max rows per report page
    #[arg(long, global = true, default_value_t = DEFAULT_MAXLINES)]
    maxlines: usize,

    /// Edit summary
    #[arg(long, global = true, default_value = "Bot aktualizuje raport")]
    summary: String,

    /// Log what would be written, write nothing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose tracing
    #[arg(long, global = true)]
    test: bool,

    /// Settings file (default: ./plbot.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Where the pages come from. The first one given wins.
#[derive(Args)]
struct SourceArgs {
    /// Members of a category
    #[arg(long)]
    cat: Option<String>,
    /// Pages transcluding a template
    #[arg(long)]
    transcludes: Option<String>,
    /// Pages linking to a page
    #[arg(long)]
    links_to: Option<String>,
    /// Namespace filter; on its own, every page in the namespace
    #[arg(long)]
    ns: Option<i32>,
    /// Explicit title (repeatable)
    #[arg(long = "page")]
    pages: Vec<String>,
    /// File with one title per line
    #[arg(long)]
    titles_file: Option<PathBuf>,
}

impl SourceArgs {
    fn source(&self) -> anyhow::Result<Source> {
        let namespace = self.ns;
        let source = if let Some(name) = &self.cat {
            Source::Category {
                name: name.clone(),
                namespace,
            }
        } else if let Some(template) = &self.transcludes {
            Source::Transcludes {
                template: template.clone(),
                namespace,
            }
        } else if let Some(title) = &self.links_to {
            Source::LinksTo {
                title: title.clone(),
                namespace,
            }
        } else if !self.pages.is_empty() {
            Source::Titles(self.pages.iter().map(|t| wikitext::normalize_title(t)).collect())
        } else if let Some(path) = &self.titles_file {
            Source::TitlesFile(path.clone())
        } else if let Some(ns) = namespace {
            Source::Namespace(ns)
        } else {
            bail!("no pages given: use --cat, --transcludes, --links-to, --ns, --page or --titles-file");
        };
        Ok(source)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Tag articles without links or categories with the cleanup template
    Cleanup {
        #[command(flatten)]
        pages: SourceArgs,
    },
    /// List articles linking to disambiguation pages
    Disambig {
        #[command(flatten)]
        pages: SourceArgs,
    },
    /// List archived dead links
    Deadlinks {
        #[command(flatten)]
        pages: SourceArgs,
        /// Also remove dead-link markers next to archived citations
        #[arg(long)]
        fix: bool,
    },
    /// Most edited pages
    Revisions {
        #[command(flatten)]
        pages: SourceArgs,
    },
    /// Biographies split by gender from Wikidata
    Gender {
        #[command(flatten)]
        pages: SourceArgs,
    },
    /// Articles with end sections in the wrong order
    Sections {
        #[command(flatten)]
        pages: SourceArgs,
    },
    /// Articles with few internal links, one page per tier
    Links {
        #[command(flatten)]
        pages: SourceArgs,
    },
    /// Pages with (or without) a template, category or regex match
    Presence {
        #[command(flatten)]
        pages: SourceArgs,
        #[arg(long)]
        template: Vec<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        regex: Option<String>,
        /// Report pages that do NOT match
        #[arg(long)]
        negative: bool,
    },
    /// Add text to every page
    Insert {
        #[command(flatten)]
        pages: SourceArgs,
        #[arg(long)]
        text: String,
        /// Put the text at the top instead of the bottom
        #[arg(long, conflicts_with = "replace")]
        top: bool,
        /// Replace an existing template of the same name
        #[arg(long)]
        replace: bool,
    },
    /// HTML table of new pages from the recent-changes log
    Newpages {
        /// Semicolon-separated log file
        #[arg(long)]
        log: PathBuf,
        /// HTML file to write
        #[arg(long)]
        out: PathBuf,
    },
}

fn predicate(template: &[String], category: &Option<String>, regex: &Option<String>) -> anyhow::Result<Predicate> {
    if !template.is_empty() {
        return Ok(Predicate::Template(template.to_vec()));
    }
    if let Some(name) = category {
        return Ok(Predicate::Category(name.clone()));
    }
    if let Some(pattern) = regex {
        let re = Regex::new(pattern).with_context(|| format!("invalid --regex {:?}", pattern))?;
        return Ok(Predicate::Pattern(re));
    }
    bail!("presence needs --template, --category or --regex")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.test { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .init();

    let t0 = Instant::now();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    let client = ApiClient::new(&settings).context("building HTTP client")?;
    if cli.dry_run {
        println!("Dry run: nothing will be saved.");
    } else if let Some((user, password)) = settings.credentials() {
        client.login(user, password).context("logging in")?;
    }

    let ctx = Context {
        publisher: Publisher::new(&client, cli.dry_run, &cli.summary, settings.progress_log.clone()),
        settings: &settings,
        maxlines: cli.maxlines,
        outpage: cli.outpage.clone(),
    };

    let stats: RunStats = match &cli.command {
        Commands::Cleanup { pages } => {
            let month = reports::cleanup::month(&chrono::Local::now());
            reports::cleanup::run(&ctx, &pages.source()?, &month)?
        }
        Commands::Disambig { pages } => reports::disambig::run(&ctx, &pages.source()?)?,
        Commands::Deadlinks { pages, fix } => reports::deadlinks::run(&ctx, &pages.source()?, *fix)?,
        Commands::Revisions { pages } => reports::revisions::run(&ctx, &pages.source()?)?,
        Commands::Gender { pages } => reports::gender::run(&ctx, &pages.source()?)?,
        Commands::Sections { pages } => reports::sections::run(&ctx, &pages.source()?)?,
        Commands::Links { pages } => reports::links::run(&ctx, &pages.source()?)?,
        Commands::Presence {
            pages,
            template,
            category,
            regex,
            negative,
        } => {
            let predicate = predicate(template, category, regex)?;
            reports::presence::run(&ctx, &pages.source()?, &predicate, *negative)?
        }
        Commands::Insert {
            pages,
            text,
            top,
            replace,
        } => {
            let mode = match (*top, *replace) {
                (true, _) => reports::insert::Mode::Top,
                (_, true) => reports::insert::Mode::Replace,
                _ => reports::insert::Mode::default(),
            };
            reports::insert::run(&ctx, &pages.source()?, text, mode)?
        }
        Commands::Newpages { log, out } => {
            reports::newpages::run(&ctx.publisher, &settings.article_url, cli.maxlines, log, out)?
        }
    };

    println!(
        "Done: {} seen, {} skipped, {} accepted ({} over the cap, {} evicted, {} duplicates), {} rows on {} page(s) in {:.1}s",
        stats.seen,
        stats.skipped,
        stats.accepted,
        stats.rejected,
        stats.evicted,
        stats.duplicates,
        stats.rows,
        stats.pages_written,
        t0.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("plbot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["disambig", "--cat", "Miasta", "--maxlines", "50", "--dry-run"]);
        assert_eq!(cli.maxlines, 50);
        assert!(cli.dry_run);
        match cli.command {
            Commands::Disambig { pages } => {
                assert!(matches!(pages.source().unwrap(), Source::Category { name, namespace: None } if name == "Miasta"));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn namespace_alone_lists_namespace() {
        let cli = parse(&["links", "--ns", "0"]);
        let Commands::Links { pages } = cli.command else {
            panic!("wrong command");
        };
        assert!(matches!(pages.source().unwrap(), Source::Namespace(0)));
    }

    #[test]
    fn missing_source_is_an_error() {
        let Commands::Sections { pages } = parse(&["sections"]).command else {
            panic!("wrong command");
        };
        assert!(pages.source().is_err());
    }

    #[test]
    fn insert_modes_conflict() {
        let args = ["plbot", "insert", "--page", "A", "--text", "x", "--top", "--replace"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn presence_needs_a_predicate() {
        assert!(predicate(&[], &None, &None).is_err());
        assert!(predicate(&[], &None, &Some("(".into())).is_err());
        assert!(matches!(predicate(&[], &Some("X".into()), &None), Ok(Predicate::Category(_))));
    }
}
