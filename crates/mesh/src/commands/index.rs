//! `mesh index` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use mesh_config::{CliSettings, Config};
use mesh_path::Path;
use mesh_server::{scores_from_config, site_settings_from_config};
use mesh_site::{PageScores, Site, SiteIndex};
use mesh_storage::{ContentSource, FsSource};
use serde::Serialize;

use crate::error::CliError;
use crate::output::Output;

/// Report format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// Aligned columns for humans.
    #[default]
    Table,
    /// One JSON document.
    Json,
}

/// Arguments for the index command.
#[derive(Args)]
pub(crate) struct IndexArgs {
    /// Path to configuration file (default: auto-discover mesh.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    format: Format,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl IndexArgs {
    /// Execute the index command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the report cannot be
    /// serialized.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let source: Arc<dyn ContentSource> =
            Arc::new(FsSource::new(config.paths.source_dir.clone()));
        let scores: PageScores = scores_from_config(&config).into_iter().collect();
        let site = Site::new(source, site_settings_from_config(&config))
            .with_site_info(Arc::new(scores));
        let report = IndexReport::from_index(&site.rebuild_now());

        match self.format {
            Format::Json => output.line(&serde_json::to_string_pretty(&report)?),
            Format::Table => print_table(&output, &report),
        }
        Ok(())
    }
}

/// Ranked pages and languages of one snapshot.
#[derive(Debug, PartialEq, Serialize)]
struct IndexReport {
    pages: Vec<PageRow>,
    languages: Vec<LanguageRow>,
}

#[derive(Debug, PartialEq, Serialize)]
struct PageRow {
    path: String,
    title: String,
    hits: u64,
}

#[derive(Debug, PartialEq, Serialize)]
struct LanguageRow {
    code: String,
    path: String,
    title: String,
}

impl IndexReport {
    fn from_index(index: &SiteIndex) -> Self {
        let pages = index
            .ranked()
            .iter()
            .map(|record| PageRow {
                path: link(&record.path),
                title: record.title.clone(),
                hits: record.stats.total_hits(),
            })
            .collect();
        let languages = index
            .languages()
            .iter()
            .map(|language| LanguageRow {
                code: language.code.clone(),
                path: link(&language.path),
                title: language.title.clone(),
            })
            .collect();
        Self { pages, languages }
    }
}

/// Site link of a path, `/` for the root.
fn link(path: &Path) -> String {
    if path.is_root() {
        "/".to_owned()
    } else {
        path.as_link()
    }
}

fn print_table(output: &Output, report: &IndexReport) {
    let width = report
        .pages
        .iter()
        .map(|row| row.path.chars().count())
        .max()
        .unwrap_or(0)
        .max("PATH".len());

    output.heading(&format!("{:<width$}  {:>6}  TITLE", "PATH", "HITS"));
    for row in &report.pages {
        output.line(&format!("{:<width$}  {:>6}  {}", row.path, row.hits, row.title));
    }
    output.muted(&format!("{} pages", report.pages.len()));

    if !report.languages.is_empty() {
        output.heading("LANGUAGES");
        for language in &report.languages {
            output.line(&format!(
                "{:<8}{:<width$}  {}",
                language.code, language.path, language.title
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use mesh_site::SiteSettings;
    use mesh_storage::MockSource;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_report_lists_ranked_pages_and_languages() {
        let source = MockSource::new()
            .with_file("index.html", 100, "<title>Home</title>")
            .with_file("en/index.html", 100, "<title>English</title>")
            .with_file("en/about.html", 100, "<title>About</title>");
        let site = Site::new(Arc::new(source), SiteSettings::default());
        let index = site.rebuild_now();
        index
            .get(&Path::new("en/about.html"))
            .unwrap()
            .stats
            .record_hit();

        let report = IndexReport::from_index(&index);

        let paths: Vec<_> = report.pages.iter().map(|row| row.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/en", "/en/about.html"]);
        assert_eq!(report.pages[2].hits, 1);
        assert_eq!(
            report.languages,
            vec![LanguageRow {
                code: "en".to_owned(),
                path: "/en".to_owned(),
                title: "English".to_owned(),
            }]
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = IndexReport {
            pages: vec![PageRow {
                path: "/".to_owned(),
                title: "Home".to_owned(),
                hits: 3,
            }],
            languages: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "pages": [{"path": "/", "title": "Home", "hits": 3}],
                "languages": [],
            })
        );
    }
}
