mod align;
mod anchors;
mod collate;
mod config;
mod dedup;
mod engine;
mod error;
mod extract;
mod matcher;
mod output;
mod text;
mod wordlist;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::align::Strategy;
use crate::config::Settings;
use crate::engine::Engine;
use crate::error::AlignError;
use crate::extract::SourceFormat;
use crate::output::RunSummary;
use crate::wordlist::WordlistOptions;

#[derive(Parser)]
#[command(name = "page_aligner", about = "Assign scanned-dictionary page numbers to a wordlist")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a wordlist against extracted headwords and write TERM|PAGE lines
    Align {
        /// Wordlist, one term per line (KEY|TERM for keyed sources)
        wordlist: PathBuf,
        /// Page text file or directory, headword index or TOC
        source: PathBuf,
        #[arg(short, long, value_enum, default_value = "pages")]
        format: SourceFormat,
        #[arg(short, long, value_enum, default_value = "window")]
        strategy: Strategy,
        /// Assignment file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Only align terms listed in this file
        #[arg(long)]
        allowed: Option<PathBuf>,
        /// Also write the run statistics as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Extract and collate anchors, then list them as TEXT|PAGE
    Anchors {
        source: PathBuf,
        #[arg(short, long, value_enum, default_value = "pages")]
        format: SourceFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Collapse plural and near-duplicate wordlist entries
    Dedup {
        wordlist: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Write dropped entries as DROPPED|KEPT|REASON
        #[arg(long)]
        dropped: Option<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Page of the headword each query falls under
    Lookup {
        source: PathBuf,
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(short, long, value_enum, default_value = "toc")]
        format: SourceFormat,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Settings file plus per-run overrides.
#[derive(Args)]
struct SettingsArgs {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long)]
    tolerance: Option<u32>,
    #[arg(long)]
    first_page: Option<u32>,
    #[arg(long)]
    page_start: Option<u32>,
    #[arg(long)]
    page_end: Option<u32>,
    #[arg(long, allow_hyphen_values = true)]
    page_offset: Option<i64>,
    /// Headword marker regex in page text
    #[arg(long)]
    marker: Option<String>,
    /// Key pattern with a <key> placeholder
    #[arg(long)]
    key_pattern: Option<String>,
    /// Raw text replacement FROM|TO, repeatable
    #[arg(long = "replace")]
    replacements: Vec<String>,
    #[arg(long)]
    workers: Option<usize>,
    /// Fold plural anchors into their singular
    #[arg(long)]
    plural_rule: bool,
}

impl SettingsArgs {
    fn load(&self) -> anyhow::Result<Settings> {
        let mut s = Settings::load(self.config.as_deref()).context("loading settings")?;
        if let Some(v) = self.threshold {
            s.similarity_threshold = v;
        }
        if let Some(v) = self.tolerance {
            s.page_tolerance = v;
        }
        if let Some(v) = self.first_page {
            s.first_page = v;
        }
        if let Some(v) = self.page_start {
            s.page_range_start = v;
        }
        if let Some(v) = self.page_end {
            s.page_range_end = v;
        }
        if let Some(v) = self.page_offset {
            s.page_offset = v;
        }
        if let Some(v) = &self.marker {
            s.headword_marker = v.clone();
        }
        if let Some(v) = &self.key_pattern {
            s.key_pattern = Some(v.clone());
        }
        s.replacements.extend(self.replacements.iter().cloned());
        if let Some(v) = self.workers {
            s.workers = v;
        }
        s.plural_rule |= self.plural_rule;
        Ok(s)
    }

    fn engine(&self) -> anyhow::Result<Engine> {
        let settings = self.load()?;
        info!(?settings, "settings loaded");
        Ok(Engine::new(settings)?)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Align {
            wordlist,
            source,
            format,
            strategy,
            output,
            allowed,
            summary_json,
            settings,
        } => {
            let engine = settings.engine()?;
            let keyed = format.is_keyed();
            let allowed = allowed.as_deref().map(crate::wordlist::load_allowed).transpose()?;
            let options = WordlistOptions {
                delimiter: engine.settings.delimiter,
                keyed,
                allowed,
            };
            let terms = crate::wordlist::load_wordlist(&wordlist, &options)
                .with_context(|| format!("loading wordlist {}", wordlist.display()))?;
            println!("Loaded {} terms from {}", terms.len(), wordlist.display());

            let anchors = load_anchors(&engine, &source, format, keyed)?;
            let (prepared, skipped) = engine.prepare_terms(terms);
            let assignments = engine.align(&prepared, &anchors, strategy);
            crate::output::write_assignments(&output, &assignments, &engine.settings)?;
            println!("Wrote {} assignments to {}", assignments.len(), output.display());

            let mut summary = RunSummary::from_assignments(&assignments, skipped, anchors.len());
            summary.wordlist = wordlist.display().to_string();
            summary.source = source.display().to_string();
            summary.strategy = strategy.label().to_string();
            summary.elapsed_secs = t0.elapsed().as_secs_f64();
            summary.print();
            if let Some(path) = summary_json {
                summary.write_json(&path)?;
            }
            Ok(())
        }
        Commands::Anchors {
            source,
            format,
            output,
            settings,
        } => {
            let engine = settings.engine()?;
            let anchors = load_anchors(&engine, &source, format, format.is_keyed())?;
            let delim = engine.settings.delimiter;
            let lines = anchors
                .iter()
                .map(|a| format!("{}{}{}", a.raw_text, delim, a.page as i64 + engine.settings.page_offset));
            match output {
                Some(path) => {
                    crate::output::write_lines(&path, lines)?;
                    println!("Wrote {} anchors to {}", anchors.len(), path.display());
                }
                None => lines.for_each(|l| println!("{}", l)),
            }
            let plurals = anchors.plural_pairs();
            if !plurals.is_empty() {
                println!("{} singular/plural pairs (see --plural-rule)", plurals.len());
            }
            Ok(())
        }
        Commands::Dedup {
            wordlist,
            output,
            dropped,
            settings,
        } => {
            let engine = settings.engine()?;
            let options = WordlistOptions {
                delimiter: engine.settings.delimiter,
                ..WordlistOptions::default()
            };
            let terms = crate::wordlist::load_wordlist(&wordlist, &options)
                .with_context(|| format!("loading wordlist {}", wordlist.display()))?;
            let outcome = dedup::dedup(&terms, &engine.normalizer, &engine.settings);
            crate::output::write_lines(&output, outcome.kept.iter().map(|t| t.text.clone()))?;
            println!(
                "Kept {} of {} terms ({} dropped)",
                outcome.kept.len(),
                terms.len(),
                outcome.dropped.len()
            );
            if let Some(path) = dropped {
                let delim = engine.settings.delimiter;
                crate::output::write_lines(
                    &path,
                    outcome
                        .dropped
                        .iter()
                        .map(|d| format!("{}{}{}{}{:?}", d.term.text, delim, d.kept, delim, d.reason)),
                )?;
            }
            Ok(())
        }
        Commands::Lookup {
            source,
            queries,
            format,
            settings,
        } => {
            let engine = settings.engine()?;
            let anchors = load_anchors(&engine, &source, format, false)?;
            for q in &queries {
                match engine.lookup(&anchors, q) {
                    Some(hit) => println!(
                        "{:<30} {:>6}{} {}",
                        truncate(q, 30),
                        hit.page,
                        if hit.exact { " " } else { "?" },
                        hit.headword
                    ),
                    None => println!("{:<30} {:>6}", truncate(q, 30), "-"),
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_anchors(
    engine: &Engine,
    source: &Path,
    format: SourceFormat,
    keyed: bool,
) -> anyhow::Result<anchors::AnchorSet> {
    let extraction = extract::extract(source, format, engine)
        .with_context(|| format!("extracting anchors from {}", source.display()))?;
    println!(
        "Extracted {} anchors from {} units ({} failed, {} out of page range)",
        extraction.anchors.len(),
        extraction.units,
        extraction.failed,
        extraction.out_of_range
    );
    let anchors = engine.build_anchors(extraction.anchors, keyed);
    if anchors.is_empty() {
        return Err(AlignError::NoAnchors {
            source_desc: source.display().to_string(),
        }
        .into());
    }
    Ok(anchors)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
