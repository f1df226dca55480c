mod aggregate;
mod config;
mod document;
mod error;
mod parser;
mod pipeline;
mod session;
mod sources;
mod store;
mod transport;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use config::FetchConfig;
use document::{Document, SectionData};
use sources::SourceProfile;
use transport::{HttpTransport, RenderedTransport, Transport};

#[derive(Parser)]
#[command(name = "case_scraper", about = "Extract case records from government case portals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Planning case behind the disclaimer gate (reference like FP/2025/0159)
    Planning {
        /// Case reference, TYPE/YEAR/NUMBER
        reference: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Building warrant from the tabbed portal (rendered in a browser)
    Warrant {
        /// Opaque case token
        token: String,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Print progress
    #[arg(short, long)]
    verbose: bool,
    /// Output file (default: data/<identifier>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Override the portal base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Print the verdict without writing the document
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Commands::Planning { run, .. } | Commands::Warrant { run, .. } => run.verbose,
    };

    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Returns whether the scraped document passed validation.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let t0 = Instant::now();
    let config = FetchConfig::from_env();

    let (identifier, args, profile, transport): (String, RunArgs, SourceProfile, Box<dyn Transport>) =
        match cli.command {
            Commands::Planning { reference, run } => {
                let base = run.base_url.clone().or_else(|| std::env::var("PLANNING_BASE_URL").ok());
                let profile = SourceProfile::planning(base.as_deref());
                let transport = HttpTransport::new(config).context("Failed to build HTTP client")?;
                (reference, run, profile, Box::new(transport) as Box<dyn Transport>)
            }
            Commands::Warrant { token, run } => {
                let base = run.base_url.clone().or_else(|| std::env::var("WARRANT_BASE_URL").ok());
                let profile = SourceProfile::warrant(base.as_deref());
                let transport = RenderedTransport::new(config)?;
                (token, run, profile, Box::new(transport) as Box<dyn Transport>)
            }
        };

    let progress = if args.verbose {
        let pb = ProgressBar::new(profile.sections.len() as u64);
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")?,
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        println!("Scraping {} from {} ({})", identifier, profile.name, profile.base_url);
        pb
    } else {
        ProgressBar::hidden()
    };

    let outcome = pipeline::scrape(&identifier, &profile, transport.as_ref(), progress.clone()).await;
    progress.finish_and_clear();
    let document = outcome.map_err(|e| anyhow::anyhow!("{} ({})", e, e.code()))?;

    if args.verbose {
        print_sections(&document);
    }
    print_verdict(&document);

    if !args.no_save {
        let path = args.output.unwrap_or_else(|| store::default_path(&identifier));
        store::save_document(&document, &path)?;
        println!("Saved {}", path.display());
    }

    let elapsed = t0.elapsed();
    if args.verbose && elapsed.as_secs() >= 1 {
        println!("Done in {}", format_duration(elapsed));
    }

    Ok(document.metadata.validation.is_valid)
}

fn print_sections(document: &Document) {
    for (name, data) in &document.sections {
        let summary = match data {
            Some(SectionData::Record(r)) => format!("{} fields", r.len()),
            Some(SectionData::Rows(rows)) => format!("{} rows", rows.len()),
            None => "-".to_string(),
        };
        println!("  {:<14} {}", name, summary);
    }
    if let Some(desc) = &document.metadata.case_type_description {
        println!("  case type      {}", desc);
    }
}

fn print_verdict(document: &Document) {
    let meta = &document.metadata;
    for w in &meta.warnings {
        println!("Warning: {} {}: {}", w.code, w.section, w.message);
    }
    if meta.validation.is_valid {
        println!("Valid: {}", meta.identifier);
    } else {
        println!("Invalid: {}", meta.identifier);
        for e in &meta.validation.errors {
            println!("  - {}", e);
        }
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
