use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use page_recorder::core::SystemClock;
use page_recorder::dom::{parse_html, query_shadow_all_str};
use page_recorder::scenario::{run_scenario, Scenario};
use page_recorder::selector::{generate_and_validate_selectors, SelectorOptions};
use page_recorder::RecorderConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "page-recorder", version, about = "Record user actions against an HTML page")]
struct Cli {
    /// JSON recorder configuration; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the validated selectors generated for one element.
    Selectors {
        #[arg(long)]
        html: PathBuf,
        /// CSS selector locating the element.
        #[arg(long)]
        target: String,
        #[arg(long)]
        max: Option<usize>,
    },
    /// Replay a scripted session and print the recorded actions as JSON lines.
    Record {
        #[arg(long)]
        html: PathBuf,
        #[arg(long)]
        scenario: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RecorderConfig> {
    match path {
        Some(path) => RecorderConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(RecorderConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Selectors { html, target, max } => {
            let source = tokio::fs::read_to_string(&html)
                .await
                .with_context(|| format!("reading {}", html.display()))?;
            let doc = parse_html(&source)?;
            let node = query_shadow_all_str(&doc, &target)?
                .into_iter()
                .next()
                .with_context(|| format!("no element matches {}", target))?;
            let options = SelectorOptions {
                max_selectors: max.unwrap_or(config.selector.max_selectors),
                ..SelectorOptions::default()
            };
            let selectors = generate_and_validate_selectors(&doc, node, options, &config.selector);
            info!(count = selectors.len(), "selectors generated");
            println!("{}", serde_json::to_string_pretty(&selectors)?);
        }
        Command::Record { html, scenario } => {
            let source = tokio::fs::read_to_string(&html)
                .await
                .with_context(|| format!("reading {}", html.display()))?;
            let raw = tokio::fs::read_to_string(&scenario)
                .await
                .with_context(|| format!("reading {}", scenario.display()))?;
            let scenario = Scenario::from_json_str(&raw)?;
            let records = run_scenario(&scenario, &source, config, &SystemClock).await?;
            for record in &records {
                println!("{}", record.to_json()?);
            }
        }
    }

    Ok(())
}
