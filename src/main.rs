mod config;
mod models;
mod pipeline;
mod reconciler;
mod scraper;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::models::{Metal, RatesPayload, Source};
use crate::pipeline::Pipeline;
use crate::scraper::cleaner::fmt_rupees;

#[derive(Parser)]
#[command(name = "metal-rates", about = "Gold and silver spot rates from public Indian rate pages", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every source now and print the reconciled rates
    Fetch {
        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,

        /// Print a human-readable table instead of JSON
        #[arg(long, conflicts_with = "pretty")]
        table: bool,
    },

    /// Fetch every source and print the raw per-source quotes
    Quotes {
        #[arg(short, long, value_enum)]
        metal: Option<Metal>,
    },

    /// Run one extractor over a saved HTML page (no network)
    Parse {
        #[arg(short, long, value_enum)]
        source: Source,

        #[arg(short, long, value_enum)]
        metal: Metal,

        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "metal_rates=info,warn",
        1 => "metal_rates=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Fetch { pretty, table } => {
            let pipeline = Arc::new(Pipeline::new(config)?);
            cancel_on_ctrl_c(Arc::clone(&pipeline));
            let (status, response) = pipeline::respond(&pipeline).await;

            if table {
                if let Some(payload) = &response.data {
                    print_table(payload);
                }
            } else if pretty {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", serde_json::to_string(&response)?);
            }

            let code = exit_code(status);
            if code != 0 {
                std::process::exit(code);
            }
        }

        Command::Quotes { metal } => {
            let mut pipeline = Pipeline::new(config)?;
            if let Some(metal) = metal {
                pipeline = pipeline.only(metal);
            }
            let quotes = pipeline.collect_quotes().await?;
            println!("{}", serde_json::to_string_pretty(&quotes)?);
        }

        Command::Parse { source, metal, file } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let quote = scraper::parse_quote(source, metal, &html);
            info!("{} {} from {:?}: {:?}", source, metal, file, quote.price);
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
    }

    Ok(())
}

/// First Ctrl-C cancels sources still queued; the run then ends with status 500.
fn cancel_on_ctrl_c(pipeline: Arc<Pipeline>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            pipeline.cancel();
        }
    });
}

/// Process exit code for a response status: 0 for 200, 1 otherwise.
fn exit_code(status: u16) -> i32 {
    if status == 200 { 0 } else { 1 }
}

fn print_table(payload: &RatesPayload) {
    println!("─────────────────────────────────");
    println!("  Metal rates  {}", payload.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("─────────────────────────────────");
    for metal in [Metal::Gold, Metal::Silver] {
        let Some(rate) = payload.rate(metal) else {
            continue;
        };
        let unit = match rate.metal {
            Metal::Gold => "10 g",
            Metal::Silver => "1 kg",
        };
        let price = rate.price.map(fmt_rupees).unwrap_or_else(|| "—".into());
        println!("  {:<7}({}) : {}", rate.metal.to_string(), unit, price);
    }
    println!("─────────────────────────────────");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_follows_status() {
        assert_eq!(exit_code(200), 0);
        assert_eq!(exit_code(500), 1);
    }

    #[test]
    fn test_fetch_flags() {
        let cli = Cli::try_parse_from(["metal-rates", "fetch", "--table"]).unwrap();
        assert!(matches!(cli.command, Command::Fetch { table: true, pretty: false }));
        assert!(Cli::try_parse_from(["metal-rates", "fetch", "--table", "--pretty"]).is_err());
    }
}
