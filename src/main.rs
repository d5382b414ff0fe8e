use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::prelude::*;

use stock_risk_analyzer::commands::{
    analyze_stock_risk, batch_analysis, calculate_technical_indicators, overview_analysis, CommandResponse,
};
use stock_risk_analyzer::config::{load_config, AnalysisConfig};
use stock_risk_analyzer::stock_api::ChatNarrator;

#[derive(Parser)]
#[command(name = "stock-risk-analyzer")]
#[command(about = "Technical indicators and rule-based risk verdicts for daily price series", long_about = None)]
struct Cli {
    /// JSON config overriding analysis windows and thresholds
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full risk verdict for one security
    Analyze {
        /// Price series JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Benchmark index series JSON file
        #[arg(short, long)]
        benchmark: Option<PathBuf>,

        /// OpenAI-compatible chat-completions URL for the narrative section
        #[arg(long)]
        narrator_url: Option<String>,

        /// Model name sent to the narrator
        #[arg(long, default_value = "deepseek-chat")]
        narrator_model: String,
    },

    /// Indicator set only
    Indicators {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Regression and percentile overview report
    Overview {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Verdicts for many securities from a `[{symbol, series}]` file
    Batch {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        benchmark: Option<PathBuf>,
    },
}

fn resolve_config(path: Option<&Path>) -> Result<AnalysisConfig, String> {
    match path {
        Some(path) => load_config(path).map_err(|e| format!("failed to load config {}: {}", path.display(), e)),
        None => Ok(AnalysisConfig::default()),
    }
}

fn print_response<T: Serialize>(response: &CommandResponse<T>, pretty: bool) -> ExitCode {
    let rendered = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("failed to serialize response: {}", e);
            return ExitCode::FAILURE;
        }
    }
    match response {
        CommandResponse::Success { .. } => ExitCode::SUCCESS,
        CommandResponse::Error { .. } => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_risk_analyzer=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(message) => return print_response(&CommandResponse::<()>::Error { message }, cli.pretty),
    };

    match cli.command {
        Commands::Analyze {
            input,
            benchmark,
            narrator_url,
            narrator_model,
        } => {
            let narrator = narrator_url
                .map(|url| ChatNarrator::new(url, narrator_model, std::env::var("NARRATOR_API_KEY").ok()));
            let response = analyze_stock_risk(&input, benchmark.as_deref(), narrator.as_ref(), &config).await;
            print_response(&response, cli.pretty)
        }
        Commands::Indicators { input } => {
            print_response(&calculate_technical_indicators(&input, &config), cli.pretty)
        }
        Commands::Overview { input } => print_response(&overview_analysis(&input, &config), cli.pretty),
        Commands::Batch { input, benchmark } => {
            print_response(&batch_analysis(&input, benchmark.as_deref(), &config), cli.pretty)
        }
    }
}
