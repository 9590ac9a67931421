use anyhow::{bail, Context};
use clap::Parser;
use sa_pipeline::{init_logging, render_report, Pipeline, SentimentIndex, Settings};
use sa_web::AppState;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "News sentiment analysis and buy/hold/sell recommendations for stock tickers",
    subcommand_negates_reqs = true,
    subcommand_precedence_over_arg = true
)]
pub struct Cli {
    /// Ticker symbol to analyze (e.g. AAPL)
    #[arg(required = true)]
    ticker: Option<String>,
    #[command(flatten)]
    settings: Settings,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service (POST /analyze, GET /health)
    Serve {
        #[arg(long, env = "SA_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
}

fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().to_uppercase();
    (!ticker.is_empty()).then_some(ticker)
}

async fn analyze(ticker: &str, settings: &Settings) -> anyhow::Result<ExitCode> {
    let pipeline = Pipeline::from_settings(settings).context("Could not set up the pipeline")?;

    match pipeline
        .run_detailed(ticker, settings.articles_to_fetch, settings.articles_to_inference)
        .await
    {
        Ok(output) => {
            if let Some(index) = SentimentIndex::from_items(ticker, &output.analysis.news_items) {
                println!("{}", index);
            }
            println!("{}", render_report(ticker, &output.report));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("🛑 FATAL [{}]: {}", e.stage, e.message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Some(Commands::Serve { bind }) => {
            let state = AppState::from_settings(&cli.settings).context("Could not set up the service")?;
            info!("🚀 Starting sentiment service on {}", bind);
            sa_web::serve(bind, Arc::new(state)).await?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let Some(ticker) = cli.ticker.as_deref().and_then(normalize_ticker) else {
                bail!("Ticker symbol cannot be empty");
            };
            analyze(&ticker, &cli.settings).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.settings.log_dir);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("🛑 FATAL: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ticker_is_required() {
        assert!(Cli::try_parse_from(["sa"]).is_err());

        let cli = Cli::try_parse_from(["sa", "aapl", "--model", "offline"]).unwrap();
        assert_eq!(cli.ticker.as_deref(), Some("aapl"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_needs_no_ticker() {
        let cli = Cli::try_parse_from(["sa", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Some(Commands::Serve { bind }) => assert_eq!(bind, "127.0.0.1:9000".parse().unwrap()),
            other => panic!("expected serve, got {:?}", other),
        }
        assert!(cli.ticker.is_none());
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" brk.b "), Some("BRK.B".to_string()));
        assert_eq!(normalize_ticker("   "), None);
    }
}
