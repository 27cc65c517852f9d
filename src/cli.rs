use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::services::insight_service::render_price_table;
use crate::services::pipeline::PipelineEvent;

const TICKER_PROMPT: &str = "Enter stock ticker (e.g., AAPL): ";

#[derive(Debug, Parser)]
#[command(name = "stock-insights", version, about = "Fetch recent prices, ask an LLM for insights, store both")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline for one ticker (the default). Prompts when no ticker is given.
    Run {
        ticker: Option<String>,
    },
    /// Create the stock_records table
    Migrate,
    /// Serve stored records over HTTP
    Serve {
        /// Overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Reads one ticker line from stdin. EOF yields an empty string.
pub async fn prompt_ticker() -> std::io::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(TICKER_PROMPT.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line)
}

pub fn format_insights(insights: &[String]) -> String {
    insights
        .iter()
        .enumerate()
        .map(|(i, insight)| format!("{}. {}\n", i + 1, insight))
        .collect()
}

pub fn print_event(event: PipelineEvent<'_>) {
    match event {
        PipelineEvent::Fetching { ticker } => println!("\nFetching data for {}...", ticker),
        PipelineEvent::Fetched(series) => {
            println!("\n=== Stock Prices ===");
            print!("{}", render_price_table(series));
        }
        PipelineEvent::Generating => println!("\nGenerating actionable insights..."),
        PipelineEvent::Generated(insights) => {
            println!("\n=== Actionable Insights ===");
            print!("{}", format_insights(insights));
        }
        PipelineEvent::Saving => println!("\nSaving to PostgreSQL..."),
        PipelineEvent::Saved { rows } => println!("Done! {} records saved to database.", rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["stock-insights"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_with_ticker() {
        let cli = Cli::try_parse_from(["stock-insights", "run", "aapl"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Run { ticker: Some(t) }) if t == "aapl"));
    }

    #[test]
    fn test_serve_port() {
        let cli = Cli::try_parse_from(["stock-insights", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Serve { port: Some(8080) })));
    }

    #[test]
    fn test_format_insights_numbers_from_one() {
        let text = format_insights(&["Buy the dip".to_string(), "Watch volume".to_string()]);
        assert_eq!(text, "1. Buy the dip\n2. Watch volume\n");
    }

    #[test]
    fn test_clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
