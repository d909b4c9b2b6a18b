use anyhow::Result;
use bankimport::log::init_logging;
use bankimport::{RunOptions, run};
use clap::Parser;

/// Convert a bank statement CSV into a multi-split ledger import CSV.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Bank statement CSV export
    statement: String,

    /// Account rules YAML file
    rules: String,

    /// Output CSV path
    #[arg(short, long, default_value = "multi_split_ledger.csv")]
    output: String,

    /// Override the source (bank) account from the rules file
    #[arg(short, long)]
    source_account: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = RunOptions {
        statement_path: cli.statement,
        rules_path: cli.rules,
        output_path: cli.output.clone(),
        source_account: cli.source_account,
    };

    let result = run(&options).await;
    match &result {
        Ok(summary) => {
            println!(
                "Conversion complete. {} transactions written to {}",
                summary.total_transactions, cli.output
            );
            if !summary.price_failures.is_empty() {
                println!(
                    "{} transactions posted without a resolved price; see warnings.",
                    summary.price_failures.len()
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Conversion failed");
        }
    }
    result.map(|_| ())
}
