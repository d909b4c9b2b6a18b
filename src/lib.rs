pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod log;
pub mod nav_provider;
pub mod posting;
pub mod providers;
pub mod resolver;
pub mod rules;
pub mod statement;

use crate::config::RulesConfig;
use crate::error::ConvertError;
use crate::posting::{Posting, PostingBuilder};
use crate::providers::amfi::AmfiProvider;
use crate::resolver::PriceResolver;
use crate::rules::Rule;
use crate::statement::BankTransaction;
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RunOptions {
    pub statement_path: String,
    pub rules_path: String,
    pub output_path: String,
    /// Overrides the rules file's source account when set.
    pub source_account: Option<String>,
}

/// Per-transaction price lookup that could not produce a unit price.
#[derive(Debug)]
pub struct PriceFailure {
    pub row: usize,
    pub description: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub total_transactions: usize,
    pub unclassified: usize,
    pub priced: usize,
    pub price_failures: Vec<PriceFailure>,
}

pub async fn run(options: &RunOptions) -> Result<RunSummary> {
    info!("Statement conversion starting...");

    let config = RulesConfig::load_from_path(&options.rules_path)?;
    let transactions = statement::read_statement_file(&options.statement_path)?;

    let provider: Arc<dyn nav_provider::NavProvider> =
        Arc::new(AmfiProvider::new(&config.feed.base_url));
    let resolver = PriceResolver::new(provider, config.trading_calendar());

    let builder = PostingBuilder {
        source_account: options
            .source_account
            .clone()
            .unwrap_or_else(|| config.accounts.source.clone()),
        unclassified_account: config.accounts.unclassified.clone(),
        stamp_duty_account: config.accounts.stamp_duty.clone(),
    };

    let (postings, summary) = convert(&transactions, &config, &resolver, &builder).await?;
    posting::write_postings_file(&options.output_path, &postings)?;

    info!(
        "Converted {} transactions into {} postings ({} unclassified, {} priced, {} price failures)",
        summary.total_transactions,
        postings.len(),
        summary.unclassified,
        summary.priced,
        summary.price_failures.len()
    );
    for failure in &summary.price_failures {
        warn!(
            row = failure.row,
            description = %failure.description,
            "Posted without a unit price: {}",
            failure.reason
        );
    }

    Ok(summary)
}

/// Classifies and prices every transaction, then emits postings in input
/// order. Price lookups fan out concurrently across transactions; the
/// window cache coalesces duplicate feed fetches. Feed failures downgrade
/// the affected transaction to an unpriced posting and are reported in the
/// summary; a calendar configuration bug aborts the run.
pub async fn convert(
    transactions: &[BankTransaction],
    config: &RulesConfig,
    resolver: &PriceResolver,
    builder: &PostingBuilder,
) -> Result<(Vec<Posting>, RunSummary)> {
    let classified: Vec<Option<&Rule>> = transactions
        .iter()
        .map(|txn| rules::classify(&txn.description, txn.value(), &config.rules))
        .collect();

    let price_jobs = transactions
        .iter()
        .zip(&classified)
        .map(|(txn, rule)| price_for(txn, *rule, config, resolver));
    let prices = join_all(price_jobs).await;

    let mut summary = RunSummary {
        total_transactions: transactions.len(),
        ..RunSummary::default()
    };
    let mut postings = Vec::with_capacity(transactions.len() * 2);

    for (idx, ((txn, rule), outcome)) in transactions
        .iter()
        .zip(&classified)
        .zip(prices)
        .enumerate()
    {
        if rule.is_none() {
            summary.unclassified += 1;
        }

        let price = match outcome {
            PriceOutcome::NotApplicable => None,
            PriceOutcome::Resolved(nav) => {
                summary.priced += 1;
                Some(nav)
            }
            PriceOutcome::Failed(reason) => {
                summary.price_failures.push(PriceFailure {
                    row: idx + 1,
                    description: txn.description.clone(),
                    reason,
                });
                None
            }
            PriceOutcome::Fatal(err) => return Err(err.into()),
        };

        postings.extend(builder.build(txn, *rule, price));
    }

    Ok((postings, summary))
}

enum PriceOutcome {
    NotApplicable,
    Resolved(f64),
    Failed(String),
    Fatal(ConvertError),
}

async fn price_for(
    txn: &BankTransaction,
    rule: Option<&Rule>,
    config: &RulesConfig,
    resolver: &PriceResolver,
) -> PriceOutcome {
    let Some(mf) = rule.and_then(|r| r.mutual_fund.as_ref()) else {
        return PriceOutcome::NotApplicable;
    };
    if !mf.price_determine {
        return PriceOutcome::NotApplicable;
    }

    let Some(fund_house) = config.mutual_funds.get(&mf.fund_house) else {
        return PriceOutcome::Failed(format!(
            "fund house '{}' not found in mutual_funds mapping",
            mf.fund_house
        ));
    };

    match resolver
        .resolve_nav(&mf.amfi_scheme_code, fund_house.mf_number, txn.date)
        .await
    {
        Ok(Some(nav)) => PriceOutcome::Resolved(nav),
        Ok(None) => PriceOutcome::Failed(format!(
            "no NAV published for scheme {} on or before the trading date",
            mf.amfi_scheme_code
        )),
        Err(err @ ConvertError::CalendarUnbounded { .. }) => PriceOutcome::Fatal(err),
        Err(err) => PriceOutcome::Failed(err.to_string()),
    }
}
