//! Posting construction and ledger-import CSV output.

use crate::rules::Rule;
use crate::statement::BankTransaction;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Statutory stamp duty on mutual fund purchases, 0.005% of the invested
/// value, deducted before units are allotted.
const STAMP_DUTY_RATE: f64 = 0.000_05;

/// One ledger entry. `value` is the signed cash value of the leg; `amount`
/// equals `value` except on a priced security leg, where it is the number of
/// units (`value / price`).
#[derive(Debug, Clone)]
pub struct Posting {
    pub txn_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub account: String,
    pub amount: f64,
    pub value: f64,
    pub price: Option<f64>,
}

pub struct PostingBuilder {
    pub source_account: String,
    pub unclassified_account: String,
    pub stamp_duty_account: String,
}

impl PostingBuilder {
    /// Builds the balanced legs for one statement transaction. Emits two
    /// legs, or three when a mutual fund purchase has a resolved unit price
    /// (the third carries the stamp duty). Legs share a freshly generated
    /// transaction id and their `value`s sum to zero.
    pub fn build(
        &self,
        transaction: &BankTransaction,
        rule: Option<&Rule>,
        unit_price: Option<f64>,
    ) -> Vec<Posting> {
        let txn_id = Uuid::new_v4().to_string();
        let value = transaction.value();
        let signed = transaction.signed_amount();

        let leg = |account: &str, amount: f64, value: f64, price: Option<f64>| Posting {
            txn_id: txn_id.clone(),
            date: transaction.date,
            description: transaction.description.clone(),
            account: account.to_string(),
            amount,
            value,
            price,
        };

        let source = leg(&self.source_account, signed, signed, None);

        let Some(rule) = rule else {
            let counter = leg(&self.unclassified_account, -signed, -signed, None);
            return vec![source, counter];
        };

        let wants_price = rule
            .mutual_fund
            .as_ref()
            .is_some_and(|mf| mf.price_determine);

        // Pricing failure falls back to the plain cash leg; stamp duty is
        // only meaningful when a price converted value to units.
        if let (true, Some(price)) = (wants_price, unit_price) {
            let direction = if transaction.is_withdrawal() { 1.0 } else { -1.0 };
            let stamp_duty = value * STAMP_DUTY_RATE;
            let adjusted_value = direction * (value - stamp_duty);

            let security = leg(
                &rule.account,
                adjusted_value / price,
                adjusted_value,
                Some(price),
            );
            let duty = leg(
                &self.stamp_duty_account,
                direction * stamp_duty,
                direction * stamp_duty,
                None,
            );
            return vec![source, security, duty];
        }

        let counter = leg(&rule.account, -signed, -signed, None);
        vec![source, counter]
    }
}

pub fn write_postings_file<P: AsRef<Path>>(path: P, postings: &[Posting]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())
        .with_context(|| format!("Failed to create output file: {}", path.as_ref().display()))?;
    write_postings(file, postings)
}

pub fn write_postings<W: Write>(writer: W, postings: &[Posting]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "Transaction ID",
        "Date",
        "Description",
        "Full Account Name",
        "Amount",
        "Value",
        "Price",
    ])?;

    for posting in postings {
        let record = [
            posting.txn_id.clone(),
            posting.date.format("%d/%m/%Y").to_string(),
            posting.description.clone(),
            posting.account.clone(),
            format!("{:.4}", posting.amount),
            format!("{:.2}", posting.value),
            posting.price.map(|p| format!("{p:.4}")).unwrap_or_default(),
        ];
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush().context("Failed to write ledger CSV")?;
    Ok(())
}
