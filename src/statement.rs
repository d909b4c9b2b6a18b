//! Bank statement CSV input.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const STATEMENT_DATE_FORMAT: &str = "%d/%m/%Y";

/// One statement line. At most one of withdrawal/deposit is positive in a
/// well-formed export.
#[derive(Debug, Clone)]
pub struct BankTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub withdrawal: f64,
    pub deposit: f64,
}

impl BankTransaction {
    pub fn is_withdrawal(&self) -> bool {
        self.withdrawal > 0.0
    }

    /// Cash magnitude of the transaction.
    pub fn value(&self) -> f64 {
        if self.is_withdrawal() {
            self.withdrawal
        } else {
            self.deposit
        }
    }

    /// Cash value from the source account's perspective.
    pub fn signed_amount(&self) -> f64 {
        if self.is_withdrawal() {
            -self.withdrawal
        } else {
            self.deposit
        }
    }
}

/// Raw CSV row shape as exported by the bank.
#[derive(Debug, Deserialize)]
struct StatementRecord {
    #[serde(rename = "Value Date")]
    value_date: String,
    #[serde(rename = "Transaction Remarks")]
    remarks: String,
    #[serde(rename = "Withdrawal Amount (INR )")]
    withdrawal: String,
    #[serde(rename = "Deposit Amount (INR )")]
    deposit: String,
}

pub fn read_statement_file<P: AsRef<Path>>(path: P) -> Result<Vec<BankTransaction>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open statement file: {}", path.as_ref().display()))?;
    read_statement(file)
}

pub fn read_statement<R: Read>(reader: R) -> Result<Vec<BankTransaction>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut transactions = Vec::new();
    for (idx, record) in csv_reader.deserialize::<StatementRecord>().enumerate() {
        let line = idx + 2; // header is line 1
        let record = record.with_context(|| format!("Malformed statement row at line {line}"))?;

        let date = NaiveDate::parse_from_str(&record.value_date, STATEMENT_DATE_FORMAT)
            .with_context(|| {
                format!("Invalid value date '{}' at line {line}", record.value_date)
            })?;
        let withdrawal = parse_amount(&record.withdrawal)
            .with_context(|| format!("Invalid withdrawal amount at line {line}"))?;
        let deposit = parse_amount(&record.deposit)
            .with_context(|| format!("Invalid deposit amount at line {line}"))?;

        transactions.push(BankTransaction {
            date,
            description: record.remarks,
            withdrawal,
            deposit,
        });
    }

    debug!("Read {} statement transactions", transactions.len());
    Ok(transactions)
}

/// Statement exports leave untouched columns blank and group thousands with
/// commas.
fn parse_amount(raw: &str) -> Result<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned
        .parse::<f64>()
        .with_context(|| format!("Not a decimal amount: '{raw}'"))
}
