//! CSV import of review batches
//!
//! Columns are located by header name (case-insensitive), so exports from
//! most banks load without a per-bank parser. Required: a date column, a
//! description column, and either an amount column or a debit/credit pair.
//! An id/reference column is used as the external id when present; otherwise
//! the id is a SHA-256 of the row contents.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ImportedTransaction;

const DATE_HEADERS: &[&str] = &["date", "transaction date", "trans. date", "posted date", "post date"];
const DESCRIPTION_HEADERS: &[&str] = &["description", "merchant", "payee", "name"];
const AMOUNT_HEADERS: &[&str] = &["amount", "transaction amount"];
const DEBIT_HEADERS: &[&str] = &["debit", "withdrawal"];
const CREDIT_HEADERS: &[&str] = &["credit", "deposit"];
const ID_HEADERS: &[&str] = &["id", "transaction id", "reference", "reference number"];

/// Where each field lives in a record
#[derive(Debug)]
struct Columns {
    date: usize,
    description: usize,
    amount: AmountColumns,
    id: Option<usize>,
}

#[derive(Debug)]
enum AmountColumns {
    Signed(usize),
    /// Debits become negative amounts
    DebitCredit { debit: usize, credit: usize },
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };

        let date = find(DATE_HEADERS)
            .ok_or_else(|| Error::Import("No date column in header".into()))?;
        let description = find(DESCRIPTION_HEADERS)
            .ok_or_else(|| Error::Import("No description column in header".into()))?;
        let amount = match (find(AMOUNT_HEADERS), find(DEBIT_HEADERS), find(CREDIT_HEADERS)) {
            (Some(idx), _, _) => AmountColumns::Signed(idx),
            (None, Some(debit), Some(credit)) => AmountColumns::DebitCredit { debit, credit },
            _ => {
                return Err(Error::Import(
                    "No amount column (or debit/credit pair) in header".into(),
                ))
            }
        };

        Ok(Self {
            date,
            description,
            amount,
            id: find(ID_HEADERS),
        })
    }
}

/// Parse a CSV export into transactions for a review batch
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<ImportedTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::locate(rdr.headers()?)?;
    debug!("CSV columns: {:?}", columns);

    let mut transactions = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = index + 2;

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .ok_or_else(|| Error::Import(format!("Line {}: missing {}", line, name)))
        };

        let date = parse_date(field(columns.date, "date")?)
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;
        let description = field(columns.description, "description")?.to_string();
        let amount = match columns.amount {
            AmountColumns::Signed(idx) => parse_amount(field(idx, "amount")?),
            AmountColumns::DebitCredit { debit, credit } => {
                let debit = field(debit, "debit")?;
                let credit = field(credit, "credit")?;
                match (debit.is_empty(), credit.is_empty()) {
                    (false, _) => parse_amount(debit).map(|d| -d.abs()),
                    (true, false) => parse_amount(credit).map(f64::abs),
                    (true, true) => Err(Error::Import("empty debit and credit".into())),
                }
            }
        }
        .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;

        let external_id = columns
            .id
            .and_then(|idx| record.get(idx))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| generate_hash(&date, &description, amount));

        transactions.push(ImportedTransaction {
            external_id,
            date,
            description,
            amount,
        });
    }

    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

/// Content hash used as the external id for rows without one
fn generate_hash(date: &NaiveDate, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a date string in various common formats
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%Y-%m-%d", // 2024-01-15
        "%m-%d-%Y", // 01-15-2024
        "%Y/%m/%d", // 2024/01/15
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas and parentheses
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}
