//! Turns backend records (JSON or `;`-separated CSV exports) into [`Transaction`]s.
//!
//! A bad record never sinks the batch: unreadable amounts become zero and
//! unreadable rows are skipped and reported.

use std::io;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{amount::RawAmount, models::Transaction};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "customerName")]
    pub customer: Option<String>,
    #[serde(alias = "kind", alias = "paymentType")]
    pub payment_type: String,
    pub amount: RawAmount,
    #[serde(alias = "createdAt", alias = "created_at")]
    pub timestamp: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Skipped {
    pub record: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<Skipped>,
    pub coerced: usize,
}

impl Ingested {
    fn skip(&mut self, record: impl Into<String>, reason: impl Into<String>) {
        let skipped = Skipped {
            record: record.into(),
            reason: reason.into(),
        };
        log::warn!("skipping record {}: {}", skipped.record, skipped.reason);
        self.skipped.push(skipped);
    }

    fn push(&mut self, raw: RawTransaction) {
        let id = raw.id.trim();
        if id.is_empty() {
            self.skip("<no id>", "missing id");
            return;
        }

        let Some(timestamp) = parse_timestamp(&raw.timestamp) else {
            self.skip(id, format!("unreadable timestamp {:?}", raw.timestamp));
            return;
        };

        let (amount, amount_coerced) = raw.amount.coerce(id);
        if amount_coerced {
            self.coerced += 1;
        }

        self.transactions.push(Transaction {
            id: id.to_string(),
            customer: non_blank(raw.customer),
            payment_type: raw.payment_type.trim().to_uppercase(),
            amount,
            timestamp,
            note: non_blank(raw.note),
            amount_coerced,
        });
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Accepts RFC 3339 and the naive forms shop exports use. Naive values are UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    id: String,
    timestamp: String,
    #[serde(default)]
    customer: Option<String>,
    payment_type: String,
    amount: String,
    #[serde(default)]
    note: Option<String>,
}

/// Reads `id;timestamp;customer;payment_type;amount;note` rows.
pub fn read_csv(s: impl io::Read) -> Result<Ingested, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(s);

    let mut ingested = Ingested::default();
    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                ingested.skip(format!("line {}", line + 2), err.to_string());
                continue;
            }
        };

        ingested.push(RawTransaction {
            id: record.id,
            customer: record.customer,
            payment_type: record.payment_type,
            amount: RawAmount::from(record.amount.as_str()),
            timestamp: record.timestamp,
            note: record.note,
        });
    }

    log::info!(
        "read {} transactions from csv ({} skipped, {} amounts coerced)",
        ingested.transactions.len(),
        ingested.skipped.len(),
        ingested.coerced
    );
    Ok(ingested)
}

/// Reads a JSON array of backend records. Records that do not even have the
/// expected shape are skipped one by one.
pub fn read_json(bytes: &[u8]) -> Result<Ingested, IngestError> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;

    let mut ingested = Ingested::default();
    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawTransaction>(value) {
            Ok(raw) => ingested.push(raw),
            Err(err) => ingested.skip(format!("#{}", idx), err.to_string()),
        }
    }
    Ok(ingested)
}
