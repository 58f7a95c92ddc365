use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ledger record as delivered by the shop backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub customer: Option<String>,
    /// Upper-cased discriminator such as `UDHAAR`, `CASH` or `UPI`.
    pub payment_type: String,
    pub amount: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
    /// Set when the delivered amount could not be parsed and was replaced by zero.
    pub amount_coerced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Increases what the customer owes (udhaar).
    Charge,
    /// Decreases what the customer owes.
    Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningBalanceRow {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub kind: Option<EntryKind>,
    pub balance_after: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_charges: BigDecimal,
    pub total_payments: BigDecimal,
    pub net_outstanding: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ledger {
    pub rows: Vec<RunningBalanceRow>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerBalance {
    pub name: String,
    pub transactions: usize,
    pub last_activity: DateTime<Utc>,
    pub summary: Summary,
}
