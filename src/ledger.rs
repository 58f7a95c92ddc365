//! Running balances and totals over a customer's (or the whole shop's) ledger.
//!
//! The backend delivers transactions newest-first. Balances have to be
//! accumulated oldest-first, so rows are put in chronological order, walked
//! once, and handed back newest-first for display.

use bigdecimal::{BigDecimal, Zero};

use crate::models::{EntryKind, Ledger, RunningBalanceRow, Summary, Transaction};

pub trait Classify {
    /// Maps a payment type such as `UDHAAR` or `UPI` to its ledger effect.
    /// `None` means the transaction does not move the balance.
    fn classify(&self, payment_type: &str) -> Option<EntryKind>;
}

impl<F> Classify for F
where
    F: Fn(&str) -> Option<EntryKind>,
{
    fn classify(&self, payment_type: &str) -> Option<EntryKind> {
        self(payment_type)
    }
}

#[derive(Debug, Clone)]
pub struct KindRule {
    charge: Vec<String>,
    payment: Vec<String>,
}

impl KindRule {
    pub fn new(charge: Vec<String>, payment: Vec<String>) -> Self {
        let normalize = |v: Vec<String>| -> Vec<String> {
            v.into_iter()
                .map(|k| k.trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            charge: normalize(charge),
            payment: normalize(payment),
        }
    }

    /// Every known payment type, charges first.
    pub fn kinds(&self) -> Vec<String> {
        self.charge.iter().chain(self.payment.iter()).cloned().collect()
    }
}

impl Default for KindRule {
    fn default() -> Self {
        Self::new(
            vec!["UDHAAR".into(), "CREDIT".into(), "CHARGE".into()],
            vec![
                "CASH".into(),
                "UPI".into(),
                "PAYMENT".into(),
                "CARD".into(),
                "BANK".into(),
            ],
        )
    }
}

impl Classify for KindRule {
    fn classify(&self, payment_type: &str) -> Option<EntryKind> {
        let t = payment_type.trim();
        if self.charge.iter().any(|k| k.eq_ignore_ascii_case(t)) {
            Some(EntryKind::Charge)
        } else if self.payment.iter().any(|k| k.eq_ignore_ascii_case(t)) {
            Some(EntryKind::Payment)
        } else {
            None
        }
    }
}

/// Oldest-first view of a newest-first list.
///
/// The input is reversed and then stable-sorted by timestamp, so a correctly
/// ordered list comes out exactly reversed and a misordered one is repaired.
pub fn chronological(txs: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = txs.iter().rev().collect();
    if ordered.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
        log::debug!("ledger of {} rows was not delivered newest-first, reordering", txs.len());
        ordered.sort_by_key(|t| t.timestamp);
    }
    ordered
}

pub fn running_balances(txs: &[Transaction], rule: &impl Classify) -> Vec<RunningBalanceRow> {
    let mut balance = BigDecimal::zero();
    let mut rows: Vec<RunningBalanceRow> = chronological(txs)
        .into_iter()
        .map(|t| {
            let kind = rule.classify(&t.payment_type);
            match kind {
                Some(EntryKind::Charge) => balance += &t.amount,
                Some(EntryKind::Payment) => balance -= &t.amount,
                None => {}
            }
            RunningBalanceRow {
                transaction: t.clone(),
                kind,
                balance_after: balance.clone(),
            }
        })
        .collect();

    rows.reverse();
    rows
}

pub fn summarize<'a, I>(txs: I, rule: &impl Classify) -> Summary
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut summary = Summary::default();
    for t in txs {
        match rule.classify(&t.payment_type) {
            Some(EntryKind::Charge) => summary.total_charges += &t.amount,
            Some(EntryKind::Payment) => summary.total_payments += &t.amount,
            None => {}
        }
    }
    summary.net_outstanding = &summary.total_charges - &summary.total_payments;
    summary
}

pub fn aggregate(txs: &[Transaction], rule: &impl Classify) -> Ledger {
    Ledger {
        rows: running_balances(txs, rule),
        summary: summarize(txs, rule),
    }
}
