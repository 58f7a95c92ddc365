//! In-process transaction store standing in for the shop backend.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use serde::Serialize;

use crate::{
    front::components::table::{
        clamp_page, total_pages, QueryNormalized, Sort, SortDirection, TableEvents,
        DEFAULT_ENTRIES_PER_PAGE,
    },
    ledger::{self, Classify},
    models::{CustomerBalance, Transaction},
};

const CUSTOMER_SORT_KEYS: &[&str] = &[
    "name",
    "transactions",
    "last_activity",
    "charges",
    "payments",
    "outstanding",
];

#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<Vec<Transaction>>>,
}

#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct InsertReport {
    pub added: usize,
    pub duplicates: usize,
}

/// What a server-delegated table asked for, collected through [`TableEvents`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub query: QueryNormalized,
}

impl PageRequest {
    pub fn new(per_page: u32) -> Self {
        Self {
            query: QueryNormalized {
                page: 1,
                entries_per_page: per_page.max(1),
                search: String::new(),
                filter: None,
                sort: None,
            },
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRIES_PER_PAGE)
    }
}

impl TableEvents for PageRequest {
    fn on_search_change(&mut self, term: &str) {
        self.query.search = term.to_string();
    }

    fn on_filter_change(&mut self, value: Option<&str>) {
        self.query.filter = value.map(str::to_string);
    }

    fn on_sort_change(&mut self, key: &str, direction: SortDirection) {
        self.query.sort = Some(Sort {
            key: key.to_string(),
            direction,
        });
    }

    fn on_page_change(&mut self, page: u32) {
        self.query.page = page;
    }
}

#[derive(Debug)]
pub struct CustomerPage {
    pub rows: Vec<CustomerBalance>,
    pub total_rows: usize,
    pub page: u32,
}

impl Store {
    /// Stores a batch listed in the order the records happened, oldest first,
    /// the way shop exports are written.
    ///
    /// The store stays sorted newest first. Records with equal timestamps are
    /// ordered by arrival, latest first, so a later record of the same day
    /// (or of a later batch) is always the newer one.
    pub fn insert(&self, txs: Vec<Transaction>) -> InsertReport {
        let mut all = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut seen: HashSet<String> = all.iter().map(|t| t.id.clone()).collect();

        let mut report = InsertReport::default();
        let mut batch = Vec::with_capacity(txs.len());
        for t in txs {
            if !seen.insert(t.id.clone()) {
                log::warn!("cannot store transaction: duplicate id {}", t.id);
                report.duplicates += 1;
                continue;
            }
            batch.push(t);
            report.added += 1;
        }

        // newest arrival in front, then a stable sort keeps arrival order on ties
        batch.reverse();
        batch.append(&mut all);
        batch.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        *all = batch;
        log::debug!("store holds {} transactions", all.len());
        report
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest-first snapshot, shop-wide or for one customer.
    pub fn transactions(&self, customer: Option<&str>) -> Vec<Transaction> {
        let all = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        all.iter()
            .filter(|t| customer.map_or(true, |c| t.customer.as_deref() == Some(c)))
            .cloned()
            .collect()
    }

    /// Per-customer totals, by name. Walk-in sales without a customer are left out.
    pub fn customers(&self, rule: &impl Classify) -> Vec<CustomerBalance> {
        let all = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        let mut by_customer: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for t in all.iter() {
            if let Some(c) = t.customer.as_deref() {
                by_customer.entry(c).or_default().push(t);
            }
        }

        by_customer
            .into_iter()
            .filter_map(|(name, txs)| {
                let last_activity = txs.iter().map(|t| t.timestamp).max()?;
                Some(CustomerBalance {
                    name: name.to_string(),
                    transactions: txs.len(),
                    last_activity,
                    summary: ledger::summarize(txs.iter().copied(), rule),
                })
            })
            .collect()
    }

    /// Searched, sorted and paged customer list, the way a REST backend would serve it.
    pub fn customer_page(&self, rule: &impl Classify, req: &PageRequest) -> CustomerPage {
        let query = &req.query;
        let mut rows = self.customers(rule);

        let term = query.search.trim().to_lowercase();
        if !term.is_empty() {
            rows.retain(|c| c.name.to_lowercase().contains(&term));
        }

        if let Some(sort) = &query.sort {
            if CUSTOMER_SORT_KEYS.contains(&sort.key.as_str()) {
                rows.sort_by(|a, b| {
                    let ord = customer_ordering(&sort.key, a, b);
                    match sort.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                });
            } else {
                log::debug!("customers cannot be sorted by '{}'", sort.key);
            }
        }

        let total_rows = rows.len();
        let window = QueryNormalized {
            page: clamp_page(query.page, total_pages(total_rows, query.entries_per_page)),
            ..query.clone()
        };
        let rows = rows
            .into_iter()
            .skip(window.offset())
            .take(window.limit())
            .collect();

        CustomerPage {
            rows,
            total_rows,
            page: window.page,
        }
    }
}

fn customer_ordering(key: &str, a: &CustomerBalance, b: &CustomerBalance) -> Ordering {
    match key {
        "name" => a.name.cmp(&b.name),
        "transactions" => a.transactions.cmp(&b.transactions),
        "last_activity" => a.last_activity.cmp(&b.last_activity),
        "charges" => a.summary.total_charges.cmp(&b.summary.total_charges),
        "payments" => a.summary.total_payments.cmp(&b.summary.total_payments),
        "outstanding" => a.summary.net_outstanding.cmp(&b.summary.net_outstanding),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::ledger::{tests::tx, KindRule};

    fn for_customer(mut t: Transaction, customer: &str) -> Transaction {
        t.customer = Some(customer.to_string());
        t
    }

    fn seeded() -> Store {
        let store = Store::default();
        store.insert(vec![
            for_customer(tx("1", "UDHAAR", "100", 1), "Ramesh"),
            for_customer(tx("2", "UDHAAR", "300", 2), "Sita"),
            for_customer(tx("3", "CASH", "40", 3), "Ramesh"),
            for_customer(tx("4", "UDHAAR", "50", 4), "Anil"),
            for_customer(tx("5", "UPI", "300", 5), "Sita"),
        ]);
        store
    }

    #[test]
    fn insert_skips_duplicates_and_keeps_newest_first() {
        let store = seeded();
        let report = store.insert(vec![tx("3", "CASH", "1", 9), tx("6", "CASH", "1", 0)]);

        assert_eq!(report, InsertReport { added: 1, duplicates: 1 });
        assert_eq!(store.len(), 6);
        let ids: Vec<String> = store.transactions(None).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["5", "4", "3", "2", "1", "6"]);
    }

    #[test]
    fn same_day_records_keep_file_order() {
        let store = Store::default();
        let input = "id;timestamp;customer;payment_type;amount;note
d1;02.03.2024;Ramesh;UDHAAR;100;
d2;02.03.2024;Ramesh;CASH;100;
";
        store.insert(crate::ingest::read_csv(input.as_bytes()).unwrap().transactions);
        let later = "id;timestamp;customer;payment_type;amount;note
d3;2024-03-02;Ramesh;UDHAAR;30;
";
        store.insert(crate::ingest::read_csv(later.as_bytes()).unwrap().transactions);

        let ledger = ledger::aggregate(&store.transactions(Some("Ramesh")), &KindRule::default());
        let rows: Vec<(&str, BigDecimal)> = ledger
            .rows
            .iter()
            .map(|r| (r.transaction.id.as_str(), r.balance_after.clone()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("d3", BigDecimal::from(30)),
                ("d2", BigDecimal::from(0)),
                ("d1", BigDecimal::from(100)),
            ]
        );
    }

    #[test]
    fn duplicates_within_one_batch() {
        let store = Store::default();
        let report = store.insert(vec![tx("1", "CASH", "1", 1), tx("1", "CASH", "2", 2)]);
        assert_eq!(report, InsertReport { added: 1, duplicates: 1 });
    }

    #[test]
    fn transactions_for_one_customer() {
        let store = seeded();
        let ids: Vec<String> = store
            .transactions(Some("Ramesh"))
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert!(store.transactions(Some("Nobody")).is_empty());
    }

    #[test]
    fn customers_are_summarized() {
        let store = seeded();
        let customers = store.customers(&KindRule::default());

        let names: Vec<&str> = customers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Anil", "Ramesh", "Sita"]);

        let ramesh = &customers[1];
        assert_eq!(ramesh.transactions, 2);
        assert_eq!(ramesh.summary.net_outstanding, BigDecimal::from(60));
        assert_eq!(ramesh.last_activity, crate::ledger::tests::at(3));
    }

    #[test]
    fn customer_page_sorts_searches_and_pages() {
        let store = seeded();
        let rule = KindRule::default();

        let mut req = PageRequest::new(2);
        req.on_sort_change("outstanding", SortDirection::Desc);
        let page = store.customer_page(&rule, &req);
        let names: Vec<&str> = page.rows.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ramesh", "Anil"]);
        assert_eq!(page.total_rows, 3);

        req.on_page_change(9);
        let page = store.customer_page(&rule, &req);
        assert_eq!(page.page, 2);
        assert_eq!(page.rows[0].name, "Sita");
        assert_eq!(page.rows[0].summary.net_outstanding, BigDecimal::from_str("0").unwrap());

        req.on_search_change("IT");
        req.on_page_change(1);
        let page = store.customer_page(&rule, &req);
        assert_eq!(page.total_rows, 1);
        assert_eq!(page.rows[0].name, "Sita");
    }
}
