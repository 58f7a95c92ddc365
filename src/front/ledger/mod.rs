pub mod api;

use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    response::Response,
    Router,
};
use handlebars::html_escape;
use serde::{Deserialize, Serialize};

use super::{
    components::table::{Action, Column, EmptyState, Filter, Search, TableComponent, TableView, Value},
    AppMessage, AppState,
};
use crate::{ledger::Classify, models::{EntryKind, RunningBalanceRow}};

#[derive(Deserialize, Default, Debug)]
pub struct LedgerQuery {
    customer: Option<String>,
}

impl LedgerQuery {
    pub fn customer(&self) -> Option<&str> {
        self.customer.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

pub fn page_link(customer: Option<&str>) -> String {
    match customer {
        Some(c) => format!(
            "/ledger?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("customer", c)
                .finish()
        ),
        None => "/ledger".to_string(),
    }
}

pub fn new_router() -> Router<AppState> {
    Router::new().route("/", axum::routing::get(get))
}

#[derive(Serialize)]
pub(crate) struct TableCtx {
    pub data: TableComponent,
}

/// Udhaar book table. Shop-wide when `customer` is `None`.
pub(crate) fn ledger_table(s: &AppState, customer: Option<&str>) -> TableView<RunningBalanceRow> {
    let rule = s.rule.clone();

    let mut columns = vec![Column::accessor("timestamp", "Date", |r: &RunningBalanceRow| {
        Value::from(r.transaction.timestamp)
    })
    .sortable()];

    if customer.is_none() {
        columns.push(
            Column::renderer("customer", "Customer", |r: &RunningBalanceRow| {
                match r.transaction.customer.as_deref() {
                    Some(c) => format!(
                        "<a href=\"{}\">{}</a>",
                        html_escape(&page_link(Some(c))),
                        html_escape(c)
                    ),
                    None => "<span class=\"muted\">walk-in</span>".to_string(),
                }
            })
            .sort_by(|r: &RunningBalanceRow| Value::from(r.transaction.customer.clone())),
        );
    }

    columns.extend([
        Column::renderer("payment_type", "Type", move |r: &RunningBalanceRow| {
            let class = match rule.classify(&r.transaction.payment_type) {
                Some(EntryKind::Charge) => "charge",
                Some(EntryKind::Payment) => "payment",
                None => "other",
            };
            format!(
                "<span class=\"kind kind-{}\">{}</span>",
                class,
                html_escape(&r.transaction.payment_type)
            )
        })
        .sort_by(|r: &RunningBalanceRow| Value::from(r.transaction.payment_type.as_str())),
        Column::accessor("amount", "Amount", |r: &RunningBalanceRow| {
            Value::from(&r.transaction.amount)
        })
        .sortable(),
        Column::accessor("balance_after", "Balance", |r: &RunningBalanceRow| {
            Value::from(&r.balance_after)
        })
        .sortable(),
        Column::renderer("note", "Note", |r: &RunningBalanceRow| {
            let mut note = html_escape(r.transaction.note.as_deref().unwrap_or_default());
            if r.transaction.amount_coerced {
                note.push_str(" <span class=\"flag\">amount unreadable, counted as 0</span>");
            }
            note
        }),
    ]);

    let search = match customer {
        Some(_) => Search::new("Search notes", |r: &RunningBalanceRow| {
            Value::from(r.transaction.note.clone())
        }),
        None => Search::new("Search customers", |r: &RunningBalanceRow| {
            Value::from(r.transaction.customer.clone())
        }),
    };

    let mut view = TableView::client_side(columns)
        .entries_per_page(s.page_size)
        .searchable(search)
        .filterable(Filter::new("Type", s.rule.kinds(), |r: &RunningBalanceRow| {
            Value::from(r.transaction.payment_type.as_str())
        }))
        .empty_state(EmptyState {
            message: "No transactions in this ledger yet.".to_string(),
            action: Some(Action {
                label: "Import transactions".to_string(),
                link: "/import".to_string(),
            }),
        })
        .api_path("/api/ledger");

    if let Some(c) = customer {
        view = view.param("customer", c);
    }
    view
}

#[axum::debug_handler]
async fn get(
    State(s): State<AppState>,
    Query(q): Query<LedgerQuery>,
) -> Result<Response, AppMessage> {
    let view = ledger_table(&s, q.customer());
    let table =
        s.t.render_string("component.table.hbs", &TableCtx { data: view.render_loading() })
            .map_err(|err| AppMessage::new_error(anyhow!(err), &s))?;

    #[derive(Serialize)]
    struct Ctx<'a> {
        customer: Option<&'a str>,
        table: String,
    }

    let res =
        s.t.render(
            "ledger.get.hbs",
            &Ctx {
                customer: q.customer(),
                table,
            },
        )
        .map_err(|err| AppMessage::new_error(anyhow!(err), &s))?;
    Ok(res)
}
