use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;

use super::{ledger_table, LedgerQuery, TableCtx};
use crate::{
    front::{components::table, AppMessage, AppState},
    ledger::{aggregate, summarize},
    models::{Ledger, Summary},
};

pub fn new_router() -> Router<AppState> {
    Router::new().route("/", axum::routing::get(get))
}

#[derive(Serialize)]
struct SummaryCtx {
    summary: Summary,
    shown: usize,
    total: usize,
    filtered: bool,
    coerced: usize,
}

/// Running-balance table. Totals cover only the rows that survive the
/// current filter and search.
#[axum::debug_handler]
async fn get(
    State(s): State<AppState>,
    Query(l): Query<LedgerQuery>,
    Query(q): Query<table::Query>,
) -> Result<Response, AppMessage> {
    let q = q.normalize(s.page_size);

    let transactions = s.store.transactions(l.customer());
    let ledger = aggregate(&transactions, s.rule.as_ref());

    let mut view = ledger_table(&s, l.customer());
    view.apply(&q);

    let visible = view.visible(&ledger.rows);
    let summary = SummaryCtx {
        summary: summarize(visible.iter().map(|r| &r.transaction), s.rule.as_ref()),
        shown: visible.len(),
        total: ledger.rows.len(),
        filtered: visible.len() != ledger.rows.len(),
        coerced: visible.iter().filter(|r| r.transaction.amount_coerced).count(),
    };

    let mut html = s
        .t
        .render_string("ledger.summary.hbs", &summary)
        .map_err(|err| AppMessage::new_error_notification(anyhow!(err), &s))?;
    html += &s
        .t
        .render_string("component.table.hbs", &TableCtx { data: view.render(&ledger.rows) })
        .map_err(|err| AppMessage::new_error_notification(anyhow!(err), &s))?;

    Ok(Html(html).into_response())
}

/// The aggregated ledger as plain data: newest-first rows and totals.
#[axum::debug_handler]
pub async fn get_json(State(s): State<AppState>, Query(l): Query<LedgerQuery>) -> Json<Ledger> {
    let transactions = s.store.transactions(l.customer());
    Json(aggregate(&transactions, s.rule.as_ref()))
}
