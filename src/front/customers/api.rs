use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    response::Response,
    Router,
};

use super::customers_table;
use crate::{
    front::{components::table, ledger::TableCtx, AppMessage, AppState},
    store::PageRequest,
};

pub fn new_router() -> Router<AppState> {
    Router::new().route("/", axum::routing::get(get))
}

#[axum::debug_handler]
async fn get(
    State(s): State<AppState>,
    Query(q): Query<table::Query>,
) -> Result<Response, AppMessage> {
    let q = q.normalize(s.page_size);

    let mut view = customers_table(&s).with_events(PageRequest::new(q.entries_per_page));
    view.apply(&q);

    let page = s.store.customer_page(s.rule.as_ref(), view.events());
    log::debug!(
        "customers page {} of {} rows for {:?}",
        page.page,
        page.total_rows,
        view.events()
    );
    view.set_total_rows(page.total_rows);

    let res =
        s.t.render("component.table.hbs", &TableCtx { data: view.render(&page.rows) })
            .map_err(|err| AppMessage::new_error_notification(anyhow!(err), &s))?;
    Ok(res)
}
