pub mod api;

use anyhow::anyhow;
use axum::{extract::State, response::Response, Router};
use handlebars::html_escape;
use serde::Serialize;

use super::{
    components::table::{Action, Column, EmptyState, Search, TableView, Value},
    ledger::{page_link, TableCtx},
    AppMessage, AppState,
};
use crate::models::CustomerBalance;

pub fn new_router() -> Router<AppState> {
    Router::new().route("/", axum::routing::get(get))
}

/// Customer directory. Rows are fetched page by page from the store, so the
/// table only renders what it is handed.
pub(crate) fn customers_table(s: &AppState) -> TableView<CustomerBalance> {
    let columns = vec![
        Column::renderer("name", "Customer", |c: &CustomerBalance| {
            format!(
                "<a href=\"{}\">{}</a>",
                html_escape(&page_link(Some(&c.name))),
                html_escape(&c.name)
            )
        })
        .sort_by(|c: &CustomerBalance| Value::from(c.name.as_str())),
        Column::accessor("transactions", "Entries", |c: &CustomerBalance| {
            Value::from(c.transactions)
        })
        .sortable(),
        Column::accessor("last_activity", "Last activity", |c: &CustomerBalance| {
            Value::from(c.last_activity)
        })
        .sortable(),
        Column::accessor("charges", "Udhaar given", |c: &CustomerBalance| {
            Value::from(&c.summary.total_charges)
        })
        .sortable(),
        Column::accessor("payments", "Paid back", |c: &CustomerBalance| {
            Value::from(&c.summary.total_payments)
        })
        .sortable(),
        Column::accessor("outstanding", "Outstanding", |c: &CustomerBalance| {
            Value::from(&c.summary.net_outstanding)
        })
        .sortable(),
    ];

    TableView::server_delegated(columns, 0)
        .entries_per_page(s.page_size)
        .searchable(Search::new("Search customers", |c: &CustomerBalance| {
            Value::from(c.name.as_str())
        }))
        .empty_state(EmptyState {
            message: "No customers found.".to_string(),
            action: Some(Action {
                label: "Import transactions".to_string(),
                link: "/import".to_string(),
            }),
        })
        .api_path("/api/customers")
}

#[axum::debug_handler]
async fn get(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let table =
        s.t.render_string(
            "component.table.hbs",
            &TableCtx {
                data: customers_table(&s).render_loading(),
            },
        )
        .map_err(|err| AppMessage::new_error(anyhow!(err), &s))?;

    #[derive(Serialize)]
    struct Ctx {
        table: String,
    }

    let res =
        s.t.render("customers.get.hbs", &Ctx { table })
            .map_err(|err| AppMessage::new_error(anyhow!(err), &s))?;
    Ok(res)
}
