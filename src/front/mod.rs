pub mod components;
pub mod customers;
pub mod import;
pub mod ledger;
pub mod template;

use std::{path::Path, sync::Arc};

use anyhow::anyhow;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response, Result},
    routing::{get, post},
    Router,
};
use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::{config::Config, ledger::KindRule, models::Summary, store::Store};

const TOP_OUTSTANDING: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub t: template::Template,
    pub rule: Arc<KindRule>,
    pub page_size: u32,
}

pub struct AppMessage(Response);

#[derive(Serialize, Default)]
struct Notification {
    info: Option<String>,
    warn: Option<String>,
    error: Option<String>,
}

impl AppMessage {
    pub fn new_info_notification(msg: impl AsRef<str>, s: &AppState) -> AppMessage {
        let ctx = Notification {
            info: Some(msg.as_ref().to_string()),
            ..Default::default()
        };
        Self::rendered(s, "base.notification.hbs", &ctx, StatusCode::OK)
    }

    pub fn new_warn_notification(msg: impl AsRef<str>, s: &AppState) -> AppMessage {
        let ctx = Notification {
            warn: Some(msg.as_ref().to_string()),
            ..Default::default()
        };
        Self::rendered(s, "base.notification.hbs", &ctx, StatusCode::OK)
    }

    pub fn new_error_notification(msg: anyhow::Error, s: &AppState) -> AppMessage {
        log::error!("{:#}", msg);
        let ctx = Notification {
            error: Some(format!("{:#}", msg)),
            ..Default::default()
        };
        Self::rendered(s, "base.notification.hbs", &ctx, StatusCode::OK)
    }

    pub fn new_error(msg: anyhow::Error, s: &AppState) -> AppMessage {
        log::error!("{:#}", msg);
        let ctx = Notification {
            error: Some(format!("{:#}", msg)),
            ..Default::default()
        };
        Self::rendered(s, "error.get.hbs", &ctx, StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn rendered(s: &AppState, name: &str, ctx: &Notification, status: StatusCode) -> AppMessage {
        match s.t.render(name, ctx) {
            Ok(mut res) => {
                *res.status_mut() = status;
                AppMessage(res)
            }
            Err(err) => {
                log::error!("cannot render '{}': {}", name, err);
                AppMessage(
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Failed to render template. Error: {err}"),
                    )
                        .into_response(),
                )
            }
        }
    }
}

impl IntoResponse for AppMessage {
    fn into_response(self) -> Response {
        self.0
    }
}

pub fn new_router(state: AppState, public: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .nest("/ledger", ledger::new_router())
        .nest("/api/ledger", ledger::api::new_router())
        .route("/api/ledger.json", get(ledger::api::get_json))
        .nest("/customers", customers::new_router())
        .nest("/api/customers", customers::api::new_router())
        .nest("/import", import::new_router())
        .route("/api/upload", post(import::api_upload))
        .route("/api/transactions", post(import::api_transactions))
        .nest_service("/public", ServeDir::new(public))
        .with_state(state)
}

pub async fn start_web_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let app = new_router(state, &config.public);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    log::info!("open website at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct TopCustomer {
    name: String,
    outstanding: BigDecimal,
    last_activity: String,
    link: String,
}

#[axum::debug_handler]
async fn index(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let transactions = s.store.transactions(None);
    let summary = crate::ledger::summarize(&transactions, s.rule.as_ref());

    let mut customers = s.store.customers(s.rule.as_ref());
    let customer_count = customers.len();
    customers.retain(|c| c.summary.net_outstanding > BigDecimal::zero());
    customers.sort_by(|a, b| b.summary.net_outstanding.cmp(&a.summary.net_outstanding));
    customers.truncate(TOP_OUTSTANDING);

    #[derive(Serialize)]
    struct Ctx {
        summary: Summary,
        transaction_count: usize,
        customer_count: usize,
        top: Vec<TopCustomer>,
    }

    let ctx = Ctx {
        summary,
        transaction_count: transactions.len(),
        customer_count,
        top: customers
            .into_iter()
            .map(|c| TopCustomer {
                link: ledger::page_link(Some(&c.name)),
                outstanding: c.summary.net_outstanding,
                last_activity: c.last_activity.format("%d %b %Y").to_string(),
                name: c.name,
            })
            .collect(),
    };

    let res =
        s.t.render("index.hbs", &ctx)
            .map_err(|err| AppMessage::new_error(anyhow!(err), &s))?;
    Ok(res)
}
