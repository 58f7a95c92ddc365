use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::Response,
    Json, Router,
};
use serde::Serialize;

use super::{AppMessage, AppState};
use crate::{
    ingest::{self, Ingested, Skipped},
    store::InsertReport,
};

pub fn new_router() -> Router<AppState> {
    Router::new().route("/", axum::routing::get(get))
}

#[derive(Serialize, Debug)]
pub struct IngestSummary {
    pub added: usize,
    pub duplicates: usize,
    pub coerced: usize,
    pub skipped: Vec<Skipped>,
}

impl IngestSummary {
    fn new(report: InsertReport, coerced: usize, skipped: Vec<Skipped>) -> Self {
        Self {
            added: report.added,
            duplicates: report.duplicates,
            coerced,
            skipped,
        }
    }

    fn message(&self) -> String {
        let mut msg = format!("{} transactions imported", self.added);
        if self.duplicates > 0 {
            msg += &format!(", {} already known", self.duplicates);
        }
        if !self.skipped.is_empty() {
            msg += &format!(", {} unreadable rows skipped", self.skipped.len());
        }
        if self.coerced > 0 {
            msg += &format!(", {} amounts counted as 0", self.coerced);
        }
        msg
    }

    fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.coerced == 0
    }
}

fn store_batch(s: &AppState, ingested: Ingested) -> IngestSummary {
    let Ingested {
        transactions,
        skipped,
        coerced,
    } = ingested;
    let report = s.store.insert(transactions);
    IngestSummary::new(report, coerced, skipped)
}

#[axum::debug_handler]
async fn get(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let res =
        s.t.render("import.get.hbs", &())
            .map_err(|err| AppMessage::new_error(anyhow!(err), &s))?;
    Ok(res)
}

/// CSV upload from the import form.
#[axum::debug_handler]
pub async fn api_upload(
    State(s): State<AppState>,
    mut multipart: Multipart,
) -> Result<AppMessage, AppMessage> {
    let mut summaries = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppMessage::new_error_notification(anyhow!(err), &s))?
    {
        let file_name = field.file_name().unwrap_or("<unnamed>").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppMessage::new_error_notification(anyhow!(err), &s))?;
        log::info!("importing {} ({} bytes)", file_name, bytes.len());

        let ingested = ingest::read_csv(bytes.as_ref()).map_err(|err| {
            AppMessage::new_error_notification(anyhow!(err).context(file_name.clone()), &s)
        })?;
        summaries.push(store_batch(&s, ingested));
    }

    if summaries.is_empty() {
        return Err(AppMessage::new_warn_notification("No file was uploaded.", &s));
    }

    let message = summaries
        .iter()
        .map(IngestSummary::message)
        .collect::<Vec<_>>()
        .join("; ");
    if summaries.iter().all(IngestSummary::is_clean) {
        Ok(AppMessage::new_info_notification(message, &s))
    } else {
        Ok(AppMessage::new_warn_notification(message, &s))
    }
}

/// JSON ingest: an array of backend transaction records.
#[axum::debug_handler]
pub async fn api_transactions(
    State(s): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestSummary>, (StatusCode, String)> {
    let ingested = ingest::read_json(&body).map_err(|err| {
        log::warn!("rejected transaction batch: {}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    })?;
    Ok(Json(store_batch(&s, ingested)))
}
