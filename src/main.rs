mod amount;
mod config;
mod front;
mod ingest;
mod ledger;
pub mod models;
mod store;

use std::{fs::File, sync::Arc};

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use crate::{config::Config, front::template::Template, store::Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init_from_env(Env::default().default_filter_or("kirata=debug"))?;
    let config = Config::parse();

    let store = Store::default();
    if let Some(seed) = &config.seed {
        let file = File::open(seed).with_context(|| format!("opening seed {}", seed.display()))?;
        let ingested = ingest::read_csv(file)?;
        let report = store.insert(ingested.transactions);
        log::info!("seeded {} transactions from {}", report.added, seed.display());
    }
    if store.is_empty() {
        log::warn!("store is empty, import a CSV export at /import");
    }

    let state = front::AppState {
        store,
        t: Template::new(&config.templates)?,
        rule: Arc::new(config.kind_rule()),
        page_size: config.page_size,
    };

    front::start_web_server(&config, state).await
}
