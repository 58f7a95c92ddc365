use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

use crate::ledger::KindRule;

#[derive(Parser, Debug, Clone)]
#[command(name = "kirata", version, about = "Shop ledger and udhaar book")]
pub struct Config {
    /// Address the web server binds to
    #[arg(long, env = "KIRATA_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Directory holding the handlebars templates
    #[arg(long, env = "KIRATA_TEMPLATES", default_value = "./src/front/templates")]
    pub templates: PathBuf,

    /// Directory served under /public
    #[arg(long, env = "KIRATA_PUBLIC", default_value = "./src/front/public")]
    pub public: PathBuf,

    /// CSV export loaded into the store at startup
    #[arg(long, env = "KIRATA_SEED")]
    pub seed: Option<PathBuf>,

    /// Rows per table page unless a request asks otherwise
    #[arg(long, env = "KIRATA_PAGE_SIZE", default_value_t = 10)]
    pub page_size: u32,

    /// Payment types that add to a customer's udhaar
    #[arg(
        long = "charge-kind",
        env = "KIRATA_CHARGE_KINDS",
        value_delimiter = ',',
        default_values_t = ["UDHAAR".to_string(), "CREDIT".to_string(), "CHARGE".to_string()]
    )]
    pub charge_kinds: Vec<String>,

    /// Payment types that settle udhaar
    #[arg(
        long = "payment-kind",
        env = "KIRATA_PAYMENT_KINDS",
        value_delimiter = ',',
        default_values_t = [
            "CASH".to_string(),
            "UPI".to_string(),
            "PAYMENT".to_string(),
            "CARD".to_string(),
            "BANK".to_string(),
        ]
    )]
    pub payment_kinds: Vec<String>,
}

impl Config {
    pub fn kind_rule(&self) -> KindRule {
        KindRule::new(self.charge_kinds.clone(), self.payment_kinds.clone())
    }
}
