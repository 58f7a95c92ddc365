use std::{fmt, str::FromStr};

use bigdecimal::{BigDecimal, Zero};
use serde::Deserialize;

const CURRENCY_MARKERS: &[&str] = &["Rs.", "Rs", "INR", "₹"];

/// Parses amounts the way shopkeepers type them: `"₹1,200.50"`, `"Rs 40"`, `" 12 "`.
pub fn to_decimal(text: &str) -> Option<BigDecimal> {
    let mut s = text.trim();
    for marker in CURRENCY_MARKERS {
        if let Some(rest) = s.strip_prefix(marker) {
            s = rest.trim_start();
            break;
        }
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
        .collect();
    // exponents would let one record grow every later sum to millions of digits
    if cleaned.is_empty() || cleaned.contains(['e', 'E']) {
        return None;
    }

    BigDecimal::from_str(&cleaned).ok()
}

/// Money as shown on screen: always two decimals, `0.00` included.
pub fn two_places(n: &BigDecimal) -> String {
    let n = n.round(2);
    if n.is_zero() {
        return "0.00".to_string();
    }
    n.with_scale(2).to_string()
}

/// Amount as the backend sends it: sometimes a JSON number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
}

impl RawAmount {
    /// Returns the parsed amount and whether it had to be replaced by zero.
    pub fn coerce(&self, record_id: &str) -> (BigDecimal, bool) {
        let parsed = match self {
            RawAmount::Number(n) => to_decimal(&n.to_string()),
            RawAmount::Text(t) => to_decimal(t),
        };

        match parsed {
            Some(amount) => (amount, false),
            None => {
                log::warn!("record {}: amount {:?} is not a number, using 0", record_id, self.to_string());
                (BigDecimal::zero(), true)
            }
        }
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAmount::Number(n) => write!(f, "{}", n),
            RawAmount::Text(t) => f.write_str(t),
        }
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}
