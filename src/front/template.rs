use std::{fs, path::Path, str::FromStr, sync::Arc};

use anyhow::Context;
use axum::response::{Html, IntoResponse, Response};
use bigdecimal::BigDecimal;
use handlebars::{handlebars_helper, RenderError};
use serde::Serialize;

use crate::amount::two_places;

#[derive(Clone)]
pub struct Template {
    r: Arc<handlebars::Handlebars<'static>>,
}

/// Two-decimal rendering of an amount; anything unparseable shows as `0.00`.
pub fn format_amount(text: &str) -> String {
    let amount = BigDecimal::from_str(text.trim()).unwrap_or_default();
    two_places(&amount)
}

impl Template {
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut handlebars = handlebars::Handlebars::new();
        for entity in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
            let entity = entity?;
            let name = entity.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".hbs") {
                continue;
            }
            handlebars
                .register_template_file(&name, entity.path())
                .with_context(|| format!("loading template {}", name))?;
            log::debug!("registered template {}", name);
        }

        handlebars_helper!(nor_amt: |i: String| format_amount(&i));
        handlebars.register_helper("nor_amt", Box::new(nor_amt));

        Ok(Self {
            r: Arc::new(handlebars),
        })
    }

    pub fn render_string<T>(&self, name: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize,
    {
        log::trace!("render '{}': {:?}", name, serde_json::to_value(data).ok());
        self.r.render(name, data)
    }

    pub fn render<T>(&self, name: &str, data: &T) -> Result<Response, RenderError>
    where
        T: Serialize,
    {
        self.render_string(name, data)
            .map(|html| Html(html).into_response())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::*;

    pub(crate) fn templates() -> Template {
        let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        dir.push("src/front/templates");
        Template::new(dir).unwrap()
    }

    #[test]
    fn amounts_have_two_decimals() {
        assert_eq!(format_amount("80"), "80.00");
        assert_eq!(format_amount("120.5"), "120.50");
        assert_eq!(format_amount("oops"), "0.00");
        assert_eq!(format_amount("0"), "0.00");
        assert_eq!(format_amount("-0.001"), "0.00");
    }

    #[test]
    fn helper_is_registered() {
        #[derive(Serialize)]
        struct Ctx {
            summary: crate::models::Summary,
        }

        let html = templates()
            .render_string(
                "ledger.summary.hbs",
                &Ctx {
                    summary: crate::models::Summary {
                        total_charges: BigDecimal::from(120),
                        total_payments: BigDecimal::from(40),
                        net_outstanding: BigDecimal::from(80),
                    },
                },
            )
            .unwrap();

        assert!(html.contains("120.00"));
        assert!(html.contains("80.00"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(Template::new("/definitely/not/here").is_err());
    }
}
