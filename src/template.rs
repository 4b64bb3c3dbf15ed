//! # Template — Reminder Mail Bodies
//!
//! Three plain-text templates live in one directory:
//!
//! | Variant | File |
//! |---------|------|
//! | daytime | `day.txt` |
//! | night, 100+ tickets sold | `night-lots-sold.txt` |
//! | night, fewer sold | `night-some-sold.txt` |
//!
//! The site's mail editor takes HTML, so each non-empty line becomes a
//! `<p>` paragraph and lines are joined with no separator. Empty lines stay
//! empty. The show name replaces [`NAME_PLACEHOLDER`] and mentions of the
//! theatre domain become links.

use crate::policy::RunMode;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub const NAME_PLACEHOLDER: &str = "%forestillingsnavn%";

/// Bare domain mention in templates that gets turned into a hyperlink.
pub const LINKED_DOMAIN: &str = "detandreteatret.no";

/// Tickets sold at which a night show counts as well sold.
pub const LOTS_SOLD_THRESHOLD: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
    Day,
    NightLotsSold,
    NightSomeSold,
}

impl TemplateVariant {
    pub fn select(mode: RunMode, tickets_sold: u32) -> Self {
        match mode {
            RunMode::Daytime => TemplateVariant::Day,
            RunMode::Nighttime if tickets_sold >= LOTS_SOLD_THRESHOLD => {
                TemplateVariant::NightLotsSold
            }
            RunMode::Nighttime => TemplateVariant::NightSomeSold,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateVariant::Day => "day.txt",
            TemplateVariant::NightLotsSold => "night-lots-sold.txt",
            TemplateVariant::NightSomeSold => "night-some-sold.txt",
        }
    }
}

/// Loads templates from a directory and fills them in.
#[derive(Debug, Clone)]
pub struct Renderer {
    dir: PathBuf,
}

impl Renderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Renderer { dir: dir.into() }
    }

    /// Build the mail body for one show. Templates are read fresh every call.
    pub fn render(&self, mode: RunMode, tickets_sold: u32, show_name: &str) -> Result<String> {
        let variant = TemplateVariant::select(mode, tickets_sold);
        let path = self.dir.join(variant.file_name());
        let template = std::fs::read_to_string(&path)
            .with_context(|| format!("reading mail template {}", path.display()))?;
        Ok(render_text(&template, show_name))
    }
}

/// Fill a template's text: paragraph-wrap lines, then substitute.
pub fn render_text(template: &str, show_name: &str) -> String {
    let body: String = template
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("<p>{}</p>", line)
            }
        })
        .collect();

    let link = format!("<a href='https://{0}'>{0}</a>", LINKED_DOMAIN);
    body.replace(NAME_PLACEHOLDER, show_name)
        .replace(LINKED_DOMAIN, &link)
}
