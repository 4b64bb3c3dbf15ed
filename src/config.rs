//! Run configuration from the environment (after `.env` is loaded).
//!
//! | Variable | Default |
//! |----------|---------|
//! | `USERNAME` | required |
//! | `PASSWORD` | required |
//! | `TICKETMAIL_DATABASE` | `database.db` |
//! | `TICKETMAIL_TEMPLATES` | `mail-ticketbuyers/templates` |
//! | `TICKETCO_BASE_URL` | `https://ticketco.events` |

use crate::error::MailError;
use crate::ticketco::{Credentials, DEFAULT_BASE_URL};
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "database.db";
pub const DEFAULT_TEMPLATES: &str = "mail-ticketbuyers/templates";

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub database_path: PathBuf,
    pub templates_dir: PathBuf,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: &str| lookup(var).filter(|v| !v.is_empty());
        let required = |var: &'static str| get(var).ok_or(MailError::MissingConfig { var });

        Ok(Config {
            credentials: Credentials {
                username: required("USERNAME")?,
                password: required("PASSWORD")?,
            },
            database_path: get("TICKETMAIL_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
                .into(),
            templates_dir: get("TICKETMAIL_TEMPLATES")
                .unwrap_or_else(|| DEFAULT_TEMPLATES.to_string())
                .into(),
            base_url: get("TICKETCO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}
