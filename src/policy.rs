//! # Policy — Mail Eligibility Rules
//!
//! Decides whether a scraped show should get a reminder on this run. Rules
//! run in order and stop at the first failure:
//!
//! 1. Name exclusion: courses and kids' specials are not performances.
//! 2. The show starts today.
//! 3. The start hour falls in the run's half of the day. Shows starting at or
//!    after the cutoff hour belong to the night run.

use crate::show::ShowRecord;
use chrono::{NaiveDate, Timelike};
use tracing::{debug, info};

/// Hour of day splitting daytime from nighttime shows.
pub const CUTOFF_HOUR: u32 = 14;

/// Case-insensitive name fragments marking listings that are not real shows.
pub const EXCLUDED_NAME_FRAGMENTS: [&str; 2] = ["kurs", "popkorn"];

/// Which half of the day a run mails for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Daytime,
    Nighttime,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Daytime => write!(f, "daytime"),
            RunMode::Nighttime => write!(f, "nighttime"),
        }
    }
}

/// Why a show was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAShow { fragment: String },
    NotToday,
    WrongTimeOfDay { hour: u32 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotAShow { fragment } => {
                write!(f, "name contains {:?}, seems to be a non-show", fragment)
            }
            Rejection::NotToday => write!(f, "not today"),
            Rejection::WrongTimeOfDay { hour } => {
                write!(f, "starts at hour {}, outside this run's half of the day", hour)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    excluded: Vec<String>,
    cutoff_hour: u32,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        EligibilityPolicy::new(EXCLUDED_NAME_FRAGMENTS.iter().copied(), CUTOFF_HOUR)
    }
}

impl EligibilityPolicy {
    pub fn new<'a>(excluded: impl IntoIterator<Item = &'a str>, cutoff_hour: u32) -> Self {
        EligibilityPolicy {
            excluded: excluded.into_iter().map(str::to_lowercase).collect(),
            cutoff_hour,
        }
    }

    /// Apply the rules in order, returning the first one that fails.
    pub fn check(&self, show: &ShowRecord, mode: RunMode, today: NaiveDate) -> Result<(), Rejection> {
        let name = show.name.to_lowercase();
        if let Some(fragment) = self.excluded.iter().find(|f| name.contains(f.as_str())) {
            return Err(Rejection::NotAShow {
                fragment: fragment.clone(),
            });
        }

        if show.start.date() != today {
            return Err(Rejection::NotToday);
        }

        let hour = show.start.hour();
        let wrong_half = match mode {
            RunMode::Daytime => hour >= self.cutoff_hour,
            RunMode::Nighttime => hour < self.cutoff_hour,
        };
        if wrong_half {
            return Err(Rejection::WrongTimeOfDay { hour });
        }

        Ok(())
    }

    /// Boolean form of [`check`](Self::check), logging the reason on rejection.
    pub fn is_eligible(&self, show: &ShowRecord, mode: RunMode, today: NaiveDate) -> bool {
        match self.check(show, mode, today) {
            Ok(()) => true,
            Err(reason @ Rejection::WrongTimeOfDay { .. }) => {
                info!(show_id = %show.id, show_name = %show.name, %mode, %reason, "ignoring show");
                false
            }
            Err(reason) => {
                debug!(show_id = %show.id, show_name = %show.name, %mode, %reason, "ignoring show");
                false
            }
        }
    }
}
