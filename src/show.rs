//! # Show — Scraped Show Record Parsing
//!
//! Turns the text scraped from one row of the event listing into a
//! [`ShowRecord`]. The listing prints each show's run window in Norwegian:
//!
//! ```text
//! tirsdag, 3. september 2024, 19:00 CEST — tirsdag, 3. september 2024, 21:00 CEST
//! ```
//!
//! The halves are split on the em-dash, month names resolve through a fixed
//! twelve-entry table, and timestamps are local wall-clock times. An
//! unrecognised month or any deviation from the layout is a hard
//! [`MailError::Format`] / [`MailError::UnknownMonth`], never a skip.
//!
//! The show id is the sixth `/`-separated segment of the manage link, e.g.
//! `/no/nb/admin/events/entities/81234/edit` → `81234`.

use crate::error::MailError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Norwegian month names in calendar order.
const MONTHS: [(&str, u32); 12] = [
    ("januar", 1),
    ("februar", 2),
    ("mars", 3),
    ("april", 4),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("desember", 12),
];

const RANGE_SEPARATOR: char = '—';

/// Index of the id segment in a manage-link href.
const ID_SEGMENT: usize = 6;

/// Stable identifier of a show on the ticketing site; the ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShowId(pub i64);

impl std::fmt::Display for ShowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ShowId {
    /// Extract the id from a manage-link href.
    pub fn from_href(href: &str) -> Result<Self, MailError> {
        let segment = href
            .split('/')
            .nth(ID_SEGMENT)
            .ok_or_else(|| MailError::format(href, "href has no id segment"))?;
        segment
            .parse::<i64>()
            .map(ShowId)
            .map_err(|_| MailError::format(href, "id segment is not numeric"))
    }
}

/// One scheduled performance, as listed on the admin site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRecord {
    pub id: ShowId,
    pub name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl std::fmt::Display for ShowRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"({})", self.name, self.id)
    }
}

/// Parse one listing row into a [`ShowRecord`].
pub fn parse(date_range: &str, href: &str, name: &str) -> Result<ShowRecord, MailError> {
    let normalized = date_range.replace('\u{a0}', " ");
    let (start_text, end_text) = normalized
        .split_once(RANGE_SEPARATOR)
        .ok_or_else(|| MailError::format(date_range, "missing range separator"))?;

    let start = parse_timestamp(start_text.trim(), date_range, true)?;
    let end = parse_timestamp(end_text.trim(), date_range, false)?;
    if end < start {
        return Err(MailError::format(date_range, "show ends before it starts"));
    }

    Ok(ShowRecord {
        id: ShowId::from_href(href)?,
        name: name.trim().to_string(),
        start,
        end,
    })
}

/// Resolve a Norwegian month name (any case) to its 1-based number.
pub fn month_number(name: &str) -> Result<u32, MailError> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == lower)
        .map(|&(_, number)| number)
        .ok_or_else(|| MailError::UnknownMonth {
            name: name.to_string(),
        })
}

/// Parse `"<weekday>, <day>. <month> <year>, <HH:MM> <tz>"`.
///
/// `strict_tz` limits the zone abbreviation to 3–4 letters; the end half of
/// the listing is looser about it.
fn parse_timestamp(half: &str, whole: &str, strict_tz: bool) -> Result<NaiveDateTime, MailError> {
    let bad = |reason: &str| MailError::format(whole, reason);

    let (weekday, rest) = half.split_once(',').ok_or_else(|| bad("missing weekday"))?;
    if weekday.is_empty() || !weekday.chars().all(char::is_alphabetic) {
        return Err(bad("weekday is not a word"));
    }

    // One or two spaces follow the weekday comma.
    let rest = rest.strip_prefix(' ').ok_or_else(|| bad("missing space after weekday"))?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);

    let (date_part, time_part) = rest.split_once(", ").ok_or_else(|| bad("missing time"))?;

    let mut date_fields = date_part.split(' ');
    let day = date_fields
        .next()
        .and_then(|d| d.strip_suffix('.'))
        .filter(|d| (1..=2).contains(&d.len()))
        .and_then(|d| d.parse::<u32>().ok())
        .ok_or_else(|| bad("day must be one or two digits followed by a dot"))?;
    let month_name = date_fields.next().ok_or_else(|| bad("missing month"))?;
    let year = date_fields
        .next()
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse::<i32>().ok())
        .ok_or_else(|| bad("year must be four digits"))?;
    if date_fields.next().is_some() {
        return Err(bad("trailing text after year"));
    }

    let mut time_fields = time_part.split(' ');
    let clock = time_fields
        .next()
        .filter(|t| t.len() == 5)
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .ok_or_else(|| bad("time must be HH:MM"))?;
    let zone = time_fields.next().ok_or_else(|| bad("missing time zone"))?;
    let zone_ok = !zone.is_empty()
        && zone.chars().all(char::is_alphanumeric)
        && (!strict_tz || (3..=4).contains(&zone.chars().count()));
    if !zone_ok || time_fields.next().is_some() {
        return Err(bad("unexpected time zone"));
    }

    let month = month_number(month_name)?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| bad("no such date"))?;
    Ok(date.and_time(clock))
}
