//! # TicketCo — Admin Site Driver
//!
//! Knows the admin site's pages and selectors; everything else about the
//! browser stays behind [`Browser`].
//!
//! - Login: `/no/nb/admin` sign-in form. Landing back on a `sign_in` URL
//!   means the credentials were refused.
//! - Listing: `/no/nb/admin/events/entities/`, one `.tc-table--row` per
//!   show. The left cell holding the `#manage` link has the show name, the
//!   link (whose path carries the id) and, after a `<br>`, the date range.
//!   A row without that cell means the page changed shape and ends the run.
//! - Contact page: `/no/nb/admin/events/entities/<id>/contact_attendees`,
//!   with the show name in the breadcrumb, the tickets-sold count in `.well`
//!   and the subject/body form that mails every ticket holder.

use crate::browser::{fragment_text, Browser};
use crate::error::MailError;
use crate::show::{self, ShowId, ShowRecord};
use anyhow::Result;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://ticketco.events";
pub const MAIL_SUBJECT: &str = "Velkommen til kveldens forestilling";

const ADMIN_PATH: &str = "/no/nb/admin";
const ENTITIES_PATH: &str = "/no/nb/admin/events/entities";

const USERNAME_FIELD: &str = "#user_username";
const PASSWORD_FIELD: &str = "#user_password";
const LOGIN_BUTTON: &str = "button[type=\"submit\"]";
const SIGN_IN_MARKER: &str = "sign_in";

const SHOW_ROW: &str = ".tc-table--row";
const SHOW_CELL: &str = ".tc-table--cell__left";
const MANAGE_LINK: &str = "#manage";
/// Reported when a row has no [`SHOW_CELL`] holding a [`MANAGE_LINK`].
const MANAGED_CELL: &str = ".tc-table--cell__left:has(#manage)";

const SOLD_PANEL: &str = ".well";
const SOLD_PREFIX: &str = "Du har nå solgt ";
const SUBJECT_FIELD: &str = "#message_for_attendee_subject";
const BODY_FIELD: &str = "#message_for_attendee_body";
const SEND_BUTTON: &str = "button[type=submit]";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One row of the event listing, as scraped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedShow {
    pub date_range: String,
    pub href: String,
    pub name: String,
}

impl ListedShow {
    pub fn parse(&self) -> Result<ShowRecord, MailError> {
        show::parse(&self.date_range, &self.href, &self.name)
    }
}

/// What the contact page says about a show right before mailing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPage {
    pub show_name: String,
    pub tickets_sold: u32,
}

pub struct TicketCo<B> {
    browser: B,
    base_url: String,
}

impl<B: Browser> TicketCo<B> {
    pub fn new(browser: B, base_url: &str) -> Self {
        TicketCo {
            browser,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let url = self.url(ADMIN_PATH);
        self.browser.navigate(&url).await?;
        self.browser
            .type_into(USERNAME_FIELD, &credentials.username)
            .await?;
        self.browser
            .type_into(PASSWORD_FIELD, &credentials.password)
            .await?;
        self.browser.click(LOGIN_BUTTON).await?;

        let landed = self.browser.current_url();
        if landed.contains(SIGN_IN_MARKER) {
            return Err(MailError::LoginFailure { url: landed }.into());
        }
        info!("login done");
        Ok(())
    }

    /// Every show row on the event listing, in page order.
    pub async fn scrape_listing(&mut self) -> Result<Vec<ListedShow>> {
        let url = self.url(&format!("{}/", ENTITIES_PATH));
        info!("navigating to event overview");
        self.browser.navigate(&url).await?;

        let mut shows = Vec::new();
        for (index, row) in self.browser.list_matching(SHOW_ROW).await?.iter().enumerate() {
            let mut cell = None;
            for candidate in row.find_all(SHOW_CELL)? {
                if candidate.find(MANAGE_LINK)?.is_some() {
                    cell = Some(candidate);
                    break;
                }
            }
            let Some(cell) = cell else {
                debug!(row = index, "listing row without a manage link");
                return Err(MailError::not_found(MANAGED_CELL).into());
            };

            let html = cell.inner_html()?;
            let date_range = html
                .split("<br>")
                .nth(1)
                .map(fragment_text)
                .ok_or_else(|| MailError::format(&html, "no date line in show cell"))?;
            let link = cell.expect(MANAGE_LINK)?;
            let href = link
                .attr("href")?
                .ok_or_else(|| MailError::format(&html, "manage link has no href"))?;

            shows.push(ListedShow {
                date_range,
                href,
                name: link.text()?,
            });
        }
        info!(count = shows.len(), "event overview scraped");
        Ok(shows)
    }

    /// Open a show's contact-attendees page and read what the mail needs.
    pub async fn open_contact_page(&mut self, id: ShowId) -> Result<ContactPage> {
        let url = self.url(&format!("{}/{}/contact_attendees", ENTITIES_PATH, id));
        self.browser.navigate(&url).await?;

        let crumb = format!(".breadcrumb a[href=\"{}/{}/edit\"]", ENTITIES_PATH, id);
        let show_name = self.browser.extract_text(&crumb).await?.trim().to_string();
        if show_name.is_empty() {
            return Err(MailError::not_found(&crumb).into());
        }

        let panel = self.browser.extract_text(SOLD_PANEL).await?;
        let tickets_sold =
            parse_tickets_sold(&panel).ok_or_else(|| MailError::not_found(SOLD_PANEL))?;

        Ok(ContactPage {
            show_name,
            tickets_sold,
        })
    }

    /// Fill in and submit the contact form on the current contact page.
    pub async fn send_mail(&mut self, subject: &str, body_html: &str) -> Result<()> {
        self.browser.type_into(SUBJECT_FIELD, subject).await?;
        self.browser
            .set_rich_text(BODY_FIELD, &format!("<p>{}</p>", body_html))
            .await?;
        self.browser.click(SEND_BUTTON).await
    }
}

/// Number after "Du har nå solgt " in the sales panel text. The count must
/// be followed by more text on the same line ("... billetter").
fn parse_tickets_sold(panel: &str) -> Option<u32> {
    let (_, rest) = panel.split_once(SOLD_PREFIX)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let tail = &rest[digits.len()..];
    if !tail.starts_with(|c: char| c != '\n' && c != '\r') {
        return None;
    }
    digits.parse().ok()
}
