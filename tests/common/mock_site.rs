//! # Mock Site — Simulated Ticketing Admin Site for Tests
//!
//! An in-process HTTP server with the handful of admin pages a mailing run
//! touches, so the HTTP browser, site driver and orchestrator can be tested
//! end to end without the real site.
//!
//! ## Supported Endpoints
//!
//! | Method | Path                                                  | Purpose                    |
//! |--------|-------------------------------------------------------|----------------------------|
//! | GET    | `/no/nb/admin`                                        | Sign-in form               |
//! | GET    | `/no/nb/users/sign_in`                                | Sign-in form (after reject)|
//! | POST   | `/no/nb/users/sign_in`                                | Check credentials          |
//! | GET    | `/no/nb/admin/dashboard`                              | Landing page after login   |
//! | GET    | `/no/nb/admin/events/entities/`                       | Event listing              |
//! | GET    | `/no/nb/admin/events/entities/{id}/contact_attendees` | Contact form               |
//! | POST   | `/no/nb/admin/events/entities/{id}/contact_attendees` | Send mail to ticket holders|
//!
//! Admin pages require the `session=ok` cookie set by a successful login;
//! without it they redirect to the sign-in form, like the real site.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use chrono::{Datelike, NaiveDateTime, Weekday};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const USERNAME: &str = "billettkontoret";
pub const PASSWORD: &str = "hemmelig";
const CSRF_TOKEN: &str = "mock-csrf-token";
const SESSION_COOKIE: &str = "session=ok";

// ── Configuration Types ─────────────────────────────────────────────

/// One show as the mock lists it.
#[derive(Debug, Clone)]
pub struct MockShow {
    pub id: i64,
    pub name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub tickets_sold: u32,
    /// Overrides the generated date-range line when set.
    pub raw_range: Option<String>,
    /// Renders the row without its `#manage` link, as after a layout change.
    pub broken_row: bool,
}

impl MockShow {
    pub fn new(id: i64, name: &str, start: NaiveDateTime, tickets_sold: u32) -> Self {
        MockShow {
            id,
            name: name.to_string(),
            start,
            end: start + chrono::Duration::hours(2),
            tickets_sold,
            raw_range: None,
            broken_row: false,
        }
    }

    pub fn with_raw_range(mut self, raw: &str) -> Self {
        self.raw_range = Some(raw.to_string());
        self
    }

    pub fn with_broken_row(mut self) -> Self {
        self.broken_row = true;
        self
    }

    fn range_line(&self) -> String {
        self.raw_range
            .clone()
            .unwrap_or_else(|| format!("{} — {}", norwegian(self.start), norwegian(self.end)))
    }
}

/// `"tirsdag, 3. september 2024, 19:00 CEST"`
pub fn norwegian(at: NaiveDateTime) -> String {
    const MONTHS: [&str; 12] = [
        "januar", "februar", "mars", "april", "mai", "juni", "juli", "august", "september",
        "oktober", "november", "desember",
    ];
    let weekday = match at.weekday() {
        Weekday::Mon => "mandag",
        Weekday::Tue => "tirsdag",
        Weekday::Wed => "onsdag",
        Weekday::Thu => "torsdag",
        Weekday::Fri => "fredag",
        Weekday::Sat => "lørdag",
        Weekday::Sun => "søndag",
    };
    format!(
        "{}, {}. {} {}, {} CEST",
        weekday,
        at.day(),
        MONTHS[at.month0() as usize],
        at.year(),
        at.format("%H:%M")
    )
}

/// A mail the mock received through a contact form.
#[derive(Debug, Clone)]
pub struct RecordedMail {
    pub show_id: i64,
    pub subject: String,
    pub body: String,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MockBehavior {
    Normal,
    Error(u16),
}

// ── Shared Mock State ───────────────────────────────────────────────

#[derive(Debug)]
struct MockState {
    shows: Vec<MockShow>,
    send_behavior: MockBehavior,
    login_attempts: usize,
    mails: Vec<RecordedMail>,
}

type SharedState = Arc<Mutex<MockState>>;

// ── MockSite ────────────────────────────────────────────────────────

pub struct MockSite {
    base_url: String,
    _abort_handle: tokio::task::AbortHandle,
    state: SharedState,
}

impl MockSite {
    pub fn builder() -> MockSiteBuilder {
        MockSiteBuilder {
            state: MockState {
                shows: Vec::new(),
                send_behavior: MockBehavior::Normal,
                login_attempts: 0,
                mails: Vec::new(),
            },
        }
    }

    /// Base URL of the running server, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn mails(&self) -> Vec<RecordedMail> {
        self.state.lock().unwrap().mails.clone()
    }

    pub fn login_attempts(&self) -> usize {
        self.state.lock().unwrap().login_attempts
    }

    pub fn set_send_behavior(&self, behavior: MockBehavior) {
        self.state.lock().unwrap().send_behavior = behavior;
    }
}

pub struct MockSiteBuilder {
    state: MockState,
}

impl MockSiteBuilder {
    pub fn with_show(mut self, show: MockShow) -> Self {
        self.state.shows.push(show);
        self
    }

    pub fn with_send_error(mut self, status: u16) -> Self {
        self.state.send_behavior = MockBehavior::Error(status);
        self
    }

    pub async fn start(self) -> MockSite {
        let shared_state: SharedState = Arc::new(Mutex::new(self.state));

        let app = Router::new()
            .route("/no/nb/admin", get(handle_sign_in_form))
            .route(
                "/no/nb/users/sign_in",
                get(handle_sign_in_form).post(handle_sign_in),
            )
            .route("/no/nb/admin/dashboard", get(handle_dashboard))
            .route("/no/nb/admin/events/entities/", get(handle_listing))
            .route(
                "/no/nb/admin/events/entities/{id}/contact_attendees",
                get(handle_contact_page).post(handle_contact_send),
            )
            .with_state(Arc::clone(&shared_state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock site to random port");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Failed to get mock site local address");
        let base_url = format!("http://127.0.0.1:{}", addr.port());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock site server failed");
        });

        MockSite {
            base_url,
            _abort_handle: handle.abort_handle(),
            state: shared_state,
        }
    }
}

// ── Route Handlers ──────────────────────────────────────────────────

fn signed_in(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|c| c.trim() == SESSION_COOKIE))
}

fn page(body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>TicketCo</title></head><body>{}</body></html>",
        body
    ))
}

async fn handle_sign_in_form() -> Html<String> {
    page(&format!(
        r#"<form action="/no/nb/users/sign_in" method="post">
             <input type="hidden" name="authenticity_token" value="{}">
             <input id="user_username" name="user[username]" type="text">
             <input id="user_password" name="user[password]" type="password">
             <button type="submit">Logg inn</button>
           </form>"#,
        CSRF_TOKEN
    ))
}

async fn handle_sign_in(
    State(state): State<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.lock().unwrap().login_attempts += 1;

    let ok = form.get("user[username]").map(String::as_str) == Some(USERNAME)
        && form.get("user[password]").map(String::as_str) == Some(PASSWORD)
        && form.get("authenticity_token").map(String::as_str) == Some(CSRF_TOKEN);
    if !ok {
        return Redirect::to("/no/nb/users/sign_in").into_response();
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE)),
            (header::LOCATION, "/no/nb/admin/dashboard".to_string()),
        ],
    )
        .into_response()
}

async fn handle_dashboard(headers: HeaderMap) -> Response {
    if !signed_in(&headers) {
        return Redirect::to("/no/nb/users/sign_in").into_response();
    }
    page("<h1>Velkommen tilbake</h1>").into_response()
}

async fn handle_listing(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if !signed_in(&headers) {
        return Redirect::to("/no/nb/users/sign_in").into_response();
    }

    let shows = state.lock().unwrap().shows.clone();
    let mut rows = String::from(
        r#"<div class="tc-table--header">
             <div class="tc-table--cell tc-table--cell__left">Arrangement</div>
             <div class="tc-table--cell">Solgt</div>
           </div>"#,
    );
    for show in &shows {
        let link_id = if show.broken_row { "edit" } else { "manage" };
        rows.push_str(&format!(
            r#"<div class="tc-table--row">
                 <div class="tc-table--cell tc-table--cell__left"><span class="status">Publisert</span></div>
                 <div class="tc-table--cell tc-table--cell__left"><a id="{link_id}" href="/no/nb/admin/events/entities/{id}/edit">{name}</a><br>{range}<br><small>Hovedscenen</small></div>
                 <div class="tc-table--cell">{sold}</div>
               </div>"#,
            id = show.id,
            name = show.name,
            range = show.range_line(),
            sold = show.tickets_sold,
        ));
    }
    page(&format!(r#"<div class="tc-table">{}</div>"#, rows)).into_response()
}

async fn handle_contact_page(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if !signed_in(&headers) {
        return Redirect::to("/no/nb/users/sign_in").into_response();
    }
    let show = state
        .lock()
        .unwrap()
        .shows
        .iter()
        .find(|s| s.id == id)
        .cloned();
    let Some(show) = show else {
        return StatusCode::NOT_FOUND.into_response();
    };

    page(&format!(
        r#"<ol class="breadcrumb">
             <li><a href="/no/nb/admin/events/entities">Arrangementer</a></li>
             <li><a href="/no/nb/admin/events/entities/{id}/edit">{name}</a></li>
             <li>Kontakt deltakere</li>
           </ol>
           <div class="well">Du har nå solgt {sold} billetter til dette arrangementet.</div>
           <form action="/no/nb/admin/events/entities/{id}/contact_attendees" method="post">
             <input type="hidden" name="authenticity_token" value="{token}">
             <input id="message_for_attendee_subject" name="message_for_attendee[subject]" type="text">
             <textarea id="message_for_attendee_body" name="message_for_attendee[body]"></textarea>
             <button type="submit">Send</button>
           </form>"#,
        id = show.id,
        name = show.name,
        sold = show.tickets_sold,
        token = CSRF_TOKEN,
    ))
    .into_response()
}

async fn handle_contact_send(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if !signed_in(&headers) {
        return Redirect::to("/no/nb/users/sign_in").into_response();
    }

    let behavior = state.lock().unwrap().send_behavior.clone();
    if let MockBehavior::Error(code) = behavior {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "mock send failure").into_response();
    }

    state.lock().unwrap().mails.push(RecordedMail {
        show_id: id,
        subject: form
            .get("message_for_attendee[subject]")
            .cloned()
            .unwrap_or_default(),
        body: form
            .get("message_for_attendee[body]")
            .cloned()
            .unwrap_or_default(),
        csrf_token: form.get("authenticity_token").cloned(),
    });

    Redirect::to(&format!(
        "/no/nb/admin/events/entities/{}/contact_attendees",
        id
    ))
    .into_response()
}
