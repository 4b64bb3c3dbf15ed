//! # Orchestrator — One Mailing Run
//!
//! A run has three strictly ordered phases:
//!
//! ```text
//! scan      listing rows ─ parse ─ policy ─ ledger lookup ─▶ worklist
//! (empty worklist: stop, nothing mailed, nothing written)
//! send      for each show: contact page ─ render ─ submit ─ mark mailed
//! ```
//!
//! The whole worklist is built before the first mail goes out, and each
//! show is marked in the ledger right after its own submission, before the
//! next show is touched. Nothing is retried: the first error ends the run.
//! A failure between submit and mark leaves the show unmarked, so the next
//! run mails it again.

use crate::browser::{Browser, HttpBrowser};
use crate::config::Config;
use crate::ledger::Ledger;
use crate::policy::{EligibilityPolicy, RunMode};
use crate::show::ShowRecord;
use crate::template::Renderer;
use crate::ticketco::{Credentials, TicketCo, MAIL_SUBJECT};
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, info_span, Instrument};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub scanned: usize,
    pub worklist: usize,
    pub sent: usize,
}

pub struct Orchestrator<'a, B> {
    site: TicketCo<B>,
    ledger: &'a Ledger,
    policy: EligibilityPolicy,
    renderer: Renderer,
    mode: RunMode,
    today: NaiveDate,
}

impl<'a, B: Browser> Orchestrator<'a, B> {
    pub fn new(site: TicketCo<B>, ledger: &'a Ledger, renderer: Renderer, mode: RunMode) -> Self {
        Orchestrator {
            site,
            ledger,
            policy: EligibilityPolicy::default(),
            renderer,
            mode,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Evaluate shows against `today` instead of the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(&mut self, credentials: &Credentials) -> Result<RunSummary> {
        self.ledger.ensure_schema().await?;
        let known = self.ledger.mailed_ids().await?.len();
        info!(mode = %self.mode, today = %self.today, known, "checking mail duty");

        self.site.login(credentials).await?;

        let (scanned, worklist) = self.build_worklist().await?;
        let mut summary = RunSummary {
            scanned,
            worklist: worklist.len(),
            sent: 0,
        };
        if worklist.is_empty() {
            info!(scanned, "no shows to mail");
            return Ok(summary);
        }

        for show in &worklist {
            self.send(show)
                .instrument(info_span!("send", show_id = %show.id))
                .await?;
            summary.sent += 1;
        }

        info!(sent = summary.sent, "done with mail duty");
        Ok(summary)
    }

    /// Scan phase: every listed show through parser, policy and ledger.
    async fn build_worklist(&mut self) -> Result<(usize, Vec<ShowRecord>)> {
        let listing = self.site.scrape_listing().await?;
        let mut worklist: Vec<ShowRecord> = Vec::new();

        for listed in &listing {
            let show = listed.parse()?;
            if !self.policy.is_eligible(&show, self.mode, self.today) {
                continue;
            }
            if self.ledger.has_been_mailed(show.id).await? {
                info!(show_id = %show.id, show_name = %show.name, "already sent mail");
                continue;
            }
            if worklist.iter().any(|queued| queued.id == show.id) {
                continue;
            }
            info!(
                show_id = %show.id,
                show_name = %show.name,
                "show is today and seemingly a valid show, adding to mailing list"
            );
            worklist.push(show);
        }

        Ok((listing.len(), worklist))
    }

    /// Send phase for one show.
    async fn send(&mut self, show: &ShowRecord) -> Result<()> {
        info!(show_name = %show.name, "retrieving info needed to send mail");
        let page = self.site.open_contact_page(show.id).await?;
        let body = self
            .renderer
            .render(self.mode, page.tickets_sold, &page.show_name)?;

        info!(tickets_sold = page.tickets_sold, "building mail on website and sending");
        self.site.send_mail(MAIL_SUBJECT, &body).await?;

        self.ledger.mark_mailed(show.id).await?;
        info!("mail sent and added to database");
        Ok(())
    }
}

/// Full production run: open the ledger, mail through the live site, close.
pub async fn execute(config: &Config, mode: RunMode) -> Result<RunSummary> {
    let ledger = Ledger::open(&config.database_path).await?;
    let result = run_with_ledger(config, mode, &ledger).await;
    ledger.close().await;
    result
}

async fn run_with_ledger(config: &Config, mode: RunMode, ledger: &Ledger) -> Result<RunSummary> {
    let site = TicketCo::new(HttpBrowser::new()?, &config.base_url);
    let renderer = Renderer::new(config.templates_dir.clone());
    Orchestrator::new(site, ledger, renderer, mode)
        .run(&config.credentials)
        .await
}
