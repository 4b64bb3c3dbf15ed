//! Reminder mails for today's shows, sent through the ticketing admin site's
//! own contact form, at most once per show.

pub mod browser;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod policy;
pub mod show;
pub mod template;
pub mod ticketco;

pub use error::MailError;
pub use policy::RunMode;
