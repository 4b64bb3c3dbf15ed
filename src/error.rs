//! Domain errors for a mailing run.
//!
//! Every variant is fatal: the run stops at the first error and the process
//! exits non-zero. Errors travel as `anyhow::Error`; callers that need the
//! kind recover it with `downcast_ref::<MailError>()`.

/// Errors raised by the parser, the ledger, the site driver and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// Scraped date-range or id text does not match the expected layout.
    Format { input: String, reason: String },
    /// Month name is not one of the twelve Norwegian month names.
    UnknownMonth { name: String },
    /// The site bounced the login back to its sign-in page.
    LoginFailure { url: String },
    /// A show id was inserted into the ledger twice.
    ConstraintViolation { show_id: i64 },
    /// A selector matched nothing on the current page.
    ElementNotFound { selector: String },
    /// A required environment variable is unset or empty.
    MissingConfig { var: &'static str },
}

impl MailError {
    pub(crate) fn format(input: &str, reason: impl Into<String>) -> Self {
        MailError::Format {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(selector: &str) -> Self {
        MailError::ElementNotFound {
            selector: selector.to_string(),
        }
    }
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::Format { input, reason } => {
                write!(f, "invalid date format ({}) on {:?}", reason, input)
            }
            MailError::UnknownMonth { name } => write!(f, "unknown month name {:?}", name),
            MailError::LoginFailure { url } => write!(f, "login failed, still at {}", url),
            MailError::ConstraintViolation { show_id } => {
                write!(f, "show {} is already recorded as mailed", show_id)
            }
            MailError::ElementNotFound { selector } => {
                write!(f, "no element matches selector {:?}", selector)
            }
            MailError::MissingConfig { var } => {
                write!(f, "{} is required (set it in the environment or .env)", var)
            }
        }
    }
}

impl std::error::Error for MailError {}
