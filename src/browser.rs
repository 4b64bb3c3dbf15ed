//! # Browser — Page Interaction Capability
//!
//! The mailing run only needs a narrow slice of a browser: load a page, read
//! text and attributes by CSS selector, fill form fields and press buttons.
//! [`Browser`] is that slice; the orchestrator and site driver depend on
//! nothing else.
//!
//! [`HttpBrowser`] implements it without a rendering engine: pages are
//! fetched with `reqwest` (cookie store on, so a login session sticks),
//! queried with `scraper`, and a click on a submit button posts the
//! enclosing `<form>` with every named control plus whatever was typed.
//!
//! ## Element handles
//!
//! [`Element`] is a detached handle: the parsed page it came from and the
//! selector path that reaches it. Each page is parsed once when it loads and
//! shared by every handle taken from it, so a handle stays valid after the
//! browser moves on and can be queried for descendants.

use crate::error::MailError;
use anyhow::{anyhow, bail, Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::rc::Rc;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("ticketmail/", env!("CARGO_PKG_VERSION"));

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("invalid selector {:?}: {}", s, e))
}

/// Capabilities the mailing run consumes from a browser.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Load `url`, resolved against the current page.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Address of the page currently loaded, after redirects.
    fn current_url(&self) -> String;

    /// Text content of the first element matching `selector`.
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Attribute `attr` of the first element matching `selector`.
    async fn extract_attribute(&self, selector: &str, attr: &str) -> Result<String>;

    /// Fill the form field matching `selector` with `text`.
    async fn type_into(&mut self, selector: &str, text: &str) -> Result<()>;

    /// Put HTML markup into the rich-text editor field matching `selector`.
    async fn set_rich_text(&mut self, selector: &str, html: &str) -> Result<()>;

    /// Click the first element matching `selector` and wait for the next page.
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Every element matching `selector`, in document order.
    async fn list_matching(&self, selector: &str) -> Result<Vec<Element>>;
}

// ── Element handles ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Element {
    page: Rc<Html>,
    path: Vec<(String, usize)>,
}

impl Element {
    /// Handle on the root of a whole document.
    pub fn from_html(html: &str) -> Self {
        Element {
            page: Rc::new(Html::parse_document(html)),
            path: Vec::new(),
        }
    }

    fn with<R>(&self, f: impl FnOnce(ElementRef<'_>) -> R) -> Result<R> {
        let mut current = self.page.root_element();
        for (sel, index) in &self.path {
            current = current
                .select(&selector(sel)?)
                .nth(*index)
                .ok_or_else(|| MailError::not_found(sel))?;
        }
        Ok(f(current))
    }

    /// All descendants matching `sel`, in document order.
    pub fn find_all(&self, sel: &str) -> Result<Vec<Element>> {
        let parsed = selector(sel)?;
        let count = self.with(|el| el.select(&parsed).count())?;
        Ok((0..count)
            .map(|index| {
                let mut path = self.path.clone();
                path.push((sel.to_string(), index));
                Element {
                    page: Rc::clone(&self.page),
                    path,
                }
            })
            .collect())
    }

    /// First descendant matching `sel`, if any.
    pub fn find(&self, sel: &str) -> Result<Option<Element>> {
        Ok(self.find_all(sel)?.into_iter().next())
    }

    /// Like [`find`](Self::find), but a miss is [`MailError::ElementNotFound`].
    pub fn expect(&self, sel: &str) -> Result<Element> {
        self.find(sel)?
            .ok_or_else(|| MailError::not_found(sel).into())
    }

    pub fn text(&self) -> Result<String> {
        self.with(|el| el.text().collect::<String>())
    }

    pub fn inner_html(&self) -> Result<String> {
        self.with(|el| el.inner_html())
    }

    pub fn attr(&self, name: &str) -> Result<Option<String>> {
        self.with(|el| el.value().attr(name).map(str::to_string))
    }
}

/// Plain text of an HTML snippet, with entities decoded and tags dropped.
pub fn fragment_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect()
}

// ── HTTP implementation ─────────────────────────────────────────

/// What a click turns into, decided from the current page alone.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClickAction {
    Submit {
        method: reqwest::Method,
        action: Url,
        fields: Vec<(String, String)>,
    },
    Follow(Url),
}

pub struct HttpBrowser {
    client: reqwest::Client,
    url: Url,
    page: Rc<Html>,
    /// Values typed into named fields since the page loaded.
    filled: Vec<(String, String)>,
}

impl HttpBrowser {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(HttpBrowser {
            client,
            url: Url::parse("about:blank")?,
            page: Rc::new(Html::new_document()),
            filled: Vec::new(),
        })
    }

    fn document(&self) -> Element {
        Element {
            page: Rc::clone(&self.page),
            path: Vec::new(),
        }
    }

    async fn load(&mut self, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.send().await?.error_for_status()?;
        self.url = response.url().clone();
        self.page = Rc::new(Html::parse_document(&response.text().await?));
        self.filled.clear();
        debug!(url = %self.url, "page loaded");
        Ok(())
    }

    fn fill(&mut self, sel: &str, value: &str) -> Result<()> {
        let field = self.document().expect(sel)?;
        let name = field
            .attr("name")?
            .ok_or_else(|| anyhow!("field {:?} has no name to submit under", sel))?;
        match self.filled.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.filled.push((name, value.to_string())),
        }
        Ok(())
    }
}

impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let target = self
            .url
            .join(url)
            .with_context(|| format!("resolving {}", url))?;
        let request = self.client.get(target);
        self.load(request).await
    }

    fn current_url(&self) -> String {
        self.url.to_string()
    }

    async fn extract_text(&self, sel: &str) -> Result<String> {
        self.document().expect(sel)?.text()
    }

    async fn extract_attribute(&self, sel: &str, attr: &str) -> Result<String> {
        self.document()
            .expect(sel)?
            .attr(attr)?
            .ok_or_else(|| anyhow!("{:?} has no {} attribute", sel, attr))
    }

    async fn type_into(&mut self, sel: &str, text: &str) -> Result<()> {
        self.fill(sel, text)
    }

    async fn set_rich_text(&mut self, sel: &str, html: &str) -> Result<()> {
        self.fill(sel, html)
    }

    async fn click(&mut self, sel: &str) -> Result<()> {
        let action = plan_click(&self.page, &self.url, sel, &self.filled)?;
        debug!(selector = sel, ?action, "click");
        let request = match action {
            ClickAction::Submit {
                method,
                action,
                fields,
            } if method == reqwest::Method::POST => self.client.post(action).form(&fields),
            ClickAction::Submit { action, fields, .. } => self.client.get(action).query(&fields),
            ClickAction::Follow(url) => self.client.get(url),
        };
        self.load(request).await
    }

    async fn list_matching(&self, sel: &str) -> Result<Vec<Element>> {
        self.document().find_all(sel)
    }
}

/// Work out what clicking `sel` on `page` does.
fn plan_click(page: &Html, base: &Url, sel: &str, filled: &[(String, String)]) -> Result<ClickAction> {
    let target = page
        .select(&selector(sel)?)
        .next()
        .ok_or_else(|| MailError::not_found(sel))?;

    let form = target
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form");

    let Some(form) = form else {
        let Some(href) = target.value().attr("href") else {
            bail!("{:?} is neither a link nor inside a form", sel);
        };
        return Ok(ClickAction::Follow(base.join(href)?));
    };

    let mut fields = form_fields(form)?;
    if let Some(name) = target.value().attr("name") {
        let value = target.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }
    for (name, value) in filled {
        match fields.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.clone(),
            None => fields.push((name.clone(), value.clone())),
        }
    }

    let action = match form.value().attr("action").filter(|a| !a.is_empty()) {
        Some(action) => base.join(action)?,
        None => base.clone(),
    };
    let method = match form.value().attr("method") {
        Some(m) if m.eq_ignore_ascii_case("post") => reqwest::Method::POST,
        _ => reqwest::Method::GET,
    };

    Ok(ClickAction::Submit {
        method,
        action,
        fields,
    })
}

/// Successful controls of a form, as a browser would submit them
/// before any submit button is added.
fn form_fields(form: ElementRef<'_>) -> Result<Vec<(String, String)>> {
    let controls = selector("input, textarea, select")?;
    let options = selector("option")?;
    let mut fields = Vec::new();

    for control in form.select(&controls) {
        let el = control.value();
        let Some(name) = el.attr("name") else { continue };
        if el.attr("disabled").is_some() {
            continue;
        }
        let value = match el.name() {
            "input" => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "image" | "reset" | "file" => continue,
                    "checkbox" | "radio" if el.attr("checked").is_none() => continue,
                    "checkbox" | "radio" => el.attr("value").unwrap_or("on").to_string(),
                    _ => el.attr("value").unwrap_or_default().to_string(),
                }
            }
            "textarea" => control.text().collect(),
            _ => {
                let chosen = control
                    .select(&options)
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| control.select(&options).next());
                match chosen {
                    Some(o) => o
                        .value()
                        .attr("value")
                        .map(str::to_string)
                        .unwrap_or_else(|| o.text().collect::<String>().trim().to_string()),
                    None => continue,
                }
            }
        };
        fields.push((name.to_string(), value));
    }
    Ok(fields)
}
