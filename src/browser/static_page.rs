//! Page session over fetched markup.
//!
//! `StaticPage` downloads the calendar with `reqwest` and answers DOM queries
//! with `scraper`. It can also serve a saved page (`from_html`), which is how
//! debug artifacts are replayed offline.
//!
//! There is no script engine here: "evaluation" produces the same flat row
//! objects an in-page script would, computed from the parsed document.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde_json::{Value, json};
use tracing::debug;

use crate::browser::{BrowserError, CalendarPage, RowHandle};
use crate::data::selectors;
use crate::text::normalize_ws;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

enum Source {
    Remote { client: Client, url: Option<String> },
    Offline,
}

pub struct StaticPage {
    source: Source,
    html: Option<String>,
    /// Bumped on every navigation/reload; row handles from older generations are stale.
    generation: Arc<AtomicU64>,
    expanded: Option<usize>,
}

impl StaticPage {
    /// Open an HTTP-backed session.
    pub fn connect(request_timeout: Duration) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .gzip(true)
            .build()
            .map_err(|e| BrowserError::Session(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            source: Source::Remote { client, url: None },
            html: None,
            generation: Arc::new(AtomicU64::new(0)),
            expanded: None,
        })
    }

    /// Serve a saved page. Navigation and reload keep the same markup.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            source: Source::Offline,
            html: Some(html.into()),
            generation: Arc::new(AtomicU64::new(0)),
            expanded: None,
        }
    }

    fn document(&self) -> Result<&str, BrowserError> {
        self.html
            .as_deref()
            .ok_or_else(|| BrowserError::Timeout("page load".to_string()))
    }

    fn bump_generation(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.expanded = None;
    }

    async fn fetch(client: &Client, url: &str) -> Result<String, BrowserError> {
        let resp = client.get(url).send().await.map_err(|e| map_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let msg = format!("GET {url} returned {status}");
            return Err(if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                BrowserError::Protocol(msg)
            } else {
                BrowserError::Session(msg)
            });
        }

        resp.text().await.map_err(|e| map_reqwest(url, e))
    }
}

fn map_reqwest(url: &str, err: reqwest::Error) -> BrowserError {
    if err.is_timeout() {
        BrowserError::Timeout(format!("response from {url}"))
    } else {
        BrowserError::Protocol(format!("request to {url} failed: {err}"))
    }
}

fn selector(css: &str) -> Result<Selector, BrowserError> {
    Selector::parse(css).map_err(|e| BrowserError::Protocol(format!("invalid selector '{css}': {e}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

/// Icon class plus title, whichever the row carries.
fn impact_marker(icon: ElementRef<'_>) -> String {
    let class = icon.value().attr("class").unwrap_or_default();
    let title = icon.value().attr("title").unwrap_or_default();
    normalize_ws(&format!("{class} {title}"))
}

fn row_elements<'a>(doc: &'a Html, row_sel: &Selector) -> Vec<ElementRef<'a>> {
    doc.select(row_sel).collect()
}

/// Flat snapshot of one row; missing cells read as empty strings.
fn row_snapshot(row: ElementRef<'_>) -> Result<Value, BrowserError> {
    let cell = |css: &str| -> Result<String, BrowserError> {
        let sel = selector(css)?;
        Ok(row.select(&sel).next().map(element_text).unwrap_or_default())
    };

    let impact_sel = selector(selectors::IMPACT_ICON)?;
    let impact = match row.select(&impact_sel).next() {
        Some(icon) => impact_marker(icon),
        None => cell(selectors::IMPACT_CELL)?,
    };
    let detail_sel = selector(selectors::DETAIL_LINK)?;

    Ok(json!({
        "className": row.value().attr("class").unwrap_or_default(),
        "time": cell(selectors::TIME)?,
        "currency": cell(selectors::CURRENCY)?,
        "impact": impact,
        "event": cell(selectors::EVENT)?,
        "actual": cell(selectors::ACTUAL)?,
        "forecast": cell(selectors::FORECAST)?,
        "previous": cell(selectors::PREVIOUS)?,
        "hasDetail": row.select(&detail_sel).next().is_some(),
    }))
}

fn snapshot_rows(html: &str) -> Result<Vec<Value>, BrowserError> {
    let doc = Html::parse_document(html);
    let row_sel = selector(selectors::ROW)?;
    row_elements(&doc, &row_sel).into_iter().map(row_snapshot).collect()
}

fn snapshot_row(html: &str, index: usize) -> Result<Value, BrowserError> {
    let doc = Html::parse_document(html);
    let row_sel = selector(selectors::ROW)?;
    let row = doc
        .select(&row_sel)
        .nth(index)
        .ok_or_else(|| BrowserError::NotFound(format!("calendar row {index}")))?;
    row_snapshot(row)
}

fn row_markup(html: &str) -> Result<Vec<String>, BrowserError> {
    let doc = Html::parse_document(html);
    let row_sel = selector(selectors::ROW)?;
    Ok(doc.select(&row_sel).map(|el| el.html()).collect())
}

fn count_matches(html: &str, css: &str) -> Result<usize, BrowserError> {
    let doc = Html::parse_document(html);
    let sel = selector(css)?;
    Ok(doc.select(&sel).count())
}

fn row_has_detail_link(html: &str, index: usize) -> Result<(), BrowserError> {
    let doc = Html::parse_document(html);
    let row_sel = selector(selectors::ROW)?;
    let link_sel = selector(selectors::DETAIL_LINK)?;
    let row = doc
        .select(&row_sel)
        .nth(index)
        .ok_or_else(|| BrowserError::NotFound(format!("calendar row {index}")))?;
    if row.select(&link_sel).next().is_none() {
        return Err(BrowserError::NotFound(format!("detail link on row {index}")));
    }
    Ok(())
}

/// Read the spec table from the detail row that follows row `index`.
/// Saved markup never changes, so a missing table is `NotFound`.
fn read_detail_pairs(html: &str, index: usize) -> Result<Vec<(String, String)>, BrowserError> {
    let doc = Html::parse_document(html);
    let row_sel = selector(selectors::ROW)?;
    let detail_sel = selector(selectors::DETAIL_ROW)?;
    let table_sel = selector(selectors::SPEC_TABLE)?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let row = doc
        .select(&row_sel)
        .nth(index)
        .ok_or_else(|| BrowserError::Stale(format!("calendar row {index}")))?;

    let detail_row = row
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .filter(|el| detail_sel.matches(el))
        .ok_or_else(|| BrowserError::NotFound(format!("detail table for row {index}")))?;

    let table = detail_row
        .select(&table_sel)
        .next()
        .ok_or_else(|| BrowserError::NotFound(format!("detail table for row {index}")))?;

    let mut pairs = Vec::new();
    for tr in table.select(&tr_sel) {
        let cells: Vec<String> = tr.select(&td_sel).map(element_text).collect();
        if cells.len() >= 2 {
            pairs.push((cells[0].clone(), cells[1].clone()));
        }
    }
    Ok(pairs)
}

#[async_trait]
impl CalendarPage for StaticPage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.bump_generation();
        match &mut self.source {
            Source::Remote { client, url: current } => {
                *current = Some(url.to_string());
                self.html = None;
                let client = client.clone();
                debug!(url, "fetching calendar page");
                let body = Self::fetch(&client, url).await?;
                self.html = Some(body);
            }
            Source::Offline => debug!(url, "offline page, keeping saved markup"),
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), BrowserError> {
        let url = match &self.source {
            Source::Remote { url: Some(url), .. } => url.clone(),
            Source::Remote { url: None, .. } => {
                return Err(BrowserError::Session("reload before first navigation".to_string()));
            }
            Source::Offline => {
                self.bump_generation();
                return Ok(());
            }
        };
        self.navigate(&url).await
    }

    async fn wait_for_table(&mut self, _timeout: Duration) -> Result<(), BrowserError> {
        // Markup is complete once fetched; a missing table will not appear later.
        let html = self.document()?;
        if count_matches(html, selectors::TABLE)? == 0 {
            return Err(BrowserError::Timeout("calendar table".to_string()));
        }
        Ok(())
    }

    async fn rows(&mut self) -> Result<Vec<Box<dyn RowHandle>>, BrowserError> {
        let markup = row_markup(self.document()?)?;
        let generation = self.generation.load(Ordering::SeqCst);
        Ok(markup
            .into_iter()
            .map(|markup| {
                Box::new(StaticRow {
                    markup,
                    generation,
                    live: Arc::clone(&self.generation),
                }) as Box<dyn RowHandle>
            })
            .collect())
    }

    async fn evaluate_rows(&mut self) -> Result<Vec<Value>, BrowserError> {
        snapshot_rows(self.document()?)
    }

    async fn evaluate_row(&mut self, index: usize) -> Result<Value, BrowserError> {
        snapshot_row(self.document()?, index)
    }

    async fn expected_event_count(&mut self) -> Result<usize, BrowserError> {
        count_matches(self.document()?, selectors::EVENT_ROW)
    }

    async fn expand_detail(&mut self, index: usize) -> Result<(), BrowserError> {
        row_has_detail_link(self.document()?, index)?;
        self.expanded = Some(index);
        Ok(())
    }

    async fn detail_table(&mut self, _timeout: Duration) -> Result<Vec<(String, String)>, BrowserError> {
        let index = self
            .expanded
            .ok_or_else(|| BrowserError::NotFound("expanded detail row".to_string()))?;
        read_detail_pairs(self.document()?, index)
    }

    async fn close_detail(&mut self) -> Result<(), BrowserError> {
        self.expanded = None;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.document().map(str::to_string)
    }
}

/// Row handle holding the row's markup as it was when `rows()` ran.
struct StaticRow {
    markup: String,
    generation: u64,
    live: Arc<AtomicU64>,
}

impl StaticRow {
    fn check_live(&self) -> Result<(), BrowserError> {
        if self.live.load(Ordering::SeqCst) != self.generation {
            return Err(BrowserError::Stale("calendar row".to_string()));
        }
        Ok(())
    }

    fn fragment(&self) -> Html {
        Html::parse_fragment(&format!("<table>{}</table>", self.markup))
    }

    fn query<T>(&self, css: &str, f: impl FnOnce(Option<ElementRef<'_>>) -> T) -> Result<T, BrowserError> {
        self.check_live()?;
        let frag = self.fragment();
        let sel = selector(css)?;
        Ok(f(frag.select(&sel).next()))
    }
}

#[async_trait]
impl RowHandle for StaticRow {
    async fn class_name(&self) -> Result<String, BrowserError> {
        self.query("tr", |tr| {
            tr.and_then(|el| el.value().attr("class")).unwrap_or_default().to_string()
        })
    }

    async fn text(&self, css: &str) -> Result<String, BrowserError> {
        self.query(css, |el| el.map(element_text))?
            .ok_or_else(|| BrowserError::NotFound(css.to_string()))
    }

    async fn attribute(&self, css: &str, name: &str) -> Result<Option<String>, BrowserError> {
        self.query(css, |el| el.map(|el| el.value().attr(name).map(str::to_string)))?
            .ok_or_else(|| BrowserError::NotFound(css.to_string()))
    }

    async fn exists(&self, css: &str) -> Result<bool, BrowserError> {
        self.query(css, |el| el.is_some())
    }
}
