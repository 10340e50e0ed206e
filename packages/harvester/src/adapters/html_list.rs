//! Selector-driven adapter for career pages that render listings as plain
//! HTML. Most roster entries are instances of this adapter with per-site
//! selectors; the harvesting pipeline itself is identical for all of them.
//!
//! Parsing happens in sync helpers so the parsed document never lives across
//! an await point.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::SourceAdapter;
use crate::model::RawPosting;
use crate::transport::Transport;

/// CSS selectors describing one site's listing markup.
///
/// `listing` selects one element per posting; the remaining selectors are
/// evaluated relative to that element. Optional selectors fall back to
/// sensible defaults when the site does not expose the field.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    pub listing: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub employment_type: Option<String>,
    pub experience: Option<String>,
    /// Selector for the apply anchor. When absent, the listing element's own
    /// `href` is used if it is an anchor, else the source URL.
    pub apply_link: Option<String>,
}

struct CompiledSelectors {
    listing: Selector,
    title: Selector,
    location: Selector,
    description: Selector,
    employment_type: Option<Selector>,
    experience: Option<Selector>,
    apply_link: Option<Selector>,
}

pub struct HtmlListAdapter {
    identifier: String,
    company: String,
    source_url: String,
    base_url: Url,
    selectors: CompiledSelectors,
}

impl HtmlListAdapter {
    pub fn new(
        identifier: impl Into<String>,
        company: impl Into<String>,
        source_url: impl Into<String>,
        selectors: SelectorSet,
    ) -> Result<Self> {
        let identifier = identifier.into();
        let source_url = source_url.into();
        let base_url = Url::parse(&source_url)
            .with_context(|| format!("adapter {identifier}: invalid source URL {source_url}"))?;

        let selectors = CompiledSelectors {
            listing: compile(&selectors.listing)?,
            title: compile(&selectors.title)?,
            location: compile(&selectors.location)?,
            description: compile(&selectors.description)?,
            employment_type: selectors.employment_type.as_deref().map(compile).transpose()?,
            experience: selectors.experience.as_deref().map(compile).transpose()?,
            apply_link: selectors.apply_link.as_deref().map(compile).transpose()?,
        };

        Ok(Self {
            identifier,
            company: company.into(),
            source_url,
            base_url,
            selectors,
        })
    }

    /// Translate a fetched listing page into raw postings.
    fn parse_listing(&self, html: &str) -> Vec<RawPosting> {
        let document = Html::parse_document(html);
        let mut postings = Vec::new();

        for row in document.select(&self.selectors.listing) {
            let Some(title) = select_text(&row, &self.selectors.title) else {
                // Header rows and ads match listing selectors on some sites.
                continue;
            };

            let location = select_text(&row, &self.selectors.location)
                .unwrap_or_else(|| "Unspecified".to_string());
            let description = select_text(&row, &self.selectors.description).unwrap_or_default();
            let employment_type = self
                .selectors
                .employment_type
                .as_ref()
                .and_then(|s| select_text(&row, s))
                .unwrap_or_else(|| "Full-time".to_string());
            let experience = self
                .selectors
                .experience
                .as_ref()
                .and_then(|s| select_text(&row, s));

            postings.push(RawPosting {
                title,
                company: self.company.clone(),
                location,
                employment_type,
                experience,
                description,
                apply_link: self.apply_link_for(&row),
            });
        }

        postings
    }

    fn apply_link_for(&self, row: &ElementRef<'_>) -> String {
        let href = match &self.selectors.apply_link {
            Some(selector) => row
                .select(selector)
                .find_map(|el| el.value().attr("href")),
            None => row.value().attr("href"),
        };

        match href {
            Some(href) => self
                .base_url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| self.source_url.clone()),
            None => self.source_url.clone(),
        }
    }
}

#[async_trait]
impl SourceAdapter for HtmlListAdapter {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn company(&self) -> &str {
        &self.company
    }

    fn source_url(&self) -> &str {
        &self.source_url
    }

    async fn harvest(&self, transport: &Transport) -> Result<Vec<RawPosting>> {
        let body = transport
            .get(&self.source_url)
            .await
            .with_context(|| format!("adapter {}: fetch failed", self.identifier))?;

        let postings = self.parse_listing(&body);
        debug!(
            adapter = %self.identifier,
            count = postings.len(),
            "parsed listing page"
        );
        Ok(postings)
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector '{selector}': {e:?}"))
}

/// Collected, whitespace-normalized text of the first match, if non-empty.
fn select_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().and_then(|el| {
        let text = el
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (!text.is_empty()).then_some(text)
    })
}
