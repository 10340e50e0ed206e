//! Source adapters and the static roster registry.
//!
//! One adapter per external career page. Adapters are stateless translators:
//! they fetch the source's current listing page(s) through the shared
//! [`Transport`](crate::transport::Transport) and return zero or more raw
//! postings. An empty result is a perfectly valid harvest — adapters signal
//! failure only for genuine I/O or parse problems, and the orchestrator
//! records such a failure against that adapter alone.
//!
//! The roster is an explicit registry built at startup (no runtime
//! discovery): identifier -> constructed instance, in a fixed order.

mod html_list;
mod json_api;
mod roster;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use html_list::{HtmlListAdapter, SelectorSet};
pub use json_api::JsonApiAdapter;
pub use roster::default_roster;

use crate::model::{AdapterInfo, RawPosting};
use crate::transport::Transport;

/// Contract every source adapter implements.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier used for scoping triggers and run-log attribution.
    fn identifier(&self) -> &str;

    /// Company name stamped on every posting from this source.
    fn company(&self) -> &str;

    /// The listing page this adapter reads.
    fn source_url(&self) -> &str;

    /// Fetch and translate the source's current listings.
    ///
    /// Returns `Ok(vec![])` when the page has no openings; errors are
    /// reserved for I/O and parse failures.
    async fn harvest(&self, transport: &Transport) -> Result<Vec<RawPosting>>;
}

/// Ordered, immutable adapter roster.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Add an adapter to the end of the roster.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    /// Look up one adapter by identifier.
    pub fn get(&self, identifier: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.identifier() == identifier)
            .cloned()
    }

    /// The full roster in registration order.
    pub fn all(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn infos(&self) -> Vec<AdapterInfo> {
        self.adapters
            .iter()
            .map(|a| AdapterInfo {
                identifier: a.identifier().to_string(),
                company: a.company().to_string(),
                source_url: a.source_url().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
