//! Adapter for sources that expose their openings through a JSON search
//! endpoint instead of server-rendered HTML. The endpoint is queried with a
//! POST and a fixed payload.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::SourceAdapter;
use crate::model::RawPosting;
use crate::transport::Transport;

pub struct JsonApiAdapter {
    identifier: String,
    company: String,
    source_url: String,
    endpoint: String,
    payload: serde_json::Value,
}

/// Response shape shared by the greenhouse-style search endpoints on the
/// roster: a top-level `jobs` array of flat records.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs: Vec<JsonJob>,
}

#[derive(Debug, Deserialize)]
struct JsonJob {
    title: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    employment_type: Option<String>,
    #[serde(default)]
    experience: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl JsonApiAdapter {
    pub fn new(
        identifier: impl Into<String>,
        company: impl Into<String>,
        source_url: impl Into<String>,
        endpoint: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            company: company.into(),
            source_url: source_url.into(),
            endpoint: endpoint.into(),
            payload,
        }
    }

    fn to_raw(&self, job: JsonJob) -> RawPosting {
        RawPosting {
            title: job.title,
            company: self.company.clone(),
            location: job.location.unwrap_or_else(|| "Unspecified".to_string()),
            employment_type: job
                .employment_type
                .unwrap_or_else(|| "Full-time".to_string()),
            experience: job.experience,
            description: job.description.unwrap_or_default(),
            apply_link: job.url.unwrap_or_else(|| self.source_url.clone()),
        }
    }
}

#[async_trait]
impl SourceAdapter for JsonApiAdapter {
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
            .post_json(&self.endpoint, &self.payload)
            .await
            .with_context(|| format!("adapter {}: search request failed", self.identifier))?;

        let response: SearchResponse = serde_json::from_str(&body)
            .with_context(|| format!("adapter {}: malformed search response", self.identifier))?;

        debug!(
            adapter = %self.identifier,
            count = response.jobs.len(),
            "parsed search response"
        );
        Ok(response
            .jobs
            .into_iter()
            .filter(|j| !j.title.trim().is_empty())
            .map(|j| self.to_raw(j))
            .collect())
    }
}
