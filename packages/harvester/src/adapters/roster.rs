//! The production roster: one entry per tracked employer career page.
//!
//! Selector maintenance lives here and nowhere else — when a site reworks its
//! markup, only its `SelectorSet` changes. Roster order is execution order
//! within a batch.

use std::sync::Arc;

use anyhow::Result;

use super::{AdapterRegistry, HtmlListAdapter, JsonApiAdapter, SelectorSet};

/// Build the fixed roster used by the daemon.
pub fn default_roster() -> Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();

    registry.register(Arc::new(HtmlListAdapter::new(
        "brainstation23",
        "Brain Station 23",
        "https://brainstation-23.com/career/",
        SelectorSet {
            listing: ".career-item".to_string(),
            title: ".career-item-title".to_string(),
            location: ".career-item-location".to_string(),
            description: ".career-item-summary".to_string(),
            employment_type: Some(".career-item-type".to_string()),
            experience: Some(".career-item-experience".to_string()),
            apply_link: Some("a.career-apply".to_string()),
        },
    )?));

    registry.register(Arc::new(HtmlListAdapter::new(
        "kazsoftware",
        "Kaz Software",
        "https://kaz.com.bd/career",
        SelectorSet {
            listing: ".job-opening".to_string(),
            title: "h4.position".to_string(),
            location: ".job-meta .location".to_string(),
            description: ".job-excerpt".to_string(),
            employment_type: Some(".job-meta .type".to_string()),
            experience: None,
            apply_link: Some("a.btn-apply".to_string()),
        },
    )?));

    registry.register(Arc::new(HtmlListAdapter::new(
        "cefalo",
        "Cefalo",
        "https://www.cefalo.com/en/careers/",
        SelectorSet {
            listing: "article.vacancy-card".to_string(),
            title: ".vacancy-card__title".to_string(),
            location: ".vacancy-card__office".to_string(),
            description: ".vacancy-card__intro".to_string(),
            employment_type: None,
            experience: Some(".vacancy-card__experience".to_string()),
            apply_link: Some("a.vacancy-card__link".to_string()),
        },
    )?));

    registry.register(Arc::new(HtmlListAdapter::new(
        "enosis",
        "Enosis Solutions",
        "https://enosisbd.pinpointhq.com/",
        SelectorSet {
            listing: ".job-listing".to_string(),
            title: ".job-listing__title".to_string(),
            location: ".job-listing__location".to_string(),
            description: ".job-listing__department".to_string(),
            employment_type: Some(".job-listing__employment-type".to_string()),
            experience: None,
            apply_link: None,
        },
    )?));

    registry.register(Arc::new(JsonApiAdapter::new(
        "therap",
        "Therap BD",
        "https://therap.hire.trakstar.com/",
        "https://therap.hire.trakstar.com/api/jobs/search",
        serde_json::json!({ "published": true, "page": 1 }),
    )));

    Ok(registry)
}
