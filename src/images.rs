//! Best-effort image lookup through the encyclopedia's page-image API.
//!
//! Results-API records carry a reference URL such as
//! `http://en.wikipedia.org/wiki/Max_Verstappen`. The page title after
//! `/wiki/` is looked up with `action=query&prop=pageimages`; a missing page
//! or a page without a thumbnail is a normal outcome, not an error.

use anyhow::Result;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::StatsConfig;
use crate::http;

#[derive(Debug, Deserialize, Default)]
struct PageImagesResponse {
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize, Default)]
struct PageQuery {
    #[serde(default)]
    pages: BTreeMap<String, Page>,
}

#[derive(Debug, Deserialize, Default)]
struct Page {
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnail {
    source: Option<String>,
}

/// Extract the decoded page title from a reference URL.
///
/// Returns `None` when the URL has no `/wiki/` segment, the title is empty,
/// or its percent-encoding is malformed.
pub fn page_title_slug(reference_url: &str) -> Option<String> {
    let (_, raw) = reference_url.split_once("/wiki/")?;
    let raw = raw.split(['?', '#']).next().unwrap_or("");
    let slug = percent_decode(raw)?;
    if slug.trim().is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Decode `%XX` escapes, rejecting truncated or non-hex escapes and
/// non-UTF-8 results.
fn percent_decode(input: &str) -> Option<String> {
    let well_formed = input
        .split('%')
        .skip(1)
        .all(|escape| escape.get(..2).is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit())));
    if !well_formed {
        return None;
    }
    percent_decode_str(input).decode_utf8().ok().map(|s| s.into_owned())
}

fn thumbnail_source(response: PageImagesResponse) -> Option<String> {
    let pages = response.query?.pages;
    let (page_id, page) = pages.into_iter().next()?;
    if page_id == "-1" {
        return None;
    }
    page.thumbnail?.source.filter(|s| !s.is_empty())
}

/// Resolves reference URLs to thumbnail URLs.
pub struct ImageResolver {
    client: reqwest::Client,
    api_url: String,
    thumbnail_size: u32,
    max_retries: u32,
}

impl ImageResolver {
    pub fn new(client: reqwest::Client, config: &StatsConfig) -> Self {
        Self {
            client,
            api_url: config.image_api_url.clone(),
            thumbnail_size: config.thumbnail_size,
            max_retries: config.max_retries,
        }
    }

    /// Thumbnail URL for a reference page, or `None` on any failure.
    pub async fn resolve(&self, reference_url: &str) -> Option<String> {
        let slug = page_title_slug(reference_url)?;
        match self.lookup(&slug).await {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                debug!(page = %slug, "no thumbnail for page");
                None
            }
            Err(e) => {
                warn!(page = %slug, error = %e, "image lookup failed");
                None
            }
        }
    }

    async fn lookup(&self, slug: &str) -> Result<Option<String>> {
        let query = [
            ("action", "query".to_string()),
            ("titles", slug.to_string()),
            ("prop", "pageimages".to_string()),
            ("format", "json".to_string()),
            ("pithumbsize", self.thumbnail_size.to_string()),
            ("origin", "*".to_string()),
        ];
        let response: PageImagesResponse =
            http::get_json(&self.client, &self.api_url, &query, self.max_retries).await?;
        Ok(thumbnail_source(response))
    }
}
