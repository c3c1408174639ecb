//! Fetch an OpenAPI document over HTTP.

use reqwest::blocking::Client;
use reqwest::header;
use reqwest::Url;

use crate::error::SpecError;
use crate::spec::{enumerate_endpoints, Endpoint, SpecDocument};

/// Loads a document from a URL and keeps the most recent one.
///
/// A successful load replaces the cached document wholesale; a failed load
/// leaves the previous one in place. There is no retry.
pub struct SpecLoader {
    client: Client,
    document: Option<SpecDocument>,
}

impl SpecLoader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            document: None,
        }
    }

    pub fn document(&self) -> Option<&SpecDocument> {
        self.document.as_ref()
    }

    pub fn load(&mut self, url: &str) -> Result<&SpecDocument, SpecError> {
        let doc = fetch_document(&self.client, url)?;
        Ok(&*self.document.insert(doc))
    }

    /// Load `url` and enumerate its endpoints.
    pub fn endpoints(&mut self, url: &str) -> Result<Vec<Endpoint>, SpecError> {
        let doc = self.load(url)?;
        Ok(enumerate_endpoints(doc))
    }
}

/// Fetch and parse the document at `url`.
pub fn fetch_document(client: &Client, url: &str) -> Result<SpecDocument, SpecError> {
    let parsed = Url::parse(url).map_err(|_| SpecError::InvalidUrl {
        url: url.to_string(),
    })?;

    tracing::info!(url, "loading OpenAPI spec");

    let resp = client
        .get(parsed)
        .header(header::ACCEPT, "application/json")
        .send()
        .map_err(|source| SpecError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SpecError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let text = resp.text().map_err(|source| SpecError::Request {
        url: url.to_string(),
        source,
    })?;
    let raw = serde_json::from_str(&text).map_err(|source| SpecError::Parse {
        url: url.to_string(),
        source,
    })?;

    let doc = SpecDocument::new(raw);
    tracing::info!(
        url,
        title = doc.title().unwrap_or("untitled"),
        paths = doc.paths().map_or(0, |p| p.len()),
        "OpenAPI spec loaded"
    );
    Ok(doc)
}
