//! Endpoint + form value + auth → HTTP request → [`ApiResponse`]
//!
//! [`build_request`] is pure: it substitutes path parameters, builds the query
//! string or JSON body, and merges auth headers over the base JSON headers.
//! [`Dispatcher::send`] issues the request and folds every transport failure
//! into a status-0 response, so callers never see an `Err`.

use indexmap::IndexMap;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthMaterialization;
use crate::form::{normalize_numbers, FormValue};
use crate::spec::{Endpoint, HttpMethod};

/// Suffix removed from a spec URL to find the API it describes.
pub const SWAGGER_JSON_SUFFIX: &str = "/swagger/v1/swagger.json";

/// Normalized result of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// `0` when no response was received.
    pub status: u16,
    pub status_text: String,
    /// Parsed JSON, the raw text when it is not JSON, or `Null` when empty.
    pub data: Value,
    pub headers: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Network,
    Informational,
    Success,
    Redirect,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Informational => "informational",
            Self::Success => "success",
            Self::Redirect => "redirect",
            Self::ClientError => "client error",
            Self::ServerError => "server error",
        }
    }
}

impl ApiResponse {
    pub fn network_error(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            status: 0,
            status_text: "Network Error".to_string(),
            data: json!({ "error": message }),
            headers: IndexMap::new(),
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self.status {
            0 => StatusClass::Network,
            100..=199 => StatusClass::Informational,
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400..=499 => StatusClass::ClientError,
            _ => StatusClass::ServerError,
        }
    }

    /// Body for display: text bodies verbatim, JSON pretty-printed.
    pub fn body_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Base URL for requests described by the spec at `spec_url`.
///
/// An explicit base URL wins. Otherwise the conventional Swagger JSON suffix
/// is stripped from the spec URL, falling back to the spec URL's origin.
pub fn derive_base_url(spec_url: &str, explicit: Option<&str>) -> String {
    if let Some(base) = explicit.map(str::trim).filter(|b| !b.is_empty()) {
        return base.trim_end_matches('/').to_string();
    }
    if let Some(stripped) = spec_url.strip_suffix(SWAGGER_JSON_SUFFIX) {
        return stripped.to_string();
    }
    match Url::parse(spec_url) {
        Ok(url) if url.origin().is_tuple() => url.origin().ascii_serialization(),
        _ => spec_url.trim_end_matches('/').to_string(),
    }
}

/// Resolve the URL, headers and body for `endpoint`.
pub fn build_request(
    base_url: &str,
    endpoint: &Endpoint,
    value: &FormValue,
    auth: &AuthMaterialization,
) -> PreparedRequest {
    let (path, substituted) = substitute_path(&endpoint.path, value);
    let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);

    let mut headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ];
    for (name, val) in &auth.headers {
        match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.1 = val.clone(),
            None => headers.push((name.clone(), val.clone())),
        }
    }

    let mut query = auth.query.clone();
    if endpoint.method == HttpMethod::Get {
        for (key, v) in value {
            if substituted.iter().any(|s| s == key) {
                continue;
            }
            if let Some(text) = scalar_text(v) {
                query.push((key.clone(), text));
            }
        }
    }
    append_query(&mut url, &query);

    let body = endpoint
        .method
        .has_body()
        .then(|| normalize_numbers(&Value::Object(value.clone())));

    PreparedRequest {
        method: endpoint.method,
        url,
        headers,
        body,
    }
}

/// Sends requests against one base URL.
pub struct Dispatcher {
    client: Client,
    base_url: String,
}

impl Dispatcher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Send one request. Transport failures come back as status 0.
    pub fn send(
        &self,
        endpoint: &Endpoint,
        value: &FormValue,
        auth: &AuthMaterialization,
    ) -> ApiResponse {
        let prepared = build_request(&self.base_url, endpoint, value, auth);
        tracing::info!(method = %prepared.method, url = %prepared.url, "sending request");

        let mut req: RequestBuilder = self
            .client
            .request(prepared.method.into(), prepared.url.as_str());
        for (name, val) in &prepared.headers {
            req = req.header(name.as_str(), val.as_str());
        }
        if let Some(body) = &prepared.body {
            req = req.json(body);
        }

        match execute(req) {
            Ok(resp) => {
                tracing::info!(
                    method = %prepared.method,
                    url = %prepared.url,
                    status = resp.status,
                    "request completed"
                );
                resp
            }
            Err(err) => {
                tracing::warn!(
                    method = %prepared.method,
                    url = %prepared.url,
                    error = %err,
                    "request failed"
                );
                ApiResponse::network_error(err.to_string())
            }
        }
    }
}

fn execute(req: RequestBuilder) -> Result<ApiResponse, reqwest::Error> {
    let resp = req.send()?;
    let status = resp.status();

    let mut headers: IndexMap<String, String> = IndexMap::new();
    for (name, val) in resp.headers() {
        let val = String::from_utf8_lossy(val.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&val);
            })
            .or_insert(val);
    }

    let text = resp.text()?;
    let data = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    Ok(ApiResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        data,
        headers,
    })
}

/// Replace `{name}` segments with URL-encoded form values. Returns the path
/// and the keys that were consumed.
fn substitute_path(path: &str, value: &FormValue) -> (String, Vec<String>) {
    let mut out = String::with_capacity(path.len());
    let mut used = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        let name = &rest[open + 1..close];
        out.push_str(&rest[..open]);
        match value.get(name).and_then(scalar_text) {
            Some(text) => {
                out.push_str(&urlencoding::encode(&text));
                used.push(name.to_string());
            }
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    (out, used)
}

fn append_query(url: &mut String, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&encoded.join("&"));
}

/// Query-string text of a scalar, non-empty value.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(_) => Some(normalize_numbers(value).to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
