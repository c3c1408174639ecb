//! One interactive session: loaded endpoints, the selected endpoint's draft,
//! the active auth configuration and the last response.

use reqwest::blocking::Client;

use crate::auth::AuthStore;
use crate::dispatch::{derive_base_url, ApiResponse, Dispatcher};
use crate::editor::Draft;
use crate::error::SpecError;
use crate::loader::SpecLoader;
use crate::schema::Schema;
use crate::spec::{enumerate_endpoints, Endpoint};
use crate::store::KvStore;

pub struct Explorer<S: KvStore> {
    loader: SpecLoader,
    dispatcher: Dispatcher,
    auth: AuthStore<S>,
    spec_url: String,
    base_url_override: Option<String>,
    endpoints: Vec<Endpoint>,
    selected: Option<usize>,
    draft: Draft,
    response: Option<ApiResponse>,
}

impl<S: KvStore> Explorer<S> {
    pub fn new(
        client: Client,
        auth: AuthStore<S>,
        spec_url: impl Into<String>,
        base_url_override: Option<String>,
    ) -> Self {
        let spec_url = spec_url.into();
        let base_url = derive_base_url(&spec_url, base_url_override.as_deref());
        Self {
            loader: SpecLoader::new(client.clone()),
            dispatcher: Dispatcher::new(client, base_url),
            auth,
            spec_url,
            base_url_override,
            endpoints: Vec::new(),
            selected: None,
            draft: Draft::new(Schema::empty_object()),
            response: None,
        }
    }

    pub fn spec_url(&self) -> &str {
        &self.spec_url
    }

    pub fn base_url(&self) -> &str {
        self.dispatcher.base_url()
    }

    /// Point the session at another spec; takes effect on the next [`load`](Self::load).
    pub fn set_spec_url(&mut self, spec_url: impl Into<String>) {
        self.spec_url = spec_url.into();
        self.dispatcher.set_base_url(derive_base_url(
            &self.spec_url,
            self.base_url_override.as_deref(),
        ));
    }

    /// Fetch the spec and replace the endpoint list, selecting the first
    /// endpoint. On failure the list and selection are cleared.
    pub fn load(&mut self) -> Result<&[Endpoint], SpecError> {
        match self.loader.load(&self.spec_url) {
            Ok(doc) => {
                self.endpoints = enumerate_endpoints(doc);
                self.select_index(if self.endpoints.is_empty() { None } else { Some(0) });
                Ok(&self.endpoints)
            }
            Err(err) => {
                self.endpoints.clear();
                self.select_index(None);
                Err(err)
            }
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn selected(&self) -> Option<&Endpoint> {
        self.selected.and_then(|i| self.endpoints.get(i))
    }

    /// Select an endpoint by id, starting a fresh draft from its schema.
    pub fn select(&mut self, id: &str) -> Option<&Endpoint> {
        let index = self.endpoints.iter().position(|e| e.id == id)?;
        self.select_index(Some(index));
        self.selected()
    }

    fn select_index(&mut self, index: Option<usize>) {
        self.selected = index;
        let schema = self
            .selected()
            .map(|e| e.schema.clone())
            .unwrap_or_else(Schema::empty_object);
        self.draft = Draft::new(schema);
        self.response = None;
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    /// Clear the draft for the selected endpoint.
    pub fn reset(&mut self) {
        self.draft.reset();
    }

    pub fn auth(&self) -> &AuthStore<S> {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthStore<S> {
        &mut self.auth
    }

    /// Send the draft to the selected endpoint, replacing the last response.
    /// `None` when nothing is selected.
    pub fn send(&mut self) -> Option<&ApiResponse> {
        let index = self.selected?;
        let endpoint = self.endpoints.get(index)?;
        let response =
            self.dispatcher
                .send(endpoint, self.draft.value(), &self.auth.materialize());
        Some(&*self.response.insert(response))
    }

    pub fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    pub fn into_auth(self) -> AuthStore<S> {
        self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::store::MemoryKv;
    use serde_json::json;

    const SPEC: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "Pets", "version": "1"},
        "paths": {
            "/pets": {
                "get": {"summary": "List pets"},
                "post": {
                    "requestBody": {"content": {"application/json": {"schema": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"name": {"type": "string"}}
                    }}}}
                }
            }
        }
    }"#;

    fn explorer(server: &mockito::Server, path: &str) -> Explorer<MemoryKv> {
        Explorer::new(
            Client::new(),
            AuthStore::load(MemoryKv::default()),
            format!("{}{}", server.url(), path),
            Some(server.url()),
        )
    }

    #[test]
    fn load_selects_first_endpoint() {
        let mut server = mockito::Server::new();
        let _spec = server.mock("GET", "/spec.json").with_body(SPEC).create();

        let mut ex = explorer(&server, "/spec.json");
        let ids: Vec<String> = ex.load().unwrap().iter().map(|e| e.id.clone()).collect();

        assert_eq!(ids, vec!["GET-/pets", "POST-/pets"]);
        assert_eq!(ex.selected().map(|e| e.id.as_str()), Some("GET-/pets"));
    }

    #[test]
    fn failed_load_clears_endpoints_and_selection() {
        let mut server = mockito::Server::new();
        let _ok = server.mock("GET", "/spec.json").with_body(SPEC).create();
        let _bad = server.mock("GET", "/gone.json").with_status(500).create();

        let mut ex = explorer(&server, "/spec.json");
        ex.load().unwrap();
        ex.set_spec_url(format!("{}/gone.json", server.url()));

        assert!(matches!(ex.load(), Err(SpecError::Fetch { status: 500, .. })));
        assert!(ex.endpoints().is_empty());
        assert!(ex.selected().is_none());
    }

    #[test]
    fn select_resets_draft_and_response() {
        let mut server = mockito::Server::new();
        let _spec = server.mock("GET", "/spec.json").with_body(SPEC).create();
        let _list = server.mock("GET", "/pets").with_body("[]").create();

        let mut ex = explorer(&server, "/spec.json");
        ex.load().unwrap();
        ex.draft_mut().edit_field("search", "cat");
        ex.send().unwrap();
        assert!(ex.response().is_some());

        ex.select("POST-/pets").unwrap();
        assert!(ex.draft().value().is_empty());
        assert!(ex.response().is_none());
        assert!(ex.draft().schema().is_required("name"));
        assert!(ex.select("PUT-/nope").is_none());
    }

    #[test]
    fn send_uses_persisted_auth() {
        let mut server = mockito::Server::new();
        let _spec = server.mock("GET", "/spec.json").with_body(SPEC).create();
        let create = server
            .mock("POST", "/pets")
            .match_header("authorization", "Bearer tok")
            .match_body(mockito::Matcher::Json(json!({"name": "Rex"})))
            .with_status(201)
            .with_body(r#"{"id": 1}"#)
            .create();

        let mut ex = explorer(&server, "/spec.json");
        ex.auth_mut().set(AuthConfig::bearer("tok"));
        ex.load().unwrap();
        ex.select("POST-/pets").unwrap();
        ex.draft_mut().edit_field("name", "Rex");

        let resp = ex.send().unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.data, json!({"id": 1}));
        create.assert();

        let reloaded = AuthStore::load(ex.into_auth().into_inner());
        assert_eq!(reloaded.config(), &AuthConfig::bearer("tok"));
    }

    #[test]
    fn send_without_selection_is_none() {
        let server = mockito::Server::new();
        let mut ex = explorer(&server, "/spec.json");
        assert!(ex.send().is_none());
    }

    #[test]
    fn base_url_is_derived_without_override() {
        let ex: Explorer<MemoryKv> = Explorer::new(
            Client::new(),
            AuthStore::load(MemoryKv::default()),
            "http://localhost:5029/swagger/v1/swagger.json",
            None,
        );
        assert_eq!(ex.base_url(), "http://localhost:5029");
    }

    #[test]
    fn reset_clears_draft() {
        let server = mockito::Server::new();
        let mut ex = explorer(&server, "/spec.json");
        ex.draft_mut().edit_field("x", "1");
        ex.reset();
        assert!(ex.draft().value().is_empty());
    }
}
