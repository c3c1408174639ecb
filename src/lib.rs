//! Explore an OpenAPI document interactively.
//!
//! Loads a spec over HTTP, derives one request schema per endpoint, renders
//! that schema as editable fields or JSON templates, and sends the resulting
//! request with the persisted authentication.
//!
//! # Usage
//!
//! ```no_run
//! use openapi_explorer::{AuthStore, Explorer, MemoryKv};
//! use reqwest::blocking::Client;
//!
//! let auth = AuthStore::load(MemoryKv::default());
//! let mut explorer = Explorer::new(
//!     Client::new(),
//!     auth,
//!     "http://localhost:5029/swagger/v1/swagger.json",
//!     None,
//! );
//!
//! explorer.load().unwrap();
//! explorer.select("POST-/pets");
//! explorer.draft_mut().edit_field("name", "Rex");
//! if let Some(resp) = explorer.send() {
//!     println!("{} {}", resp.status, resp.body_text());
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod explorer;
pub mod form;
pub mod loader;
pub mod schema;
pub mod spec;
pub mod store;
pub mod telemetry;

pub use auth::{ApiKeyLocation, AuthConfig, AuthMaterialization, AuthStore};
pub use config::{load_config, ExplorerConfig};
pub use dispatch::{build_request, derive_base_url, ApiResponse, Dispatcher};
pub use editor::{format, templates, validate, Draft, Template, Validation};
pub use error::{CliError, ConfigError, SpecError, StoreError};
pub use explorer::Explorer;
pub use form::{render, Field, FieldKind, FormState, FormValue};
pub use loader::SpecLoader;
pub use schema::{Schema, SchemaType};
pub use spec::{endpoint_id, enumerate_endpoints, extract_schema, Endpoint, HttpMethod, SpecDocument};
pub use store::{KvStore, MemoryKv, SqliteKv};

// Re-export dependencies for downstream crates
pub use reqwest;
pub use serde_json;
