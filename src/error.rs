//! Error types for the openapi-explorer crate.
//!
//! JSON syntax errors in user input and network failures during dispatch are
//! not represented here: the editor reports the former as a `Validation`
//! value and the dispatcher folds the latter into a status-0 `ApiResponse`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading an OpenAPI document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpecError {
    #[error("invalid OpenAPI URL: {url}")]
    InvalidUrl { url: String },

    #[error("failed to load OpenAPI spec from {url}: HTTP {status}: {reason}")]
    Fetch {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("failed to load OpenAPI spec from {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenAPI spec at {url} is not valid JSON")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the key-value persistence layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare store directory: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize stored value")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid store key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

/// Errors while reading the configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the command-line front end.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CliError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown endpoint: {id} (run `endpoints` to list them)")]
    UnknownEndpoint { id: String },

    #[error("unknown template: {name}")]
    UnknownTemplate { name: String },

    #[error("invalid --field format: {field} (expected key=value)")]
    InvalidFieldFormat { field: String },

    #[error("invalid --custom format: {field} (expected key:type=value, type one of string, number, boolean, email, date)")]
    InvalidCustomField { field: String },

    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("failed to read JSON input from {source_name}")]
    InputRead {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output")]
    Output(#[from] std::io::Error),

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to initialize logging: {0}")]
    Telemetry(String),
}
