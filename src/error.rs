//! Error types.
//!
//! Only wiring defects ([`LocaleError::OutsideProvider`]) are meant to reach
//! callers. Load and storage failures are recovered inside the crate and
//! surface as diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::locales::ResourceKey;

/// Failure to produce a bundle for one key.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The registry has no loader for the key
    #[error("no translation resource registered for {0}")]
    NotFound(ResourceKey),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed translation resource {key}: {source}")]
    Parse {
        key: ResourceKey,
        #[source]
        source: serde_json::Error,
    },

    /// The resource parsed but its top level is not a JSON object
    #[error("translation resource {0} must be a JSON object")]
    NotAnObject(ResourceKey),

    /// Custom loaders report anything else through this
    #[error("failed to load {key}: {message}")]
    Other { key: ResourceKey, message: String },
}

/// Failure to read or write a persisted preference.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt storage file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed cookie record: {0}")]
    Cookie(String),
}

/// Errors returned to consumers of the locale capability.
#[derive(Error, Debug)]
pub enum LocaleError {
    /// The locale capability was requested from a world that never had
    /// [`LocalePlugin`](crate::LocalePlugin) added.
    #[error("use_locale must be used within a world provisioned by LocalePlugin")]
    OutsideProvider,
}
