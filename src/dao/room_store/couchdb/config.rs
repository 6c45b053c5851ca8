use std::env;

use super::error::{CouchError, CouchResult};

const DEFAULT_DATABASE: &str = "cineguess_rooms";

/// How to reach the CouchDB rooms database.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL without trailing slash.
    pub base_url: String,
    /// Database holding room documents.
    pub database: String,
    /// Basic-auth username and password.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` and the optional
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = env::var("COUCH_BASE_URL").map_err(|_| CouchError::MissingBaseUrl)?;
        let credentials = env::var("COUCH_USERNAME")
            .ok()
            .zip(env::var("COUCH_PASSWORD").ok());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: env::var("COUCH_DB").unwrap_or_else(|_| DEFAULT_DATABASE.to_owned()),
            credentials,
        })
    }
}
