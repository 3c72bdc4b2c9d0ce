//! Client configuration.
//!
//! Credentials are mandatory; everything else has a default. `from_env`
//! reads `EMARSYS_USERNAME`, `EMARSYS_SECRET` and, optionally,
//! `EMARSYS_BASE_URL`.

use thiserror::Error;

use crate::envelope::DEFAULT_MAX_DEPTH;
use crate::mapping::{ChoiceMapping, FieldMapping};
use crate::reference::ReferenceError;
use crate::signer::{Credentials, DigestEncoding};

/// Production endpoint.
pub const LIVE_BASE_URL: &str = "https://api.emarsys.net/api/v2/";

pub const USERNAME_VAR: &str = "EMARSYS_USERNAME";
pub const SECRET_VAR: &str = "EMARSYS_SECRET";
pub const BASE_URL_VAR: &str = "EMARSYS_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) credentials: Credentials,
    pub(crate) base_url: String,
    pub(crate) max_depth: usize,
    pub(crate) digest_encoding: DigestEncoding,
    pub(crate) fields: FieldMapping,
    pub(crate) choices: ChoiceMapping,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, secret),
            base_url: LIVE_BASE_URL.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            digest_encoding: DigestEncoding::default(),
            fields: FieldMapping::new(),
            choices: ChoiceMapping::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup(USERNAME_VAR).ok_or(ConfigError::MissingVar(USERNAME_VAR))?;
        let secret = lookup(SECRET_VAR).ok_or(ConfigError::MissingVar(SECRET_VAR))?;
        let config = Self::new(username, secret);
        Ok(match lookup(BASE_URL_VAR) {
            Some(url) if !url.trim().is_empty() => config.with_base_url(url),
            _ => config,
        })
    }

    /// Override the endpoint. A trailing `/` is added when missing since
    /// relative paths are appended verbatim.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into().trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_digest_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.digest_encoding = encoding;
        self
    }

    /// Replace the bundled field list. An empty mapping keeps the bundled one.
    pub fn with_fields_mapping(mut self, fields: FieldMapping) -> Self {
        self.fields = fields;
        self
    }

    /// Replace the bundled choice list. An empty mapping keeps the bundled one.
    pub fn with_choices_mapping(mut self, choices: ChoiceMapping) -> Self {
        self.choices = choices;
        self
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn digest_encoding(&self) -> DigestEncoding {
        self.digest_encoding
    }
}
