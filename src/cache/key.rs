//! Cache identity.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::ApiRequest;

/// Identity of a cache entry.
///
/// Identity is the effective URL string of the request the entry answers;
/// two keys are equal exactly when those strings are equal. Raw construction
/// exists for seeding and for identities minted outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Identity for a request: its effective URL, query included.
    pub fn for_request(request: &ApiRequest) -> Self {
        Self(request.url.as_str().to_string())
    }

    /// Caller-chosen identity.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Url> for CacheKey {
    fn from(url: &Url) -> Self {
        Self(url.as_str().to_string())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
