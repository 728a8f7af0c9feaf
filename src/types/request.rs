//! Request descriptors.

use url::Url;

use crate::transport::HttpVerb;
use crate::types::params::Params;

/// Target of a single call: the URL plus any caller-supplied headers.
///
/// Headers set here are applied before authentication, so the engine's
/// authentication layer can still override them.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// The effective URL, query string included.
    pub url: Url,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Describe a request against `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Parse `url` and describe a request against it.
    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?))
    }

    /// Attach a header to this request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Headers attached to this request, in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl From<Url> for ApiRequest {
    fn from(url: Url) -> Self {
        Self::new(url)
    }
}

/// Verb plus per-call payload and cache policy.
///
/// Only GET can be cache-eligible; mutating verbs are never cached.
#[derive(Debug, Clone)]
pub enum Method {
    /// GET, optionally served from and stored into the response cache.
    Get {
        /// Whether the cache may satisfy and store this call.
        use_cache: bool,
    },
    /// POST with an optional body.
    Post(Option<Params>),
    /// PUT with an optional body.
    Put(Option<Params>),
    /// DELETE, bodyless.
    Delete,
}

impl Method {
    /// The wire verb.
    pub fn verb(&self) -> HttpVerb {
        match self {
            Self::Get { .. } => HttpVerb::Get,
            Self::Post(_) => HttpVerb::Post,
            Self::Put(_) => HttpVerb::Put,
            Self::Delete => HttpVerb::Delete,
        }
    }

    /// Whether this call may touch the response cache.
    pub(crate) fn is_cache_eligible(&self) -> bool {
        matches!(self, Self::Get { use_cache: true })
    }

    /// Body parameters, when the verb carries them.
    pub(crate) fn params(&self) -> Option<&Params> {
        match self {
            Self::Post(params) | Self::Put(params) => params.as_ref(),
            Self::Get { .. } | Self::Delete => None,
        }
    }
}

/// Body encoding for POST and PUT parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostEncoding {
    /// JSON object body with `Content-Type: application/json`.
    #[default]
    Json,
    /// Form-urlencoded body with
    /// `Content-Type: application/x-www-form-urlencoded`.
    Form,
}

impl PostEncoding {
    /// The content type announced for bodies in this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// Marker type for calls whose response body is expected to be absent or
/// irrelevant. Requesting this type makes the engine deliver `None` without
/// attempting a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct NoContent;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params::params_from_pairs;

    #[test]
    fn only_cache_enabled_get_is_eligible() {
        assert!(Method::Get { use_cache: true }.is_cache_eligible());
        assert!(!Method::Get { use_cache: false }.is_cache_eligible());
        assert!(!Method::Post(None).is_cache_eligible());
        assert!(!Method::Put(Some(params_from_pairs([("a", "b")]))).is_cache_eligible());
        assert!(!Method::Delete.is_cache_eligible());
    }

    #[test]
    fn verbs_map_one_to_one() {
        assert_eq!(Method::Get { use_cache: true }.verb(), HttpVerb::Get);
        assert_eq!(Method::Post(None).verb(), HttpVerb::Post);
        assert_eq!(Method::Put(None).verb(), HttpVerb::Put);
        assert_eq!(Method::Delete.verb(), HttpVerb::Delete);
    }

    #[test]
    fn headers_keep_insertion_order() {
        let request = ApiRequest::parse("https://api.example.com/items")
            .unwrap()
            .with_header("X-First", "1")
            .with_header("X-Second", "2");
        let names: Vec<&str> = request.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["X-First", "X-Second"]);
    }

    #[test]
    fn content_types_match_encoding() {
        assert_eq!(PostEncoding::Json.content_type(), "application/json");
        assert_eq!(
            PostEncoding::Form.content_type(),
            "application/x-www-form-urlencoded"
        );
    }
}
