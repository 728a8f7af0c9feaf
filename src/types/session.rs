//! Bearer sessions and the token-endpoint wire type.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// An installed bearer credential: access token plus optional refresh token
/// and expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerSession {
    /// The access token presented as `Authorization: Bearer <token>`.
    pub access_token: String,
    /// Refresh token, when the grant included one.
    pub refresh_token: Option<String>,
    /// Absolute expiry instant, when the grant included a lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerSession {
    /// Session holding only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Attach a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Attach an absolute expiry instant.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the expiry instant, if any, has passed.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now(),
            None => false,
        }
    }
}

// Token material stays out of logs.
impl std::fmt::Debug for BearerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerSession")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// The granted access token.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds from now.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token, when the provider rotates or issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scope, when the provider reports it.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Convert the grant into an installable session.
    ///
    /// When the grant carries no refresh token the previous one, if any, is
    /// carried forward so a refresh never downgrades the session.
    pub fn into_session(self, previous_refresh_token: Option<String>) -> BearerSession {
        BearerSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds as i64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(refresh_token: Option<&str>) -> TokenGrant {
        TokenGrant {
            access_token: "access-123".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            refresh_token: refresh_token.map(str::to_string),
            scope: None,
        }
    }

    #[test]
    fn grant_decodes_from_wire_json() {
        let body = r#"{
            "access_token": "abc",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "def",
            "scope": "user-read"
        }"#;
        let grant: TokenGrant = serde_json::from_str(body).unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.refresh_token.as_deref(), Some("def"));
        assert_eq!(grant.expires_in, Some(3600));
    }

    #[test]
    fn grant_decodes_without_optional_fields() {
        let grant: TokenGrant = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.token_type, None);
        assert_eq!(grant.expires_in, None);
        assert_eq!(grant.refresh_token, None);
    }

    #[test]
    fn session_carries_forward_previous_refresh_token() {
        let session = grant(None).into_session(Some("old-refresh".to_string()));
        assert_eq!(session.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[test]
    fn fresh_refresh_token_wins_over_previous() {
        let session = grant(Some("new-refresh")).into_session(Some("old-refresh".to_string()));
        assert_eq!(session.refresh_token.as_deref(), Some("new-refresh"));
    }

    #[test]
    fn expiry_is_derived_from_lifetime() {
        let session = grant(None).into_session(None);
        let expires_at = session.expires_at.unwrap();
        let delta = expires_at - Utc::now();
        assert!(delta > Duration::seconds(3500));
        assert!(delta <= Duration::seconds(3600));
        assert!(!session.is_expired());
    }

    #[test]
    fn past_expiry_reads_as_expired() {
        let session =
            BearerSession::new("abc").with_expiry(Utc::now() - Duration::seconds(10));
        assert!(session.is_expired());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let session = BearerSession::new("secret-token").with_refresh_token("secret-refresh");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
