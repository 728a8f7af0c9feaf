//! OAuth provider descriptors.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::types::{params_from_pairs, ParamValue, Params, PostEncoding};

/// Where client credentials travel on token-endpoint requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuthMethod {
    /// `client_id`/`client_secret` as body parameters.
    #[default]
    SecretPost,
    /// `Authorization: Basic` header; body carries only the grant fields.
    SecretBasic,
}

/// Endpoints and credentials of one OAuth provider.
///
/// Not a registry: applications construct the descriptor they need, either
/// directly or through a preset.
#[derive(Debug, Clone)]
pub struct OauthProvider {
    /// Authorization (consent) endpoint.
    pub authorization_endpoint: Url,
    /// Token endpoint.
    pub token_endpoint: Url,
    /// Public client identifier.
    pub client_id: String,
    /// Client secret, when the provider issues one.
    pub client_secret: Option<SecretString>,
    /// Redirect the provider calls back to; its scheme is handed to the
    /// authorization UI.
    pub redirect_uri: Url,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Separator used when joining scopes into the authorization URL.
    pub scope_separator: String,
    /// Body encoding for token-endpoint requests.
    pub token_encoding: PostEncoding,
    /// How client credentials travel to the token endpoint.
    pub auth_method: ClientAuthMethod,
}

impl OauthProvider {
    /// Descriptor with standard defaults: space-joined scopes, form-encoded
    /// token requests, credentials as body parameters.
    pub fn new(
        authorization_endpoint: Url,
        token_endpoint: Url,
        client_id: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri,
            scopes: Vec::new(),
            scope_separator: " ".to_string(),
            token_encoding: PostEncoding::Form,
            auth_method: ClientAuthMethod::SecretPost,
        }
    }

    /// Attach a client secret.
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Request `scopes`.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Override the scope separator.
    pub fn with_scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.scope_separator = separator.into();
        self
    }

    /// Override the token-endpoint body encoding.
    pub fn with_token_encoding(mut self, encoding: PostEncoding) -> Self {
        self.token_encoding = encoding;
        self
    }

    /// Override where client credentials travel.
    pub fn with_auth_method(mut self, auth_method: ClientAuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Spotify Accounts service. Scopes join with commas, as the service
    /// expects.
    pub fn spotify(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
        scopes: Vec<String>,
    ) -> Self {
        Self::new(
            endpoint("https://accounts.spotify.com/authorize"),
            endpoint("https://accounts.spotify.com/api/token"),
            client_id,
            redirect_uri,
        )
        .with_client_secret(client_secret)
        .with_scopes(scopes)
        .with_scope_separator(",")
    }

    /// Google OAuth 2.0 endpoints.
    pub fn google(
        client_id: impl Into<String>,
        redirect_uri: Url,
        scopes: Vec<String>,
    ) -> Self {
        Self::new(
            endpoint("https://accounts.google.com/o/oauth2/v2/auth"),
            endpoint("https://oauth2.googleapis.com/token"),
            client_id,
            redirect_uri,
        )
        .with_scopes(scopes)
        .with_scope_separator(",")
    }

    /// The consent URL handed to the authorization UI.
    pub fn authorization_url(&self) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(&self.scope_separator))
            .append_pair("redirect_uri", self.redirect_uri.as_str());
        url
    }

    /// Scheme the provider redirects back on.
    pub fn callback_scheme(&self) -> &str {
        self.redirect_uri.scheme()
    }

    /// `Authorization: Basic` value for header credentials, when a secret
    /// is present.
    pub fn basic_authorization(&self) -> Option<String> {
        self.client_secret.as_ref().map(|secret| {
            let raw = format!("{}:{}", self.client_id, secret.expose_secret());
            format!("Basic {}", BASE64.encode(raw))
        })
    }

    pub(crate) fn exchange_params(&self, code: &str) -> Params {
        let mut params = params_from_pairs([
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
        ]);
        self.append_secret(&mut params);
        params
    }

    pub(crate) fn refresh_params(&self, refresh_token: &str) -> Params {
        let mut params = params_from_pairs([
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
        ]);
        self.append_secret(&mut params);
        params
    }

    fn append_secret(&self, params: &mut Params) {
        if self.auth_method != ClientAuthMethod::SecretPost {
            return;
        }
        if let Some(secret) = &self.client_secret {
            params.insert(
                "client_secret".to_string(),
                ParamValue::from(secret.expose_secret().as_str()),
            );
        }
    }
}

fn endpoint(raw: &str) -> Url {
    Url::parse(raw).expect("static endpoint URL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider() -> OauthProvider {
        OauthProvider::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
            "client-1",
            Url::parse("myapp://callback").unwrap(),
        )
        .with_client_secret("hush")
        .with_scopes(["read", "write"])
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn authorization_url_carries_the_standard_query() {
        let url = provider().authorization_url();
        let query = query_map(&url);
        assert_eq!(query.get("client_id").map(String::as_str), Some("client-1"));
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(query.get("scope").map(String::as_str), Some("read write"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("myapp://callback")
        );
        assert!(query.get("client_secret").is_none());
    }

    #[test]
    fn callback_scheme_comes_from_the_redirect() {
        assert_eq!(provider().callback_scheme(), "myapp");
    }

    #[test]
    fn exchange_params_include_posted_credentials() {
        let params = provider().exchange_params("the-code");
        assert_eq!(params.get("code"), Some(&ParamValue::from("the-code")));
        assert_eq!(
            params.get("grant_type"),
            Some(&ParamValue::from("authorization_code"))
        );
        assert_eq!(
            params.get("client_secret"),
            Some(&ParamValue::from("hush"))
        );
    }

    #[test]
    fn basic_auth_moves_credentials_out_of_the_body() {
        let provider = provider().with_auth_method(ClientAuthMethod::SecretBasic);
        let params = provider.exchange_params("the-code");
        assert!(params.get("client_secret").is_none());

        let basic = provider.basic_authorization().unwrap();
        // base64("client-1:hush")
        assert_eq!(basic, "Basic Y2xpZW50LTE6aHVzaA==");
    }

    #[test]
    fn refresh_params_carry_the_token_and_grant_type() {
        let params = provider().refresh_params("refresh-1");
        assert_eq!(
            params.get("refresh_token"),
            Some(&ParamValue::from("refresh-1"))
        );
        assert_eq!(
            params.get("grant_type"),
            Some(&ParamValue::from("refresh_token"))
        );
    }

    #[test]
    fn spotify_preset_joins_scopes_with_commas() {
        let provider = OauthProvider::spotify(
            "cid",
            "secret",
            Url::parse("myapp://spotify").unwrap(),
            vec!["user-read-private".to_string(), "user-library-read".to_string()],
        );
        let query = query_map(&provider.authorization_url());
        assert_eq!(
            query.get("scope").map(String::as_str),
            Some("user-read-private,user-library-read")
        );
        assert_eq!(provider.token_encoding, PostEncoding::Form);
    }

    #[test]
    fn google_preset_points_at_google_endpoints() {
        let provider = OauthProvider::google(
            "cid",
            Url::parse("myapp://google").unwrap(),
            vec!["profile".to_string()],
        );
        assert_eq!(
            provider.authorization_endpoint.host_str(),
            Some("accounts.google.com")
        );
        assert_eq!(
            provider.token_endpoint.host_str(),
            Some("oauth2.googleapis.com")
        );
    }
}
