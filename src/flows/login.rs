//! Three-legged authorization-code flow and session refresh.

use std::sync::Arc;

use crate::auth::Authentication;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ConfigError, OauthError};
use crate::flows::{AuthorizationUi, ClientAuthMethod, OauthProvider};
use crate::types::{ApiRequest, BearerSession, Method, Params, TokenGrant};

/// Drives `idle -> awaiting-user-consent -> exchanging-code` and installs
/// the resulting bearer session on the engine.
///
/// One flow is active per engine at a time. [`start`](Self::start) on one
/// clone supersedes a pending flow started on another: the superseded flow
/// completes silently, invoking neither callback and leaving
/// authentication untouched.
#[derive(Clone)]
pub struct OauthLogin {
    client: ApiClient,
    provider: OauthProvider,
    ui: Arc<dyn AuthorizationUi>,
    // Fresh engine for the token endpoint: shares the transport, carries
    // the provider's body encoding, has no cache and no authentication.
    token_client: ApiClient,
}

impl OauthLogin {
    pub fn new(
        client: ApiClient,
        provider: OauthProvider,
        ui: Arc<dyn AuthorizationUi>,
    ) -> Result<Self, ConfigError> {
        let config = ClientConfig::builder()
            .user_agent(client.user_agent())
            .encoding(provider.token_encoding)
            .runtime(client.runtime_handle().clone())
            .build()?;
        let token_client = ApiClient::with_transport(config, client.transport())?;
        Ok(Self {
            client,
            provider,
            ui,
            token_client,
        })
    }

    /// Begin the consent step and return immediately.
    ///
    /// On a completed exchange the engine gains bearer authentication and
    /// `on_success` runs. `on_failure` receives cancellation, a callback
    /// URL without a `code`, and token-exchange failures; authentication
    /// is left as it was.
    pub fn start(
        &self,
        on_success: impl FnOnce() + Send + 'static,
        on_failure: impl FnOnce(&OauthError) + Send + 'static,
    ) {
        let id = self.client.begin_login();
        let flow = self.clone();
        self.client.runtime_handle().spawn(async move {
            let outcome = flow.run_authorization().await;
            // Superseded flows finish silently.
            if !flow.client.finish_login(id) {
                return;
            }
            match outcome {
                Ok(session) => {
                    flow.client.set_authentication(Authentication::Bearer(session));
                    on_success();
                }
                Err(error) => on_failure(&error),
            }
        });
    }

    /// Exchange the stored refresh token for a fresh session.
    ///
    /// Without bearer authentication carrying a refresh token this is a
    /// no-op and neither callback runs. A failed refresh de-authenticates
    /// the engine before `on_failure`.
    pub fn refresh(
        &self,
        on_success: impl FnOnce() + Send + 'static,
        on_failure: impl FnOnce(&OauthError) + Send + 'static,
    ) {
        let refresh_token = match self.client.authentication() {
            Authentication::Bearer(session) => match session.refresh_token {
                Some(token) => token,
                None => return,
            },
            _ => return,
        };
        let flow = self.clone();
        self.client.runtime_handle().spawn(async move {
            let params = flow.provider.refresh_params(&refresh_token);
            match flow.request_grant(params).await {
                Ok(grant) => {
                    let session = grant.into_session(Some(refresh_token));
                    flow.client.set_authentication(Authentication::Bearer(session));
                    on_success();
                }
                Err(error) => {
                    flow.client.de_authenticate();
                    on_failure(&error);
                }
            }
        });
    }

    /// Drop authentication. Idempotent.
    pub fn log_out(&self) {
        self.client.de_authenticate();
    }

    async fn run_authorization(&self) -> Result<BearerSession, OauthError> {
        let url = self.provider.authorization_url();
        let callback = self
            .ui
            .authorize(&url, self.provider.callback_scheme())
            .await
            .map_err(OauthError::from)?;
        let code = callback
            .query_pairs()
            .find(|(name, value)| name == "code" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
            .ok_or(OauthError::MissingCode)?;
        let params = self.provider.exchange_params(&code);
        let grant = self.request_grant(params).await?;
        Ok(grant.into_session(None))
    }

    async fn request_grant(&self, params: Params) -> Result<TokenGrant, OauthError> {
        let mut request = ApiRequest::new(self.provider.token_endpoint.clone());
        if self.provider.auth_method == ClientAuthMethod::SecretBasic {
            if let Some(basic) = self.provider.basic_authorization() {
                request = request.with_header("Authorization", basic);
            }
        }
        match self
            .token_client
            .try_perform::<TokenGrant>(&request, &Method::Post(Some(params)))
            .await
        {
            Ok(Some(grant)) => Ok(grant),
            Ok(None) => Err(OauthError::EmptyGrant),
            Err(error) => Err(OauthError::TokenExchange(error)),
        }
    }
}
