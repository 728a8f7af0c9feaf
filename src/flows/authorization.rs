//! User-facing authorization step of the code flow.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::error::AuthorizationUiError;

/// Presents the provider's consent page and resolves with the callback URL
/// the provider redirected to.
///
/// Implementations own the user interaction: a system browser session, an
/// embedded web view, or a test double. `callback_scheme` is the scheme of
/// the registered redirect; the UI resolves once it observes a navigation
/// to that scheme.
#[async_trait]
pub trait AuthorizationUi: Send + Sync {
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_scheme: &str,
    ) -> Result<Url, AuthorizationUiError>;
}

/// Scripted authorization UI for tests.
///
/// Outcomes queue in FIFO order and every prompt is recorded. An empty
/// queue fails the prompt rather than hanging it.
#[derive(Debug, Default)]
pub struct MockAuthorizationUi {
    outcomes: Mutex<VecDeque<Result<Url, AuthorizationUiError>>>,
    prompts: Mutex<Vec<(Url, String)>>,
}

impl MockAuthorizationUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful redirect back to `callback_url`.
    pub fn push_redirect(&self, callback_url: Url) {
        self.outcomes.lock().unwrap().push_back(Ok(callback_url));
    }

    /// Queue a failed prompt.
    pub fn push_error(&self, error: AuthorizationUiError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    /// Prompts observed so far, oldest first.
    pub fn prompts(&self) -> Vec<(Url, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationUi for MockAuthorizationUi {
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_scheme: &str,
    ) -> Result<Url, AuthorizationUiError> {
        self.prompts
            .lock()
            .unwrap()
            .push((authorization_url.clone(), callback_scheme.to_string()));
        self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(AuthorizationUiError::Failed {
                message: "no scripted authorization outcome".to_string(),
            })
        })
    }
}
