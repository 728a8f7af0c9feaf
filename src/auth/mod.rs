//! Authentication state and its application to outgoing requests.

use std::sync::Arc;

use crate::transport::TransportRequest;
use crate::types::BearerSession;

/// Closure that decorates an outgoing request with whatever credentials a
/// non-standard scheme needs.
pub type RequestConfigurator = Arc<dyn Fn(&mut TransportRequest) + Send + Sync>;

/// The engine's authentication state.
///
/// `Custom` keeps the set of schemes open: the configurator runs against the
/// fully built request just before dispatch.
#[derive(Clone)]
pub enum Authentication {
    /// No credentials are attached.
    None,
    /// A bearer session; applied as `Authorization: Bearer <token>`.
    Bearer(BearerSession),
    /// Caller-managed credentials.
    Custom(RequestConfigurator),
}

impl Authentication {
    /// Wrap a configurator closure.
    pub fn custom(configure: impl Fn(&mut TransportRequest) + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(configure))
    }

    /// Status derived from the current state.
    pub fn status(&self) -> AuthStatus {
        match self {
            Self::None => AuthStatus::Unauthenticated,
            Self::Bearer(session) if session.is_expired() => AuthStatus::Expired,
            Self::Bearer(_) => AuthStatus::Authenticated,
            Self::Custom(_) => AuthStatus::Manual,
        }
    }

    /// The bearer session, when that is the current scheme.
    pub fn bearer_session(&self) -> Option<&BearerSession> {
        match self {
            Self::Bearer(session) => Some(session),
            _ => None,
        }
    }

    /// Decorate `request` with the current credentials.
    pub(crate) fn apply(&self, request: &mut TransportRequest) {
        match self {
            Self::None => {}
            Self::Bearer(session) => {
                request.set_header(
                    "Authorization",
                    format!("Bearer {}", session.access_token),
                );
            }
            Self::Custom(configure) => configure(request),
        }
    }
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("Authentication::None"),
            Self::Bearer(session) => f.debug_tuple("Authentication::Bearer").field(session).finish(),
            Self::Custom(_) => f.write_str("Authentication::Custom(..)"),
        }
    }
}

impl Default for Authentication {
    fn default() -> Self {
        Self::None
    }
}

/// Status derived from [`Authentication`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// No credentials installed.
    Unauthenticated,
    /// A live bearer session is installed.
    Authenticated,
    /// The bearer session's expiry has passed.
    Expired,
    /// Credentials are caller-managed; the engine cannot judge them.
    Manual,
}
