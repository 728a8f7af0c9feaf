//! Authorization-code login flow: provider descriptors, the user-consent
//! seam, and the flow driver that installs sessions on the engine.

mod authorization;
mod login;
mod provider;

pub use authorization::{AuthorizationUi, MockAuthorizationUi};
pub use login::OauthLogin;
pub use provider::{ClientAuthMethod, OauthProvider};
