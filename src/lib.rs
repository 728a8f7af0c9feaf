//! Authenticated HTTP Client Engine
//!
//! A reusable engine for building typed API clients: request execution with
//! JSON decoding, a bounded response cache, pluggable authentication with an
//! OAuth authorization-code flow, and per-call failure reporting.
//!
//! # Features
//!
//! - Typed GET/POST/PUT/DELETE execution over a pluggable transport
//! - Async and callback call surfaces backed by the same pipeline
//! - Cost-bounded LRU response cache shared across engine clones
//! - Bearer and custom-configurator authentication with change observation
//! - Three-legged OAuth authorization-code flow with session refresh
//! - One-shot failure subscriptions scoped to individual calls
//!
//! # Example
//!
//! ```rust,ignore
//! use integrations_http::{ApiClient, ApiRequest, ResponseCache};
//! use std::sync::Arc;
//!
//! #[derive(serde::Deserialize)]
//! struct Track {
//!     id: String,
//!     title: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder()
//!         .cache(Arc::new(ResponseCache::new()))
//!         .build()?;
//!
//!     client.on_failure(|error| eprintln!("call failed: {error}"));
//!     let track: Option<Track> = client
//!         .get(ApiRequest::parse("https://api.example.com/tracks/1")?)
//!         .await;
//!
//!     if let Some(track) = track {
//!         println!("{}: {}", track.id, track.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several sub-modules:
//!
//! - `types`: request descriptors, parameter maps, sessions, wire formats
//! - `error`: the four-kind call error taxonomy plus flow and config errors
//! - `transport`: the outgoing-request seam with reqwest and mock backends
//! - `cache`: the cost-bounded response cache and its keys
//! - `auth`: authentication state applied to outgoing requests
//! - `flows`: provider descriptors and the authorization-code login flow
//! - `client`: the engine combining all of the above
//! - `config`: engine configuration and its builder
//! - `telemetry`: the logger collaborator and test loggers

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod flows;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export the engine
pub use client::{ApiClient, ApiClientBuilder, RequestHandle, SubscriptionId};

// Re-export configuration
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

// Re-export errors
pub use error::{
    ApiError, ApiResult, AuthorizationUiError, ConfigError, OauthError, TransportError,
};

// Re-export request and session types
pub use types::{
    params_from_pairs, ApiRequest, BearerSession, Method, NoContent, ParamValue, Params,
    PostEncoding, TokenGrant,
};

// Re-export authentication
pub use auth::{AuthStatus, Authentication, RequestConfigurator};

// Re-export the cache
pub use cache::{CacheKey, CacheStats, ResponseCache, DEFAULT_COST_LIMIT};

// Re-export the transport seam
pub use transport::{
    HttpTransport, HttpVerb, MockTransport, ReqwestTransport, TransportRequest,
    TransportResponse,
};

// Re-export the login flow
pub use flows::{
    AuthorizationUi, ClientAuthMethod, MockAuthorizationUi, OauthLogin, OauthProvider,
};

// Re-export telemetry
pub use telemetry::{ConsoleLogger, InMemoryLogger, LogEntry, LogLevel, Logger, NoOpLogger};
