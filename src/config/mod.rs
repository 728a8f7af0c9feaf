//! Engine configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::cache::ResponseCache;
use crate::error::ConfigError;
use crate::telemetry::Logger;
use crate::types::PostEncoding;

/// User agent presented on every request unless overridden in config.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 13_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/12.1 Mobile/15E148 Safari/604.1";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything an engine needs besides its transport.
#[derive(Clone)]
pub struct ClientConfig {
    /// User agent header value.
    pub user_agent: String,
    /// Per-request deadline.
    pub timeout: Duration,
    /// Body encoding for POST and PUT parameters.
    pub encoding: PostEncoding,
    /// Shared response cache. Without one, cache-eligible calls behave as
    /// cache-disabled.
    pub cache: Option<Arc<ResponseCache>>,
    /// Optional logger collaborator.
    pub logger: Option<Arc<dyn Logger>>,
    /// Runtime handle callback work is spawned on. Defaults to the handle
    /// current when the engine is built.
    pub runtime: Option<Handle>,
}

impl ClientConfig {
    /// Start a builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            encoding: PostEncoding::Json,
            cache: None,
            logger: None,
            runtime: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("encoding", &self.encoding)
            .field("cache", &self.cache.as_ref().map(|c| c.stats()))
            .field("logger", &self.logger.as_ref().map(|_| "Logger"))
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Fluent builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    user_agent: Option<String>,
    timeout: Option<Duration>,
    encoding: Option<PostEncoding>,
    cache: Option<Arc<ResponseCache>>,
    logger: Option<Arc<dyn Logger>>,
    runtime: Option<Handle>,
}

impl ClientConfigBuilder {
    /// Fresh builder with every field defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Override the per-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the POST/PUT body encoding.
    pub fn encoding(mut self, encoding: PostEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Attach a shared response cache.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a logger collaborator.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Pin the runtime handle callback work is spawned on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate and produce the config.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        if user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(ClientConfig {
            user_agent,
            timeout,
            encoding: self.encoding.unwrap_or_default(),
            cache: self.cache,
            logger: self.logger,
            runtime: self.runtime,
        })
    }
}
