//! The request engine.
//!
//! [`ApiClient`] dispatches typed calls over an [`HttpTransport`], probing
//! and populating the response cache for eligible GETs, injecting
//! authentication, classifying failures, and fanning failures out to
//! per-call one-shot subscriptions.
//!
//! Every call is available in two equivalent surface forms: an async form
//! that resolves to `Option<T>`, and a callback form that spawns onto the
//! engine's runtime handle and hands back an abortable [`RequestHandle`].
//! The async form is exactly "await the callback form's single delivery".

mod failures;

use std::any::{type_name, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use url::form_urlencoded;

use crate::auth::{AuthStatus, Authentication};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::error::{ApiError, ConfigError};
use crate::telemetry::Logger;
use crate::transport::{HttpTransport, ReqwestTransport, TransportRequest};
use crate::types::{ApiRequest, Method, NoContent, Params, PostEncoding};

pub use failures::SubscriptionId;
pub(crate) use failures::FailureHub;

struct ClientInner {
    user_agent: String,
    timeout: Duration,
    encoding: PostEncoding,
    transport: Arc<dyn HttpTransport>,
    cache: Option<Arc<ResponseCache>>,
    logger: Option<Arc<dyn Logger>>,
    runtime: Handle,
    auth: RwLock<Authentication>,
    will_change: Mutex<Vec<Arc<dyn Fn() + Send + Sync>>>,
    // Failure hub of the most recently issued call.
    recent_failures: Mutex<Arc<FailureHub>>,
    login_seq: AtomicU64,
    active_login: Mutex<u64>,
}

/// The client engine. Cheap to clone; clones share cache, authentication,
/// and subscription state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Engine over the production reqwest transport.
    ///
    /// Must run inside a Tokio runtime unless the config pins one.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(ReqwestTransport::new(config.timeout)?);
        Self::with_transport(config, transport)
    }

    /// Engine over a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        let runtime = match config.runtime.clone() {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        Ok(Self {
            inner: Arc::new(ClientInner {
                user_agent: config.user_agent,
                timeout: config.timeout,
                encoding: config.encoding,
                transport,
                cache: config.cache,
                logger: config.logger,
                runtime,
                auth: RwLock::new(Authentication::None),
                will_change: Mutex::new(Vec::new()),
                recent_failures: Mutex::new(Arc::new(FailureHub::new())),
                login_seq: AtomicU64::new(0),
                active_login: Mutex::new(0),
            }),
        })
    }

    /// Start a builder.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    // ---- typed async surface ------------------------------------------

    /// GET with the cache enabled.
    pub async fn get<T>(&self, request: ApiRequest) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.perform(request, Method::Get { use_cache: true }).await
    }

    /// GET bypassing the cache in both directions.
    pub async fn get_uncached<T>(&self, request: ApiRequest) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.perform(request, Method::Get { use_cache: false }).await
    }

    /// GET delivering the raw JSON document.
    pub async fn get_raw(&self, request: ApiRequest) -> Option<serde_json::Value> {
        self.get(request).await
    }

    /// POST with an optional parameter body.
    pub async fn post<T>(&self, request: ApiRequest, params: Option<Params>) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.perform(request, Method::Post(params)).await
    }

    /// PUT with an optional parameter body.
    pub async fn put<T>(&self, request: ApiRequest, params: Option<Params>) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.perform(request, Method::Put(params)).await
    }

    /// DELETE.
    pub async fn delete<T>(&self, request: ApiRequest) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.perform(request, Method::Delete).await
    }

    /// Issue a call and await its single delivery.
    ///
    /// Failures are never returned here; they go to the call's failure
    /// subscriptions and the logger, and the delivery is `None`.
    pub async fn perform<T>(&self, request: ApiRequest, method: Method) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let hub = self.begin_call();
        self.run(request, method, hub).await
    }

    // ---- callback surface ---------------------------------------------

    /// GET with the cache enabled, delivering through `on_fetched`.
    pub fn get_with<T, F>(&self, request: ApiRequest, on_fetched: F) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Option<T>) + Send + 'static,
    {
        self.perform_with(request, Method::Get { use_cache: true }, on_fetched)
    }

    /// POST delivering through `on_fetched`.
    pub fn post_with<T, F>(
        &self,
        request: ApiRequest,
        params: Option<Params>,
        on_fetched: F,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Option<T>) + Send + 'static,
    {
        self.perform_with(request, Method::Post(params), on_fetched)
    }

    /// PUT delivering through `on_fetched`.
    pub fn put_with<T, F>(
        &self,
        request: ApiRequest,
        params: Option<Params>,
        on_fetched: F,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Option<T>) + Send + 'static,
    {
        self.perform_with(request, Method::Put(params), on_fetched)
    }

    /// DELETE delivering through `on_fetched`.
    pub fn delete_with<T, F>(&self, request: ApiRequest, on_fetched: F) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Option<T>) + Send + 'static,
    {
        self.perform_with(request, Method::Delete, on_fetched)
    }

    /// Issue a call on the engine's runtime handle and return immediately.
    ///
    /// `on_fetched` receives exactly one delivery unless the handle is
    /// cancelled first. Dropping the handle detaches the call; it keeps
    /// running.
    pub fn perform_with<T, F>(
        &self,
        request: ApiRequest,
        method: Method,
        on_fetched: F,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Option<T>) + Send + 'static,
    {
        let hub = self.begin_call();
        let failures = Arc::clone(&hub);
        let client = self.clone();
        let task = self.inner.runtime.spawn(async move {
            let value = client.run(request, method, failures).await;
            on_fetched(value);
        });
        RequestHandle {
            task,
            failures: hub,
        }
    }

    // ---- failure reporting --------------------------------------------

    /// Register a one-shot failure callback on the most recently issued
    /// call.
    ///
    /// All callbacks registered on a call fire together on its single
    /// failure, then they are gone; registering after the failure is a
    /// no-op that still returns an id.
    pub fn on_failure(
        &self,
        callback: impl FnOnce(&ApiError) + Send + 'static,
    ) -> SubscriptionId {
        let hub = Arc::clone(&self.inner.recent_failures.lock().unwrap());
        hub.subscribe(Box::new(callback))
    }

    // ---- authentication -----------------------------------------------

    /// Install new authentication state.
    ///
    /// Will-change observers run before the new value is visible.
    pub fn set_authentication(&self, authentication: Authentication) {
        self.notify_will_change();
        *self.inner.auth.write().unwrap() = authentication;
    }

    /// Snapshot of the current authentication state.
    pub fn authentication(&self) -> Authentication {
        self.inner.auth.read().unwrap().clone()
    }

    /// Status derived from the current authentication state.
    pub fn authentication_status(&self) -> AuthStatus {
        self.inner.auth.read().unwrap().status()
    }

    /// Reset authentication to none. Idempotent.
    pub fn de_authenticate(&self) {
        self.set_authentication(Authentication::None);
    }

    /// Observe authentication assignments. The observer runs on every
    /// assignment, before the new state becomes visible.
    pub fn on_authentication_will_change(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.inner.will_change.lock().unwrap().push(Arc::new(observer));
    }

    fn notify_will_change(&self) {
        let observers: Vec<_> = self
            .inner
            .will_change
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .collect();
        for observer in observers {
            observer();
        }
    }

    // ---- internals ----------------------------------------------------

    fn begin_call(&self) -> Arc<FailureHub> {
        let hub = Arc::new(FailureHub::new());
        *self.inner.recent_failures.lock().unwrap() = Arc::clone(&hub);
        hub
    }

    async fn run<T>(
        &self,
        request: ApiRequest,
        method: Method,
        failures: Arc<FailureHub>,
    ) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.try_perform(&request, &method).await {
            Ok(value) => value,
            Err(error) => {
                if let Some(logger) = &self.inner.logger {
                    logger.error(&error);
                }
                failures.report(&error);
                None
            }
        }
    }

    /// The classified pipeline. Used directly by the login flow, which
    /// wants the error instead of the fan-out.
    pub(crate) async fn try_perform<T>(
        &self,
        request: &ApiRequest,
        method: &Method,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let verb = method.verb();
        self.log_info(&format!(
            "{} {} as {}",
            verb,
            request.url,
            type_name::<T>()
        ));

        let cache_key = CacheKey::for_request(request);
        let cache = self
            .inner
            .cache
            .as_ref()
            .filter(|_| method.is_cache_eligible());
        if let Some(cache) = cache {
            if let Some(bytes) = cache.get(&cache_key) {
                if let Ok(value) = serde_json::from_slice::<T>(&bytes) {
                    self.log_debug(&format!("{} {} served from cache", verb, request.url));
                    return Ok(Some(value));
                }
                // Undecodable hit: treat as a miss and go to the network.
            }
        }

        let outgoing = self.build_transport_request(request, method);
        let response = self
            .inner
            .transport
            .send(outgoing)
            .await
            .map_err(ApiError::from)?;

        if !response.is_success() {
            return Err(ApiError::from_status(&response));
        }
        if TypeId::of::<T>() == TypeId::of::<NoContent>() {
            self.log_debug(&format!("{} {} done, no content expected", verb, request.url));
            return Ok(None);
        }
        if response.body.is_empty() {
            self.log_debug(&format!("{} {} done with empty body", verb, request.url));
            return Ok(None);
        }

        match serde_json::from_slice::<T>(&response.body) {
            Ok(value) => {
                if let Some(cache) = cache {
                    cache.put(cache_key, response.body.clone());
                }
                self.log_debug(&format!(
                    "{} {} done as {}",
                    verb,
                    request.url,
                    type_name::<T>()
                ));
                Ok(Some(value))
            }
            Err(_) => Err(ApiError::from_undecodable(&response.body)),
        }
    }

    fn build_transport_request(&self, request: &ApiRequest, method: &Method) -> TransportRequest {
        let mut outgoing = TransportRequest::new(method.verb(), request.url.clone());
        outgoing.timeout = Some(self.inner.timeout);
        outgoing.set_header("User-Agent", self.inner.user_agent.clone());
        for (name, value) in request.headers() {
            outgoing.set_header(name.clone(), value.clone());
        }

        if let Some(params) = method.params() {
            match self.inner.encoding {
                PostEncoding::Json => {
                    if let Ok(body) = serde_json::to_vec(params) {
                        outgoing.body = Some(Bytes::from(body));
                        outgoing.set_header("Content-Type", PostEncoding::Json.content_type());
                    }
                }
                PostEncoding::Form => {
                    let mut serializer = form_urlencoded::Serializer::new(String::new());
                    for (key, value) in params {
                        serializer.append_pair(key, &value.form_value());
                    }
                    outgoing.body = Some(Bytes::from(serializer.finish()));
                    outgoing.set_header("Content-Type", PostEncoding::Form.content_type());
                }
            }
        }

        // Authentication last, so it wins over descriptor headers.
        self.inner.auth.read().unwrap().apply(&mut outgoing);
        outgoing
    }

    fn log_info(&self, message: &str) {
        if let Some(logger) = &self.inner.logger {
            logger.info(message);
        }
    }

    fn log_debug(&self, message: &str) {
        if let Some(logger) = &self.inner.logger {
            logger.debug(message);
        }
    }

    // ---- login flow support -------------------------------------------

    /// Mark a new login flow as the active one, superseding any pending
    /// flow, and return its identity.
    pub(crate) fn begin_login(&self) -> u64 {
        let id = self.inner.login_seq.fetch_add(1, Ordering::Relaxed) + 1;
        *self.inner.active_login.lock().unwrap() = id;
        id
    }

    /// Identity check at flow completion. Returns false when the flow was
    /// superseded; a stale flow must then change nothing and call nothing.
    pub(crate) fn finish_login(&self, id: u64) -> bool {
        let mut active = self.inner.active_login.lock().unwrap();
        if *active != id {
            return false;
        }
        *active = 0;
        true
    }

    pub(crate) fn runtime_handle(&self) -> &Handle {
        &self.inner.runtime
    }

    pub(crate) fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.inner.transport)
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }
}

/// Handle to a call issued through the callback surface.
pub struct RequestHandle {
    task: JoinHandle<()>,
    failures: Arc<FailureHub>,
}

impl RequestHandle {
    /// Register a one-shot failure callback scoped to this call.
    pub fn on_failure(
        &self,
        callback: impl FnOnce(&ApiError) + Send + 'static,
    ) -> SubscriptionId {
        self.failures.subscribe(Box::new(callback))
    }

    /// Cancel the call. A cancelled call invokes no callback and writes no
    /// cache entry.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the call has delivered or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the call has delivered or been cancelled.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Builder for [`ApiClient`], mirroring the config builder and adding the
/// transport.
#[derive(Default)]
pub struct ApiClientBuilder {
    config: ClientConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ApiClientBuilder {
    /// Fresh builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.user_agent(user_agent);
        self
    }

    /// Override the per-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the POST/PUT body encoding.
    pub fn encoding(mut self, encoding: PostEncoding) -> Self {
        self.config = self.config.encoding(encoding);
        self
    }

    /// Attach a shared response cache.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.config = self.config.cache(cache);
        self
    }

    /// Attach a logger collaborator.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.config = self.config.logger(logger);
        self
    }

    /// Pin the runtime handle callback work is spawned on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.config = self.config.runtime(runtime);
        self
    }

    /// Swap in a transport, usually a mock.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate config and build the engine.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        let config = self.config.build()?;
        match self.transport {
            Some(transport) => ApiClient::with_transport(config, transport),
            None => ApiClient::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpVerb;
    use crate::types::params_from_pairs;

    fn client_with(encoding: PostEncoding) -> ApiClient {
        ApiClient::builder()
            .encoding(encoding)
            .transport(Arc::new(crate::transport::MockTransport::new()))
            .build()
            .unwrap()
    }

    fn request() -> ApiRequest {
        ApiRequest::parse("https://api.example.com/items").unwrap()
    }

    #[test]
    fn construction_outside_a_runtime_needs_a_handle() {
        let result = ApiClient::builder()
            .transport(Arc::new(crate::transport::MockTransport::new()))
            .build();
        assert!(matches!(result, Err(ConfigError::NoRuntime)));
    }

    #[tokio::test]
    async fn built_request_carries_user_agent_and_descriptor_headers() {
        let client = client_with(PostEncoding::Json);
        let outgoing = client.build_transport_request(
            &request().with_header("X-Trace", "t-1"),
            &Method::Get { use_cache: true },
        );
        assert_eq!(outgoing.method, HttpVerb::Get);
        assert_eq!(
            outgoing.header("User-Agent"),
            Some(crate::config::DEFAULT_USER_AGENT)
        );
        assert_eq!(outgoing.header("X-Trace"), Some("t-1"));
        assert_eq!(outgoing.body, None);
    }

    #[tokio::test]
    async fn json_params_become_a_json_body() {
        let client = client_with(PostEncoding::Json);
        let outgoing = client.build_transport_request(
            &request(),
            &Method::Post(Some(params_from_pairs([("a", "b")]))),
        );
        assert_eq!(outgoing.header("Content-Type"), Some("application/json"));
        assert_eq!(outgoing.body, Some(Bytes::from_static(br#"{"a":"b"}"#)));
    }

    #[tokio::test]
    async fn form_params_become_percent_encoded_pairs() {
        let client = client_with(PostEncoding::Form);
        let outgoing = client.build_transport_request(
            &request(),
            &Method::Post(Some(params_from_pairs([
                ("redirect", "https://app.example.com/done"),
                ("scope", "a b"),
            ]))),
        );
        assert_eq!(
            outgoing.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        let body = String::from_utf8(outgoing.body.unwrap().to_vec()).unwrap();
        assert_eq!(
            body,
            "redirect=https%3A%2F%2Fapp.example.com%2Fdone&scope=a+b"
        );
    }

    #[tokio::test]
    async fn bearer_authentication_overrides_descriptor_authorization() {
        let client = client_with(PostEncoding::Json);
        client.set_authentication(Authentication::Bearer(
            crate::types::BearerSession::new("fresh"),
        ));
        let outgoing = client.build_transport_request(
            &request().with_header("Authorization", "Bearer stale"),
            &Method::Get { use_cache: false },
        );
        assert_eq!(outgoing.header("Authorization"), Some("Bearer fresh"));
    }

    #[tokio::test]
    async fn will_change_observers_run_before_the_new_state_is_visible() {
        let client = client_with(PostEncoding::Json);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let observer_view = client.clone();
        client.on_authentication_will_change(move || {
            sink.lock().unwrap().push(observer_view.authentication_status());
        });

        client.set_authentication(Authentication::Bearer(
            crate::types::BearerSession::new("token"),
        ));
        client.de_authenticate();

        // Each observation saw the state as it was before the assignment.
        assert_eq!(
            *observed.lock().unwrap(),
            vec![AuthStatus::Unauthenticated, AuthStatus::Authenticated]
        );
        assert_eq!(
            client.authentication_status(),
            AuthStatus::Unauthenticated
        );
    }

    #[tokio::test]
    async fn each_issued_call_rotates_the_recent_failure_hub() {
        let client = client_with(PostEncoding::Json);
        let first = client.begin_call();
        let second = client.begin_call();
        assert!(!Arc::ptr_eq(&first, &second));
        let recent = Arc::clone(&client.inner.recent_failures.lock().unwrap());
        assert!(Arc::ptr_eq(&second, &recent));
    }

    #[tokio::test]
    async fn login_identity_check_rejects_superseded_flows() {
        let client = client_with(PostEncoding::Json);
        let first = client.begin_login();
        let second = client.begin_login();
        assert!(!client.finish_login(first));
        assert!(client.finish_login(second));
        // Completing twice is also stale.
        assert!(!client.finish_login(second));
    }
}
