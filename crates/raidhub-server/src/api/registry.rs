//! Route registry and timed dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use raidhub_core::SessionId;
use serde_json::Value;
use tracing::{error, warn};

use super::context::ApiContext;
use super::errors::{self, ApiError};
use crate::metrics::{HTTP_ERRORS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

/// Calls slower than this are logged.
const SLOW_REQUEST: Duration = Duration::from_secs(2);

/// One API operation.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Run the operation for `caller` with the decoded JSON body.
    async fn handle(
        &self,
        caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError>;
}

/// Maps request paths to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    timeout: Duration,
}

impl MethodRegistry {
    /// Empty registry whose calls are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            timeout,
        }
    }

    /// Register `handler` under `method` (a request path such as
    /// `/fika/raid/create`).
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Run the handler for `method`.
    pub async fn dispatch(
        &self,
        method: &str,
        caller: Option<&SessionId>,
        params: Option<Value>,
        ctx: &ApiContext,
    ) -> Result<Value, ApiError> {
        let Some(handler) = self.handlers.get(method) else {
            counter!(HTTP_ERRORS_TOTAL, "method" => "unknown", "code" => errors::METHOD_NOT_FOUND)
                .increment(1);
            return Err(ApiError::NotFound {
                code: errors::METHOD_NOT_FOUND.into(),
                message: format!("No handler for '{method}'"),
            });
        };
        let label = method.to_owned();
        counter!(HTTP_REQUESTS_TOTAL, "method" => label.clone()).increment(1);

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, handler.handle(caller, params, ctx)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                error!(method, timeout = ?self.timeout, "handler timed out");
                Err(ApiError::Internal {
                    message: format!("Handler for '{method}' timed out"),
                })
            }
        };

        if let Err(err) = &result {
            counter!(HTTP_ERRORS_TOTAL, "method" => label.clone(), "code" => err.code().to_owned())
                .increment(1);
        }

        let duration = start.elapsed();
        histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => label).record(duration.as_secs_f64());
        if duration >= SLOW_REQUEST {
            warn!(method, duration_secs = duration.as_secs_f64(), "slow request");
        }

        result
    }

    /// Registered paths, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `method` has a handler.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_helpers::make_test_context;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(
            &self,
            caller: Option<&SessionId>,
            params: Option<Value>,
            _ctx: &ApiContext,
        ) -> Result<Value, ApiError> {
            Ok(json!({ "caller": caller, "params": params }))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl MethodHandler for FailHandler {
        async fn handle(
            &self,
            _caller: Option<&SessionId>,
            _params: Option<Value>,
            _ctx: &ApiContext,
        ) -> Result<Value, ApiError> {
            Err(ApiError::invalid_params("nope"))
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl MethodHandler for SlowHandler {
        async fn handle(
            &self,
            _caller: Option<&SessionId>,
            _params: Option<Value>,
            _ctx: &ApiContext,
        ) -> Result<Value, ApiError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn dispatch_passes_caller_and_params() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new(Duration::from_secs(5));
        reg.register("/echo", EchoHandler);

        let caller = SessionId::from("alice");
        let out = reg
            .dispatch("/echo", Some(&caller), Some(json!({"x": 1})), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!({"caller": "alice", "params": {"x": 1}}));
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let ctx = make_test_context();
        let reg = MethodRegistry::new(Duration::from_secs(5));
        let err = reg.dispatch("/nope", None, None, &ctx).await.unwrap_err();
        assert_eq!(err.code(), errors::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_error_is_returned() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new(Duration::from_secs(5));
        reg.register("/fail", FailHandler);
        let err = reg.dispatch("/fail", None, None, &ctx).await.unwrap_err();
        assert_eq!(err.code(), errors::INVALID_PARAMS);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out() {
        let ctx = make_test_context();
        let mut reg = MethodRegistry::new(Duration::from_secs(1));
        reg.register("/slow", SlowHandler);
        let err = reg.dispatch("/slow", None, None, &ctx).await.unwrap_err();
        assert_eq!(err.code(), errors::INTERNAL_ERROR);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn methods_are_sorted() {
        let mut reg = MethodRegistry::new(Duration::from_secs(1));
        reg.register("/b", EchoHandler);
        reg.register("/a", EchoHandler);
        assert_eq!(reg.methods(), vec!["/a", "/b"]);
        assert!(reg.has_method("/a"));
        assert!(!reg.has_method("/c"));
    }
}
