use bytes::Bytes;
use std::sync::Arc;

use crate::{
    cache::{derive_cache_key, ResponseCache},
    types::{CacheStatus, ProxyResponse, UpstreamReply},
    upstream::{HttpClient, LoadBalancer, UpstreamEndpoint},
};

use super::errors::ProxyError;

/// The only HTTP method the proxy answers.
pub const ALLOWED_HTTP_METHOD: &str = "POST";

/// Shared references used while dispatching a request.
#[derive(Clone)]
pub struct SharedContext {
    pub response_cache: Arc<ResponseCache>,
    pub load_balancer: Arc<LoadBalancer>,
    pub http_client: Arc<HttpClient>,
    /// Store upstream replies that carry an error as well as successful ones.
    pub cache_error_responses: bool,
}

/// A reply from the upstream that served it.
#[derive(Debug)]
pub struct ForwardedReply {
    pub upstream: Arc<UpstreamEndpoint>,
    pub reply: UpstreamReply,
    /// Non-2xx status or a top-level JSON-RPC `error`, classified once per reply.
    pub is_error: bool,
}

impl SharedContext {
    /// Sends `body` verbatim to the next upstream in rotation.
    ///
    /// A reply with any HTTP status is returned as `Ok`; only the absence of a
    /// reply is an error.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Upstream` if the transport fails, times out, or is closed.
    pub async fn forward_to_upstream(&self, body: Bytes) -> Result<ForwardedReply, ProxyError> {
        let upstream = self.load_balancer.next();

        match self.http_client.send_request(upstream.url(), body).await {
            Ok(reply) => {
                let is_error = reply.is_error();
                upstream.record_reply(is_error);
                if is_error {
                    tracing::debug!(
                        upstream = %upstream.name(),
                        status = reply.status,
                        "upstream replied with an error"
                    );
                }
                Ok(ForwardedReply { upstream, reply, is_error })
            }
            Err(e) => {
                upstream.record_failure();
                tracing::warn!(upstream = %upstream.name(), error = %e, "upstream request failed");
                Err(e.into())
            }
        }
    }

    fn should_cache(&self, is_error: bool) -> bool {
        self.cache_error_responses || !is_error
    }
}

/// Request dispatcher: cache lookup, then forward and store on a miss.
///
/// ```text
/// (method, body) ──► POST? ──no──► MethodNotAllowed
///                      │
///                      ▼
///               parse + derive key ──fail──► MalformedRequest
///                      │
///                      ▼
///               cache lookup ──hit──► cached body (HIT)
///                      │ miss
///                      ▼
///               next upstream ──► forward ──fail──► Upstream error (not cached)
///                      │
///                      ▼
///               store reply, return body (MISS)
/// ```
///
/// Two concurrent misses for the same key both forward; the later store wins.
pub struct ProxyEngine {
    ctx: Arc<SharedContext>,
}

impl ProxyEngine {
    #[must_use]
    pub fn new(
        response_cache: Arc<ResponseCache>,
        load_balancer: Arc<LoadBalancer>,
        http_client: Arc<HttpClient>,
        cache_error_responses: bool,
    ) -> Self {
        let ctx = Arc::new(SharedContext {
            response_cache,
            load_balancer,
            http_client,
            cache_error_responses,
        });
        Self { ctx }
    }

    /// Answers one client request.
    ///
    /// The forwarded body is the client's original bytes, not a re-serialization,
    /// and the returned body is the upstream's bytes, not a re-serialization.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::MethodNotAllowed`] if `http_method` is not `POST`
    /// - [`ProxyError::MalformedRequest`] if the body is not a JSON object with a
    ///   string `method`
    /// - [`ProxyError::Upstream`] if the chosen upstream produced no reply
    pub async fn process_request(
        &self,
        http_method: &str,
        body: Bytes,
    ) -> Result<ProxyResponse, ProxyError> {
        if http_method != ALLOWED_HTTP_METHOD {
            return Err(ProxyError::MethodNotAllowed(http_method.to_string()));
        }

        let request: serde_json::Value = serde_json::from_slice(&body)?;
        let key = derive_cache_key(&request)?;

        if let Some(cached) = self.ctx.response_cache.lookup(&key) {
            tracing::debug!(method = key.method(), "cache hit");
            return Ok(ProxyResponse {
                body: cached,
                cache_status: CacheStatus::Hit,
                serving_upstream: None,
            });
        }

        let ForwardedReply { upstream, reply, is_error } =
            self.ctx.forward_to_upstream(body).await?;

        if self.ctx.should_cache(is_error) {
            self.ctx.response_cache.store(key, reply.body.clone());
        } else {
            tracing::debug!(
                method = key.method(),
                status = reply.status,
                "error reply not cached"
            );
        }

        Ok(ProxyResponse {
            body: reply.body,
            cache_status: CacheStatus::Miss,
            serving_upstream: Some(Arc::clone(upstream.name())),
        })
    }

    #[must_use]
    pub fn context(&self) -> &Arc<SharedContext> {
        &self.ctx
    }

    #[must_use]
    pub fn response_cache(&self) -> &Arc<ResponseCache> {
        &self.ctx.response_cache
    }

    #[must_use]
    pub fn load_balancer(&self) -> &Arc<LoadBalancer> {
        &self.ctx.load_balancer
    }

    #[must_use]
    pub fn http_client(&self) -> &Arc<HttpClient> {
        &self.ctx.http_client
    }
}
