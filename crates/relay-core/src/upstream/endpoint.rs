use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::types::UpstreamConfig;

/// Snapshot of the counters kept for one upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStats {
    pub name: Arc<str>,
    /// Times the balancer picked this upstream.
    pub selections: u64,
    /// Replies that came back, whatever their status.
    pub replies: u64,
    /// Replies with a non-2xx status or a JSON-RPC `error` member.
    pub error_replies: u64,
    /// Forwards that produced no reply at all.
    pub failures: u64,
}

/// One upstream RPC endpoint and its request counters.
///
/// Holds no connection state; all traffic goes through the shared
/// [`HttpClient`](super::HttpClient).
#[derive(Debug)]
pub struct UpstreamEndpoint {
    config: UpstreamConfig,
    selections: AtomicU64,
    replies: AtomicU64,
    error_replies: AtomicU64,
    failures: AtomicU64,
}

impl UpstreamEndpoint {
    #[must_use]
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            config,
            selections: AtomicU64::new(0),
            replies: AtomicU64::new(0),
            error_replies: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.config.name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    #[must_use]
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub(crate) fn record_selection(&self) {
        self.selections.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reply from this endpoint, already classified by the caller.
    pub fn record_reply(&self, is_error: bool) {
        self.replies.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.error_replies.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a forward that produced no reply.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn stats(&self) -> EndpointStats {
        EndpointStats {
            name: Arc::clone(&self.config.name),
            selections: self.selections.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
            error_replies: self.error_replies.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
