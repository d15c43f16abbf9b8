use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    types::UpstreamConfig,
    upstream::{
        endpoint::{EndpointStats, UpstreamEndpoint},
        errors::UpstreamError,
    },
};

/// Counters for the balancer and each of its upstreams.
#[derive(Debug, Clone)]
pub struct LoadBalancerStats {
    pub total_upstreams: usize,
    pub total_selections: usize,
    pub upstreams: Vec<EndpointStats>,
}

/// Strict round-robin selection over a fixed list of upstreams.
///
/// The list is set once at construction and never changes. A single atomic
/// counter drives selection: each call to [`next`](Self::next) takes the counter's
/// previous value modulo the list length, so the first request goes to index 0,
/// the second to index 1, and so on. Over any window of `k * n` consecutive
/// selections every upstream is chosen exactly `k` times, whatever the
/// interleaving of callers. The counter wraps at `usize::MAX` without failing.
///
/// Health is not considered; an unreachable upstream still receives its share.
pub struct LoadBalancer {
    upstreams: Vec<Arc<UpstreamEndpoint>>,
    current_index: AtomicUsize,
}

impl LoadBalancer {
    /// Creates a balancer over `configs`, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::NoUpstreams`] if `configs` is empty.
    pub fn new(configs: Vec<UpstreamConfig>) -> Result<Self, UpstreamError> {
        Self::starting_at(configs, 0)
    }

    fn starting_at(configs: Vec<UpstreamConfig>, start: usize) -> Result<Self, UpstreamError> {
        if configs.is_empty() {
            return Err(UpstreamError::NoUpstreams);
        }

        let upstreams = configs.into_iter().map(|c| Arc::new(UpstreamEndpoint::new(c))).collect();
        Ok(Self { upstreams, current_index: AtomicUsize::new(start) })
    }

    /// Returns the next upstream in rotation.
    #[must_use]
    pub fn next(&self) -> Arc<UpstreamEndpoint> {
        let upstream_count = self.upstreams.len();
        let index = self.current_index.fetch_add(1, Ordering::Relaxed) % upstream_count;

        tracing::trace!(
            current_index = index,
            total_upstreams = upstream_count,
            "selecting upstream"
        );

        let upstream = &self.upstreams[index];
        upstream.record_selection();
        Arc::clone(upstream)
    }

    /// Upstreams in configured order.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<UpstreamEndpoint>] {
        &self.upstreams
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    /// Always `false`; construction rejects an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }

    #[must_use]
    pub fn get_stats(&self) -> LoadBalancerStats {
        LoadBalancerStats {
            total_upstreams: self.upstreams.len(),
            total_selections: self.current_index.load(Ordering::Relaxed),
            upstreams: self.upstreams.iter().map(|u| u.stats()).collect(),
        }
    }
}
