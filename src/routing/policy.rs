//! # Worker selection.
//!
//! [`RoutingPolicy`] picks an index into the list of spawned workers. The
//! supervisor owns the list and the round-robin cursor and passes both in; a
//! policy never sees workers that are not ready.
//!
//! The cursor is `None` after any membership change, so the next round-robin
//! pick starts from the front of the list.

use std::net::SocketAddr;

use async_trait::async_trait;

use super::sticky;
use crate::core::WorkerId;
use crate::error::PoolError;

/// What the front door knows about an incoming request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Request path (including the query string), empty if unknown.
    pub path: String,
    /// Client address.
    pub remote: Option<SocketAddr>,
}

impl RequestMeta {
    /// Metadata for a request to `path`.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            remote: None,
        }
    }
}

/// Worker chosen for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteTarget {
    /// Selected worker.
    pub worker: WorkerId,
    /// Address the worker listens on.
    pub addr: SocketAddr,
}

/// Selection over the spawned workers.
pub trait RoutingPolicy: Send + Sync + 'static {
    /// Returns an index `< len`, or `None` when `len == 0`.
    ///
    /// `cursor` is the last index served by round-robin (`None` = start over).
    fn select(&self, meta: &RequestMeta, len: usize, cursor: &mut Option<usize>) -> Option<usize>;
}

/// Default policy: sticky for long-polling sessions, round-robin otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct StickyRoundRobin;

impl RoutingPolicy for StickyRoundRobin {
    fn select(&self, meta: &RequestMeta, len: usize, cursor: &mut Option<usize>) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if let Some(id) = sticky::session_id(&meta.path) {
            return Some(sticky::bucket(id, len));
        }
        Some(round_robin(len, cursor))
    }
}

/// Plain round-robin, ignoring request metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobin;

impl RoutingPolicy for RoundRobin {
    fn select(&self, _meta: &RequestMeta, len: usize, cursor: &mut Option<usize>) -> Option<usize> {
        (len > 0).then(|| round_robin(len, cursor))
    }
}

fn round_robin(len: usize, cursor: &mut Option<usize>) -> usize {
    let next = match *cursor {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    };
    *cursor = Some(next);
    next
}

/// Something that can pick a worker for a request.
///
/// [`Pool`](crate::Pool) is the default implementation; front doors depend on
/// this trait so routing can be substituted (or faked in tests).
#[async_trait]
pub trait RequestRouter: Send + Sync {
    /// Picks a worker; may wait until one is spawned.
    async fn route(&self, meta: &RequestMeta) -> Result<RouteTarget, PoolError>;
}
