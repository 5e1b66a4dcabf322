//! Request routing: which spawned worker serves a request.
//!
//! - [`RoutingPolicy`] pure selection over the spawned workers
//!   ([`StickyRoundRobin`] by default, [`RoundRobin`])
//! - [`RequestRouter`] the seam front doors route through (implemented by [`Pool`](crate::Pool))
//! - [`sticky`] long-polling session ids and their numeric decoding

mod policy;
pub mod sticky;

pub use policy::{RequestMeta, RequestRouter, RouteTarget, RoundRobin, RoutingPolicy, StickyRoundRobin};
