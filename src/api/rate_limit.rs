//! Per-IP rate limiting for the REST endpoints.
//!
//! Ingest and query carry separate quotas. Limiters are created lazily per
//! (ip, route class) pair; `DashMap` keeps lookups lock-free.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Which request quota applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Ingest,
    Query,
}

pub struct IpRateLimiter {
    events_per_min: u32,
    query_per_min: u32,
    limiters: DashMap<(IpAddr, RouteClass), Arc<DefaultDirectRateLimiter>>,
}

impl IpRateLimiter {
    pub fn new(events_per_min: u32, query_per_min: u32) -> Self {
        Self {
            events_per_min,
            query_per_min,
            limiters: DashMap::new(),
        }
    }

    /// Check the caller's quota. `Err(retry_after_secs)` when exhausted.
    pub fn check(&self, ip: IpAddr, class: RouteClass) -> Result<(), u64> {
        let limiter = self
            .limiters
            .entry((ip, class))
            .or_insert_with(|| {
                let per_minute = match class {
                    RouteClass::Ingest => self.events_per_min,
                    RouteClass::Query => self.query_per_min,
                };
                let quota = Quota::per_minute(
                    NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN),
                );
                Arc::new(RateLimiter::direct(quota))
            })
            .clone();

        match limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let retry_after = not_until
                    .wait_time_from(DefaultClock::default().now())
                    .as_secs()
                    .max(1);
                Err(retry_after)
            }
        }
    }
}
