use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::error::ErrorBody;

/// Process-wide token bucket guarding the speech endpoints.
///
/// Refills at `per_second` tokens per second with a burst cap of the same
/// size, so at most `per_second` requests pass in any instant.
#[derive(Clone)]
pub struct GatewayRateLimiter {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    clock: DefaultClock,
    per_second: u32,
}

impl GatewayRateLimiter {
    pub fn new(per_second: u32) -> Self {
        let rate = NonZeroU32::new(per_second.max(1)).unwrap();
        let quota = Quota::per_second(rate).allow_burst(rate);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            clock: DefaultClock::default(),
            per_second: rate.get(),
        }
    }

    /// Allow one request, or report how long until the bucket refills.
    pub fn check(&self) -> Result<(), Duration> {
        match self.limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => Err(not_until.wait_time_from(self.clock.now())),
        }
    }

    pub fn per_second(&self) -> u32 {
        self.per_second
    }
}

/// Middleware returning 429 with Retry-After when the bucket is empty.
pub async fn rate_limit_middleware(
    State(limiter): State<GatewayRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(wait) => {
            let retry_after = wait.as_secs().max(1);

            tracing::warn!(
                "rate limit exceeded (retry after {} seconds)",
                retry_after
            );

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody::new(
                    "Too many requests, please slow down",
                    "rate_limit_error",
                    "rate_limit_exceeded",
                )),
            )
                .into_response();

            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }

            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_burst_within_cap() {
        let limiter = GatewayRateLimiter::new(5);

        for i in 0..5 {
            assert!(limiter.check().is_ok(), "request {} should pass", i);
        }
    }

    #[test]
    fn test_rejects_over_cap() {
        let limiter = GatewayRateLimiter::new(3);

        for _ in 0..3 {
            assert!(limiter.check().is_ok());
        }

        let result = limiter.check();
        assert!(result.is_err());
        if let Err(wait) = result {
            assert!(wait > Duration::from_millis(0));
        }
    }

    #[test]
    fn test_zero_rate_clamped_to_one() {
        let limiter = GatewayRateLimiter::new(0);
        assert_eq!(limiter.per_second(), 1);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_clones_share_bucket() {
        let limiter = GatewayRateLimiter::new(2);
        let clone = limiter.clone();

        assert!(limiter.check().is_ok());
        assert!(clone.check().is_ok());
        assert!(limiter.check().is_err());
        assert!(clone.check().is_err());
    }
}
