//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: Strict limits for sign-in and token refresh (~10/min)
//! - `ai_rate_limiter`: Plan generation, which calls the model every time (~10/min)
//! - `api_rate_limiter`: `RATE_LIMIT_PER_MINUTE` for everything else

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

const MILLIS_PER_MINUTE: u64 = 60_000;

/// Key extractor that prefers proxy headers and falls back to the peer
/// address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req).ok_or(GovernorError::UnableToExtractKey)
    }
}

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// Best guess at the real client address.
///
/// Checks `CF-Connecting-IP`, the first hop of `X-Forwarded-For`, then
/// `X-Real-IP`, and finally the socket peer.
pub fn client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    header_ip(req, "cf-connecting-ip")
        .or_else(|| header_ip(req, "x-forwarded-for"))
        .or_else(|| header_ip(req, "x-real-ip"))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn per_minute(limit: u32) -> Option<RateLimiterLayer> {
    let limit = limit.max(1);
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_millisecond((MILLIS_PER_MINUTE / u64::from(limit)).max(1))
        .burst_size(limit)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

/// Rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Returns `None` only if governor rejects the configuration.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    per_minute(10)
}

/// Rate limiter for on-demand AI plans: ~10 requests per minute per IP.
#[must_use]
pub fn ai_rate_limiter() -> Option<RateLimiterLayer> {
    per_minute(10)
}

/// Rate limiter for the rest of the API, `limit` requests per minute per IP
/// with a burst of the same size.
#[must_use]
pub fn api_rate_limiter(limit: u32) -> Option<RateLimiterLayer> {
    per_minute(limit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/v1/domains/progress");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request(&[
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-forwarded-for", "198.51.100.1"),
        ]);
        assert_eq!(client_ip(&req), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_uses_first_hop() {
        let req = request(&[("x-forwarded-for", "198.51.100.1, 10.0.0.2")]);
        assert_eq!(client_ip(&req), Some("198.51.100.1".parse().unwrap()));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_ip(&req), Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_no_address_at_all() {
        assert_eq!(client_ip(&request(&[])), None);
    }

    #[test]
    fn test_limiters_build() {
        assert!(auth_rate_limiter().is_some());
        assert!(ai_rate_limiter().is_some());
        assert!(api_rate_limiter(60).is_some());
        assert!(api_rate_limiter(0).is_some());
    }
}
