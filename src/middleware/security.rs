use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("x-content-type-options", "nosniff"),
    ("content-security-policy", "default-src 'self'"),
    ("referrer-policy", "no-referrer"),
    ("x-permitted-cross-domain-policies", "none"),
    ("cache-control", "no-store, no-cache, must-revalidate, max-age=0"),
    ("cross-origin-resource-policy", "same-origin"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("permissions-policy", "geolocation=(self), microphone=()"),
];

const HSTS: (&str, &str) = ("strict-transport-security", "max-age=63072000; includeSubDomains; preload");

/// Add the hardening response headers; HSTS only when HTTPS is required
pub fn with_security_headers(mut router: Router, require_https: bool) -> Router {
    let hsts = require_https.then_some(HSTS);
    for (name, value) in SECURITY_HEADERS.iter().copied().chain(hsts) {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    router
}

/// Stamp every response with `x-response-time`
pub async fn response_time_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = format!("{:.3}ms", started.elapsed().as_secs_f64() * 1000.0);
    if let Ok(value) = HeaderValue::from_str(&elapsed) {
        response.headers_mut().insert(HeaderName::from_static("x-response-time"), value);
    }
    response
}
