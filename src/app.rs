use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{middleware, Extension, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::database::models::{Exec, Student, Teacher};
use crate::database::SharedStore;
use crate::handlers::{records, root, teachers};
use crate::middleware::{rate_limit_middleware, response_time_middleware, with_security_headers, RateLimiter};
use crate::record::Record;

/// Build the HTTP application around a storage backend
pub fn app(store: SharedStore, config: &AppConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(root::root))
        .route("/health", get(root::health))
        .merge(resource_routes::<Teacher>("/teachers"))
        .merge(teacher_routes())
        .merge(resource_routes::<Student>("/students"))
        .merge(resource_routes::<Exec>("/execs"))
        .layer(Extension(store));

    if config.api.enable_rate_limiting {
        let limiter = RateLimiter::new(
            config.api.rate_limit_requests,
            Duration::from_secs(config.api.rate_limit_window_secs),
        );
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    router = router.layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.api.enable_response_compression {
        router = router.layer(CompressionLayer::new());
    }

    if config.security.enable_security_headers {
        router = with_security_headers(router, config.security.require_https);
    }

    router = router.layer(middleware::from_fn(response_time_middleware));

    if config.security.enable_cors {
        router = router.layer(cors_layer(config));
    }

    router.layer(TraceLayer::new_for_http())
}

fn resource_routes<R: Record>(base: &str) -> Router {
    Router::new()
        .route(
            base,
            get(records::list::<R>)
                .post(records::create::<R>)
                .patch(records::patch_many::<R>)
                .delete(records::delete_many::<R>),
        )
        .route(
            &format!("{}/:id", base),
            get(records::get_one::<R>)
                .put(records::replace::<R>)
                .patch(records::patch_one::<R>)
                .delete(records::delete_one::<R>),
        )
}

fn teacher_routes() -> Router {
    Router::new()
        .route("/teachers/:id/students", get(teachers::students))
        .route("/teachers/:id/studentcount", get(teachers::student_count))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if config.is_development() || origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
