pub mod rate_limit;
pub mod response;
pub mod security;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use response::{ApiResponse, ApiResult, Listing};
pub use security::{response_time_middleware, with_security_headers};
