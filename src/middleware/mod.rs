// Middleware modules
pub mod logging;
pub mod rate_limit;
pub mod tenant;

// Export tenant resolution
pub use tenant::{tenant_middleware, TENANT_HEADER};

// Export check-in rate limiter
pub use rate_limit::{CheckInRateLimiter, RateLimitConfig};

// Export logging middleware
pub use logging::logging_middleware;
