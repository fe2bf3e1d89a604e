pub mod rate_limit;

pub use rate_limit::{Admission, FallbackPolicy, RateLimiter};
