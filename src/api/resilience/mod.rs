//! Retry and request logging for Jamf and webhook traffic

pub mod logging;
pub mod retry;

pub use logging::RequestContext;
pub use retry::{
    RetryConfig, RetryPolicy, StatusPredicate, Verdict, conflict_is_done, standard, success_only,
};
