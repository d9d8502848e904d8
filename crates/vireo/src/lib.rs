//! Bounded reason-then-act execution core: a conversation loop between a
//! model capability and a set of callable tools, streamed to the caller
//! as typed chunks and finished with a well-defined terminal result.
//!
//! The loop itself never raises for runtime conditions. Tool failures
//! feed back into the conversation; model failures, cancellation, and
//! timeouts end the run with `finish_reason = error`; callers inspect
//! the result rather than catch exceptions.
pub mod agent;
pub mod cancel;
pub mod errors;
pub mod executor;
pub mod hooks;
pub mod models;
pub mod providers;
pub mod result;
pub mod tool;
