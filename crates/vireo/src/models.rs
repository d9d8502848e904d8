//! The objects passed around by the agent loop: conversation messages,
//! their roles, and the typed chunks streamed to consumers. Each appended
//! message is immutable; the chunk union is the only surface a streaming
//! consumer ever sees.
pub mod chunk;
pub mod message;
pub mod role;
