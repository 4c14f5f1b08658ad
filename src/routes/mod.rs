/// Router Module Index
///
/// Splits the routing table by access level. Session enforcement happens per
/// handler through the `Session` extractor, so the split is for readability.

/// Routes open to anonymous clients (health checks).
pub mod public;

/// Todo routes. Every handler here takes a `Session`.
pub mod authenticated;
