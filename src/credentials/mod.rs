//! Credential caching module
//!
//! Persists short-lived AWS credentials between invocations so that slow
//! upstream providers (SSO, assumed roles, external processes) are only
//! consulted when the cached credentials have expired.

mod file_cache;

pub use file_cache::*;
