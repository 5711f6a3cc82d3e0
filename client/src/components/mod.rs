//! Route-level wrappers built on the core guards and redirect resolver.

pub mod legacy_profile_redirect;
pub mod require_admin;
pub mod require_auth;
