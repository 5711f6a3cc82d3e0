//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns route-scoped orchestration; access control lives in the
//! `components` wrappers the route table puts around them.

pub mod admin;
pub mod admin_login;
pub mod home;
pub mod login;
pub mod profile;
