//! Route protection.
//!
//! ARCHITECTURE
//! ============
//! `route` gates user-facing views on the session store; `admin` gates admin
//! views on the locally persisted admin flag. The two are separate trust
//! domains and share nothing but the navigation and storage seams.

pub mod admin;
pub mod route;

pub use admin::{ADMIN_LOGIN_PATH, AdminDecision, AdminGuard, AdminSession};
pub use route::{Guarded, GuardDecision, LOGIN_PATH, RouteGuard, take_redirect_target};
