//! Hosted-backend calls made from the browser.

pub mod api;
