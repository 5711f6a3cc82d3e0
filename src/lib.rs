//! Client core for the encore music-discovery app.
//!
//! Session ownership, route protection, the canonical profile redirect, the
//! realtime unread count and thin data access over the hosted backend. The
//! pure parts (session, guards, redirect decisions, query and realtime wire
//! vocabulary) build for every target and are shared with the Leptos client;
//! the HTTP and websocket adapters, data-access functions and the unread
//! hook are behind the `native` feature.

pub mod backend;
pub mod config;
pub mod data;
pub mod epoch;
pub mod error;
pub mod guard;
pub mod nav;
pub mod redirect;
pub mod session;
pub mod store;

#[cfg(feature = "native")]
pub mod inbox;

#[cfg(test)]
pub(crate) mod test_helpers;
