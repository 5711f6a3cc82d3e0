//! Browser client for encore.
//!
//! SYSTEM CONTEXT
//! ==============
//! Leptos bindings over the `encore` core: the session lives in a
//! `RwSignal<Session>` context, route guards and the legacy profile redirect
//! are components, browser storage and the router are adapted to the core's
//! `KeyValueStore` and `Navigator` seams.

pub mod app;
pub mod components;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::hydrate_body(app::App);
}
