//! Utility helpers shared across client UI modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate browser/environment concerns from page and component
//! logic: `storage` adapts web storage and `navigate` adapts the router to the
//! core's seams.

pub mod navigate;
pub mod storage;
