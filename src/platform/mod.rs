//! Platform abstraction layer
//!
//! The simulation itself is platform-free. This module holds the browser
//! bindings that mount it on a canvas and forward input, timing and resize
//! events.

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebEngine;
