//! Browser host for Hookline.
//!
//! On `wasm32` this crate provides a [`Scheduler`](hookline_core::Scheduler)
//! backed by the global `setTimeout`, an id namespace that checks the live
//! DOM, and an [`init`] that installs both together with console logging.
//! On other targets only the task bookkeeping is compiled, for its tests.

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod slots;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::*;
