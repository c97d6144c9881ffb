//! Single-threaded implementations used on `wasm32`.
//!
//! The browser runs every engine callback on one thread, so these types use
//! `Rc`/`RefCell` instead of atomics and expose the same method names as their
//! Tokio counterparts.

pub mod cancellation_token;
pub mod runtime;
