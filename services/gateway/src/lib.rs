//! Transport-neutral gateway
//!
//! Owns the canonical JSON wire schema, the ingress dispatcher, and the
//! service bootstrap (recovery → engines → workers → broadcast). The
//! actual client transport (WebSocket/HTTP server, auth, rate limiting)
//! plugs in above this crate: it feeds raw messages to [`Dispatcher`]
//! and owns the subscriber receiver returned on subscribe.

pub mod boot;
pub mod dispatch;
pub mod models;

pub use boot::App;
pub use dispatch::Dispatcher;
