//! Adaptive PDF compression over HTTP.
//!
//! Uploaded documents are run through an external compression engine with
//! increasingly aggressive profiles until the result fits the requested size.
//! The [`compress`] module holds that loop; the remaining modules are the small
//! hyper-based HTTP stack it is served with.

pub mod api;
pub mod app;
pub mod artifact;
pub mod body;
pub mod compress;
pub mod config;
pub mod extractors;
pub mod file_stream;
pub mod handler;
pub mod middleware;
pub mod plugins;
pub mod responder;
pub mod route;
pub mod router;
pub mod server;
pub mod state;
pub mod tracing;
pub mod types;

pub use server::serve;
