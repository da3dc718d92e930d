//! Client for the ghqc REST API.
//!
//! [`QcBackend`] is the seam between the review logic and the server;
//! [`HttpBackend`] talks to a running `ghqc serve` instance over HTTP.

mod backend;
mod client;
mod error;
pub mod types;

pub use backend::QcBackend;
pub use client::HttpBackend;
pub use error::ApiError;
