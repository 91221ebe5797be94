//! Network layer: wire types and the HTTP client for the `/auth` API.

pub mod api;
pub mod types;
