//! # campus-client
//!
//! Client-side session lifecycle for the Campus e-learning platform: bearer
//! token storage, identity fetch and profile enrichment, restoration on
//! startup, and the navigation guard for the page routes.
//!
//! The crate has no UI. Front ends (the `campus` CLI in this package, or a
//! web/desktop shell) hold one [`session::SessionStore`] and consult
//! [`router::Router`] before every navigation.

pub mod config;
pub mod error;
pub mod net;
pub mod router;
pub mod session;
pub mod storage;

pub use error::SessionError;
