//! # hvac-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **JSON API** on the local network for reading the plant
//!   state (`/api/system`, `/api/zones`, `/api/sensors`) and changing modes
//!   and setpoints
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application results and errors into HTTP responses
//!
//! Every write goes straight to the store; the controllers pick changes up
//! on their next cycle.
//!
//! ## Dependency rule
//! Depends on `hvac-app` (for port traits and services) and `hvac-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
