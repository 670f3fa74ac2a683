//! # Eventbook Server
//!
//! HTTP API for browsing, organizing and booking events.
//!
//! - [`config`]: environment configuration
//! - [`auth`]: bearer session extractor
//! - [`api`]: handlers
//! - [`server`]: state, router, health
//!
//! The binary in `main.rs` picks a store backend, installs tracing and the
//! Prometheus recorder, and serves [`server::build_router`].

pub mod api;
pub mod auth;
pub mod config;
pub mod server;

pub use config::{Config, StoreBackend};
pub use server::{AppState, build_router};
