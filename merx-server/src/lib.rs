//! HTTP boundary for the Merx identity service.

pub mod config;
pub mod cookies;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
