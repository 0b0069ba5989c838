//! Oracle HTTP service
//!
//! Hosts a [`VrfProcess`](crate::games::vrf_process::VrfProcess) so that
//! tables on other machines can request and verify outcomes, and provides the
//! client those tables use to reach it.

pub mod client;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use client::HttpRandomnessService;
pub use server::OracleServer;
