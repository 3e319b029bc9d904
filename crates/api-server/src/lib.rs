#![warn(clippy::unwrap_used)]

pub mod advisor_rest;
pub mod database_rest;
pub mod pg_users;
pub mod plan_rest;
pub mod rest;
pub mod server;
pub mod store;

pub use rest::AppState;
pub use server::{router, ApiServer};
